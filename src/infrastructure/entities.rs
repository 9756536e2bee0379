//! Database entities

use crate::core::error::StoreError;
use crate::core::model::{ConversationState, FormData, Role, Session, UserIdentity};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, FromRow)]
pub struct SessionRecord {
    pub user_id: i64,
    pub state: String,
    pub form: Json<FormData>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRecord> for Session {
    type Error = StoreError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let state = record
            .state
            .parse::<ConversationState>()
            .map_err(StoreError::Unavailable)?;

        Ok(Session {
            user: UserIdentity(record.user_id),
            state,
            form: record.form.0,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub tg_id: i64,
    pub tg_username: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cv_url: Option<String>,
    pub expected_salary: Option<i64>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Employer {
    pub id: i64,
    pub tg_id: i64,
    pub tg_username: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Candidate(Candidate),
    Employer(Employer),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Candidate(_) => Role::Candidate,
            Profile::Employer(_) => Role::Employer,
        }
    }

    pub fn user(&self) -> UserIdentity {
        match self {
            Profile::Candidate(c) => UserIdentity(c.tg_id),
            Profile::Employer(e) => UserIdentity(e.tg_id),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Profile::Candidate(c) => c.name.as_deref(),
            Profile::Employer(e) => e.name.as_deref(),
        }
    }

    pub fn surname(&self) -> Option<&str> {
        match self {
            Profile::Candidate(c) => c.surname.as_deref(),
            Profile::Employer(e) => e.surname.as_deref(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Profile::Candidate(c) => c.email.as_deref(),
            Profile::Employer(e) => e.email.as_deref(),
        }
    }
}
