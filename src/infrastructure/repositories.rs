//! DB Repository abstractions

use crate::core::error::StoreError;
use crate::core::model::{Field, FormData, Role, Session, UserIdentity};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Candidate, Employer, Profile, SessionRecord};
use crate::infrastructure::traits::{ProfileRepository, SessionStore};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::error;
use sqlx::types::Json;

fn store_error(e: sqlx::Error) -> StoreError {
    error!("{e}");
    StoreError::from(e)
}

fn table(role: Role) -> &'static str {
    match role {
        Role::Candidate => "candidates",
        Role::Employer => "employers",
    }
}

#[injectable(SessionStore)]
pub struct DbSessionStore {
    connection: Ref<DatabaseConnection>,
}

impl DbSessionStore {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbSessionStore { connection }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn get(&self, user: UserIdentity) -> Result<Session, StoreError> {
        let record: Option<SessionRecord> = sqlx::query_as(
            "SELECT user_id, state, form, updated_at FROM sessions WHERE user_id = ?",
        )
        .bind(user.0)
        .fetch_optional(&**self.connection)
        .await
        .map_err(store_error)?;

        match record {
            Some(record) => Session::try_from(record),
            None => Ok(Session::fresh(user)),
        }
    }

    async fn commit(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (user_id, state, form, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(user_id) DO UPDATE SET state = excluded.state, form = excluded.form, updated_at = excluded.updated_at",
        )
        .bind(session.user.0)
        .bind(session.state.as_str())
        .bind(Json(&session.form))
        .bind(session.updated_at)
        .execute(&**self.connection)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

#[injectable(ProfileRepository)]
pub struct DbProfileRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbProfileRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbProfileRepository { connection }
    }

    async fn candidate_skills(&self, candidate_id: i64) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            "SELECT skills.name FROM skills INNER JOIN candidate_skills ON candidate_skills.skill_id = skills.id WHERE candidate_skills.candidate_id = ? ORDER BY skills.name ASC",
        )
        .bind(candidate_id)
        .fetch_all(&**self.connection)
        .await
        .map_err(store_error)
    }

    async fn save_candidate(&self, user: UserIdentity, form: &FormData) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tx = self.connection.begin().await.map_err(store_error)?;

        sqlx::query(
            "INSERT INTO candidates (tg_id, name, surname, email, phone, expected_salary, city, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(tg_id) DO UPDATE SET \
             name = COALESCE(excluded.name, candidates.name), \
             surname = COALESCE(excluded.surname, candidates.surname), \
             email = COALESCE(excluded.email, candidates.email), \
             phone = COALESCE(excluded.phone, candidates.phone), \
             expected_salary = COALESCE(excluded.expected_salary, candidates.expected_salary), \
             city = COALESCE(excluded.city, candidates.city), \
             updated_at = excluded.updated_at",
        )
        .bind(user.0)
        .bind(&form.name)
        .bind(&form.surname)
        .bind(&form.email)
        .bind(&form.phone)
        .bind(form.expected_salary)
        .bind(&form.city)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        for skill in &form.skills {
            sqlx::query("INSERT INTO skills (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(skill)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;

            sqlx::query(
                "INSERT OR IGNORE INTO candidate_skills (candidate_id, skill_id) SELECT candidates.id, skills.id FROM candidates, skills WHERE candidates.tg_id = ? AND skills.name = ?",
            )
            .bind(user.0)
            .bind(skill)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)
    }

    async fn save_employer(&self, user: UserIdentity, form: &FormData) -> Result<(), StoreError> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO employers (tg_id, name, surname, email, phone, company_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(tg_id) DO UPDATE SET \
             name = COALESCE(excluded.name, employers.name), \
             surname = COALESCE(excluded.surname, employers.surname), \
             email = COALESCE(excluded.email, employers.email), \
             phone = COALESCE(excluded.phone, employers.phone), \
             company_name = COALESCE(excluded.company_name, employers.company_name), \
             updated_at = excluded.updated_at",
        )
        .bind(user.0)
        .bind(&form.name)
        .bind(&form.surname)
        .bind(&form.email)
        .bind(&form.phone)
        .bind(&form.company_name)
        .bind(now)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for DbProfileRepository {
    async fn ensure(
        &self,
        user: UserIdentity,
        role: Role,
        username: Option<&str>,
    ) -> Result<Profile, StoreError> {
        let now = Utc::now();
        let table = table(role);

        sqlx::query(&format!(
            "INSERT INTO {table} (tg_id, tg_username, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(tg_id) DO UPDATE SET tg_username = COALESCE(excluded.tg_username, {table}.tg_username)"
        ))
        .bind(user.0)
        .bind(username)
        .bind(now)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(store_error)?;

        self.get(user, role).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("{role} profile for {user} vanished after upsert"))
        })
    }

    async fn update_field(
        &self,
        user: UserIdentity,
        role: Role,
        field: Field,
        value: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let table = table(role);
        let column = field.column();

        sqlx::query(&format!(
            "INSERT INTO {table} (tg_id, {column}, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(tg_id) DO UPDATE SET {column} = excluded.{column}, updated_at = excluded.updated_at"
        ))
        .bind(user.0)
        .bind(value)
        .bind(now)
        .bind(now)
        .execute(&**self.connection)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn save(
        &self,
        user: UserIdentity,
        role: Role,
        form: &FormData,
    ) -> Result<(), StoreError> {
        match role {
            Role::Candidate => self.save_candidate(user, form).await,
            Role::Employer => self.save_employer(user, form).await,
        }
    }

    async fn get(&self, user: UserIdentity, role: Role) -> Result<Option<Profile>, StoreError> {
        match role {
            Role::Candidate => {
                let candidate: Option<Candidate> =
                    sqlx::query_as("SELECT * FROM candidates WHERE tg_id = ?")
                        .bind(user.0)
                        .fetch_optional(&**self.connection)
                        .await
                        .map_err(store_error)?;

                match candidate {
                    Some(mut candidate) => {
                        candidate.skills = self.candidate_skills(candidate.id).await?;
                        Ok(Some(Profile::Candidate(candidate)))
                    }
                    None => Ok(None),
                }
            }
            Role::Employer => {
                let employer: Option<Employer> =
                    sqlx::query_as("SELECT * FROM employers WHERE tg_id = ?")
                        .bind(user.0)
                        .fetch_optional(&**self.connection)
                        .await
                        .map_err(store_error)?;

                Ok(employer.map(Profile::Employer))
            }
        }
    }
}
