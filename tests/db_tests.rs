//! Database and schema tests
//!
//! Tests SQLite migrations, the session store and the profile repository

mod common;

use chrono::Utc;
use common::setup_test_db;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_recruit_bot::core::model::{
    ConversationState, Field, FormData, Role, Session, UserIdentity,
};
use tokio_recruit_bot::infrastructure::database::DatabaseConnection;
use tokio_recruit_bot::infrastructure::entities::Profile;
use tokio_recruit_bot::infrastructure::repositories::{DbProfileRepository, DbSessionStore};
use tokio_recruit_bot::infrastructure::traits::{ProfileRepository, SessionStore};

const USER: UserIdentity = UserIdentity(1001);

fn connection(pool: &SqlitePool) -> Arc<DatabaseConnection> {
    Arc::new(DatabaseConnection::from_pool(pool.clone()))
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

    for table in ["candidate_skills", "candidates", "employers", "sessions", "skills"] {
        assert!(tables.iter().any(|t| t == table), "missing {table}");
    }
}

#[tokio::test]
async fn test_unknown_user_gets_idle_session_without_write() {
    let pool = setup_test_db().await;
    let store = DbSessionStore::new(connection(&pool));

    let session = store.get(USER).await.unwrap();
    assert_eq!(session.state, ConversationState::Idle);
    assert_eq!(session.form, FormData::default());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_session_commit_round_trips_and_replaces() {
    let pool = setup_test_db().await;
    let store = DbSessionStore::new(connection(&pool));

    let mut form = FormData::for_role(Role::Candidate);
    form.set(Field::Name, "Ann".to_string());
    let session = Session {
        user: USER,
        state: ConversationState::AwaitingSurname,
        form,
        updated_at: Utc::now(),
    };

    store.commit(&session).await.unwrap();
    store.commit(&session).await.unwrap();

    let loaded = store.get(USER).await.unwrap();
    assert_eq!(loaded.state, ConversationState::AwaitingSurname);
    assert_eq!(loaded.form, session.form);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_unknown_state_in_store_is_an_error() {
    let pool = setup_test_db().await;
    let store = DbSessionStore::new(connection(&pool));

    sqlx::query("INSERT INTO sessions (user_id, state, form, updated_at) VALUES (?, ?, ?, ?)")
        .bind(USER.0)
        .bind("awaiting_phone")
        .bind("{}")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    assert!(store.get(USER).await.is_err());
}

#[tokio::test]
async fn test_ensure_profile_never_duplicates() {
    let pool = setup_test_db().await;
    let profiles = DbProfileRepository::new(connection(&pool));

    let first = profiles
        .ensure(USER, Role::Candidate, Some("annlee"))
        .await
        .unwrap();
    let second = profiles.ensure(USER, Role::Candidate, None).await.unwrap();

    assert_eq!(first.user(), USER);
    assert_eq!(second.role(), Role::Candidate);
    let Profile::Candidate(candidate) = second else {
        panic!("expected a candidate");
    };
    assert_eq!(candidate.tg_username.as_deref(), Some("annlee"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE tg_id = ?")
        .bind(USER.0)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_update_field_creates_then_updates() {
    let pool = setup_test_db().await;
    let profiles = DbProfileRepository::new(connection(&pool));

    profiles
        .update_field(USER, Role::Employer, Field::Name, "Bob")
        .await
        .unwrap();
    profiles
        .update_field(USER, Role::Employer, Field::Email, "bob@corp.io")
        .await
        .unwrap();

    let profile = profiles.get(USER, Role::Employer).await.unwrap().unwrap();
    assert_eq!(profile.name(), Some("Bob"));
    assert_eq!(profile.email(), Some("bob@corp.io"));
    assert_eq!(profile.surname(), None);
    assert!(profiles.get(USER, Role::Candidate).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_candidate_is_idempotent_and_keeps_other_fields() {
    let pool = setup_test_db().await;
    let profiles = DbProfileRepository::new(connection(&pool));

    profiles
        .update_field(USER, Role::Candidate, Field::Surname, "Lee")
        .await
        .unwrap();

    let form = FormData {
        name: Some("Ann".to_string()),
        email: Some("ann@x.com".to_string()),
        skills: vec!["rust".to_string(), "sql".to_string()],
        expected_salary: Some(5000),
        city: Some("Tampere".to_string()),
        ..FormData::for_role(Role::Candidate)
    };
    profiles.save(USER, Role::Candidate, &form).await.unwrap();
    profiles.save(USER, Role::Candidate, &form).await.unwrap();

    let Some(Profile::Candidate(candidate)) =
        profiles.get(USER, Role::Candidate).await.unwrap()
    else {
        panic!("expected a candidate");
    };
    assert_eq!(candidate.name.as_deref(), Some("Ann"));
    assert_eq!(candidate.surname.as_deref(), Some("Lee"));
    assert_eq!(candidate.expected_salary, Some(5000));
    assert_eq!(candidate.city.as_deref(), Some("Tampere"));
    assert_eq!(candidate.skills, vec!["rust", "sql"]);

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidate_skills")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 2);
}

#[tokio::test]
async fn test_candidate_delete_cascades_to_skills() {
    let pool = setup_test_db().await;
    let profiles = DbProfileRepository::new(connection(&pool));

    let form = FormData {
        skills: vec!["go".to_string()],
        ..FormData::for_role(Role::Candidate)
    };
    profiles.save(USER, Role::Candidate, &form).await.unwrap();

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM candidates WHERE tg_id = ?")
        .bind(USER.0)
        .execute(&pool)
        .await
        .unwrap();

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidate_skills")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn test_save_employer() {
    let pool = setup_test_db().await;
    let profiles = DbProfileRepository::new(connection(&pool));

    let form = FormData {
        name: Some("Bob".to_string()),
        company_name: Some("Corp".to_string()),
        ..FormData::for_role(Role::Employer)
    };
    profiles.save(USER, Role::Employer, &form).await.unwrap();

    let Some(Profile::Employer(employer)) = profiles.get(USER, Role::Employer).await.unwrap()
    else {
        panic!("expected an employer");
    };
    assert_eq!(employer.company_name.as_deref(), Some("Corp"));
    assert_eq!(employer.tg_id, USER.0);
}
