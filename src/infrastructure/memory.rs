//! Process-local session store.

use crate::core::error::StoreError;
use crate::core::model::{Session, UserIdentity};
use crate::infrastructure::traits::SessionStore;
use async_trait::async_trait;
use di::{inject, injectable};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserIdentity, Session>>,
}

#[injectable(SessionStore)]
impl InMemorySessionStore {
    #[inject]
    pub fn create() -> InMemorySessionStore {
        InMemorySessionStore::default()
    }
}

impl InMemorySessionStore {
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: UserIdentity) -> Result<Session, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_else(|| Session::fresh(user)))
    }

    async fn commit(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.user, session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ConversationState, FormData, Role};
    use chrono::Utc;

    #[tokio::test]
    async fn test_unknown_user_gets_idle_session_without_write() {
        let store = InMemorySessionStore::default();

        let first = store.get(UserIdentity(1)).await.unwrap();
        let second = store.get(UserIdentity(1)).await.unwrap();

        assert_eq!(first.state, ConversationState::Idle);
        assert_eq!(first.form, FormData::default());
        assert_eq!(second.state, first.state);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_commit_replaces_session() {
        let store = InMemorySessionStore::default();
        let user = UserIdentity(2);

        for _ in 0..2 {
            store
                .commit(&Session {
                    user,
                    state: ConversationState::AwaitingName,
                    form: FormData::for_role(Role::Employer),
                    updated_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let session = store.get(user).await.unwrap();
        assert_eq!(session.state, ConversationState::AwaitingName);
        assert_eq!(session.form, FormData::for_role(Role::Employer));
        assert_eq!(store.len().await, 1);
    }
}
