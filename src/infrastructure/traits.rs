//! Infrastructure traits, used for DI on higher levels

use crate::core::error::StoreError;
use crate::core::model::{Field, FormData, Role, Session, UserIdentity};
use crate::infrastructure::entities::Profile;
use async_trait::async_trait;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the user's session, or a fresh `Idle` one if the user is unknown.
    ///
    /// Never writes; calling it repeatedly for an unknown user yields equal sessions.
    async fn get(&self, user: UserIdentity) -> Result<Session, StoreError>;

    /// Atomically replaces the session stored for `session.user`.
    async fn commit(&self, session: &Session) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get-or-create by identity; never duplicates.
    async fn ensure(
        &self,
        user: UserIdentity,
        role: Role,
        username: Option<&str>,
    ) -> Result<Profile, StoreError>;

    async fn update_field(
        &self,
        user: UserIdentity,
        role: Role,
        field: Field,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Upserts every populated field of `form`. Fields absent from the form keep their
    /// stored value.
    async fn save(&self, user: UserIdentity, role: Role, form: &FormData)
    -> Result<(), StoreError>;

    async fn get(&self, user: UserIdentity, role: Role) -> Result<Option<Profile>, StoreError>;
}
