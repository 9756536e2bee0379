//! Keyed mutual exclusion: one critical section per user at a time.
//!
//! Waiters on the same key are served in the order they called `lock`, since
//! `tokio::sync::Mutex` is fair. Entries are dropped once nobody holds or waits for them.

use crate::core::model::UserIdentity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<UserIdentity, Slot>>,
}

pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserIdentity,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub async fn lock(&self, user: UserIdentity) -> UserGuard<'_> {
        let slot = self.slots().entry(user).or_default().clone();
        let guard = slot.clone().lock_owned().await;

        UserGuard {
            locks: self,
            user,
            slot,
            guard: Some(guard),
        }
    }

    /// Number of users currently holding or waiting for their lock.
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<UserIdentity, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut slots = self.locks.slots();
        // the map and this guard hold the only references: nobody is waiting
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.user);
        }
    }
}
