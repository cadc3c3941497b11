use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{User, UserProfile, UserUpdate};
use crate::users::store::DUPLICATE_EMAIL;

/// In-process `users` table. Mirrors the Postgres schema rules that matter to
/// the store: sequential ids that are never reused and a unique email.
#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Table {
    fn email_taken_by_other(&self, email: &str, id: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|u| u.email == email && Some(u.id) != id)
    }
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        debug!("creating in-memory user repository");
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Raw row access, bypassing the store. Handy for asserting on stored columns.
    pub fn row(&self, id: i64) -> Option<User> {
        self.read().rows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(self.read().rows.values().any(|u| u.email == email))
    }

    async fn id_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.read().rows.contains_key(&id))
    }

    async fn find_id_by_email(&self, email: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .read()
            .rows
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id))
    }

    async fn find_password_by_email(&self, email: &str) -> StoreResult<Option<String>> {
        Ok(self
            .read()
            .rows
            .values()
            .find(|u| u.email == email)
            .map(|u| u.password.clone()))
    }

    async fn find_profile_by_id(&self, id: i64) -> StoreResult<Option<UserProfile>> {
        Ok(self.read().rows.get(&id).cloned().map(UserProfile::from))
    }

    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .rows
            .values()
            .find(|u| u.refresh_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<User>> {
        Ok(self.read().rows.values().cloned().collect())
    }

    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<UserProfile> {
        let mut table = self.write();
        if table.email_taken_by_other(email, None) {
            return Err(StoreError::Validation(DUPLICATE_EMAIL.into()));
        }
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            name: name.to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
            refresh_token: None,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user.into())
    }

    async fn update_profile(&self, update: &UserUpdate) -> StoreResult<u64> {
        let mut table = self.write();
        if table.email_taken_by_other(&update.email, Some(update.id)) {
            return Err(StoreError::Validation(DUPLICATE_EMAIL.into()));
        }
        match table.rows.get_mut(&update.id) {
            Some(row) => {
                row.name = update.name.clone();
                row.email = update.email.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_refresh_token(&self, id: i64, token: &str) -> StoreResult<u64> {
        match self.write().rows.get_mut(&id) {
            Some(row) => {
                row.refresh_token = Some(token.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<u64> {
        Ok(self.write().rows.remove(&id).map_or(0, |_| 1))
    }
}
