use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::users::password::{hash_password, verify_password};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, User, UserProfile, UserUpdate};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const EMPTY_NAME: &str = "name cannot be empty";
pub const EMPTY_EMAIL: &str = "email cannot be empty";
pub const EMPTY_PASSWORD: &str = "password cannot be empty";
pub const SHORT_PASSWORD: &str = "password must be at least 6 characters";
pub const DUPLICATE_EMAIL: &str = "already a registered user with this email";

pub const USER_NOT_FOUND: &str = "not found user";
pub const USER_NOT_FOUND_BY_EMAIL: &str = "not found user by e-mail";
pub const USER_NOT_FOUND_BY_TOKEN: &str = "not found user by refresh token";
pub const PASSWORD_MISMATCH: &str = "password don't match";

/// Field rules that need no storage access, checked in declaration order.
pub fn check_fields(user: &NewUser) -> Result<(), &'static str> {
    if user.name.is_empty() {
        return Err(EMPTY_NAME);
    }
    if user.email.is_empty() {
        return Err(EMPTY_EMAIL);
    }
    if user.password.is_empty() {
        return Err(EMPTY_PASSWORD);
    }
    if user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SHORT_PASSWORD);
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

fn normalized(user: &NewUser) -> NewUser {
    NewUser {
        email: normalize_email(&user.email),
        ..user.clone()
    }
}

/// User CRUD and authentication over an injected repository.
pub struct UserStore<R> {
    repo: Arc<R>,
}

impl<R> Clone for UserStore<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: UserRepository> UserStore<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }

    pub fn from_shared(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Business-rule validation for a new user. `Ok(())` means every check
    /// passed; the first failing rule comes back as `StoreError::Validation`.
    ///
    /// The email is trimmed before it is checked, the same way `create`
    /// stores it. The last rule looks for an existing user with that email,
    /// so this reads storage.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn validate(&self, user: &NewUser) -> StoreResult<()> {
        let user = normalized(user);
        if let Err(message) = check_fields(&user) {
            warn!(reason = message, "user validation failed");
            return Err(StoreError::Validation(message.into()));
        }

        if self.repo.email_exists(&user.email).await? {
            warn!("email already registered");
            return Err(StoreError::Validation(DUPLICATE_EMAIL.into()));
        }

        Ok(())
    }

    /// Check `password` against the stored hash for `email`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<()> {
        let email = normalize_email(email);
        let Some(hash) = self.repo.find_password_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(StoreError::NotFound(USER_NOT_FOUND_BY_EMAIL.into()));
        };

        if !verify_password(password, &hash)? {
            warn!(email = %email, "login invalid password");
            return Err(StoreError::Authentication(PASSWORD_MISMATCH.into()));
        }

        Ok(())
    }

    /// Validate, hash the password and insert. Returns the stored `id, name, email`.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn create(&self, user: &NewUser) -> StoreResult<UserProfile> {
        let user = normalized(user);
        self.validate(&user).await?;

        let hash = hash_password(&user.password)?;
        let created = self.repo.insert(&user.name, &user.email, &hash).await?;

        info!(user_id = created.id, email = %created.email, "user registered");
        Ok(created)
    }

    pub async fn list_all(&self) -> StoreResult<Vec<User>> {
        self.repo.list_all().await
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> StoreResult<UserProfile> {
        self.repo
            .find_profile_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(USER_NOT_FOUND.into()))
    }

    #[instrument(skip_all)]
    pub async fn get_by_refresh_token(&self, token: &str) -> StoreResult<User> {
        self.repo
            .find_by_refresh_token(token)
            .await?
            .ok_or_else(|| StoreError::NotFound(USER_NOT_FOUND_BY_TOKEN.into()))
    }

    /// Persist a new `name` and `email` for an existing user. No other column is written.
    #[instrument(skip_all, fields(user_id = user.id))]
    pub async fn update(&self, user: &UserUpdate) -> StoreResult<u64> {
        let update = UserUpdate {
            email: normalize_email(&user.email),
            ..user.clone()
        };
        let empty = if update.name.is_empty() {
            Some(EMPTY_NAME)
        } else if update.email.is_empty() {
            Some(EMPTY_EMAIL)
        } else {
            None
        };
        if let Some(message) = empty {
            warn!(reason = message, "user update rejected");
            return Err(StoreError::Validation(message.into()));
        }

        if !self.repo.id_exists(update.id).await? {
            warn!("update of unknown user");
            return Err(StoreError::NotFound(USER_NOT_FOUND.into()));
        }

        let rows = self.repo.update_profile(&update).await?;
        if rows == 0 {
            return Err(StoreError::NoRowsAffected);
        }

        info!(rows, "user profile updated");
        Ok(rows)
    }

    #[instrument(skip(self, token))]
    pub async fn update_refresh_token(&self, email: &str, token: &str) -> StoreResult<u64> {
        let email = normalize_email(email);
        let Some(id) = self.repo.find_id_by_email(&email).await? else {
            warn!(email = %email, "refresh token for unknown email");
            return Err(StoreError::NotFound(USER_NOT_FOUND_BY_EMAIL.into()));
        };

        let rows = self.repo.update_refresh_token(id, token).await?;
        if rows == 0 {
            return Err(StoreError::NoRowsAffected);
        }
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: i64) -> StoreResult<u64> {
        if !self.repo.id_exists(id).await? {
            warn!("delete of unknown user");
            return Err(StoreError::NotFound(USER_NOT_FOUND.into()));
        }

        let rows = self.repo.delete_by_id(id).await?;
        if rows == 0 {
            return Err(StoreError::NoRowsAffected);
        }

        info!(rows, "user deleted");
        Ok(rows)
    }
}
