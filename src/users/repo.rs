use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::users::repo_types::{User, UserProfile, UserUpdate};
use crate::users::store::DUPLICATE_EMAIL;

/// Row-level access to the `users` table.
///
/// Implementations report a duplicate email on write as
/// `StoreError::Validation(DUPLICATE_EMAIL)`; everything else that goes wrong
/// in storage comes back as `StoreError::Storage`, logged once here.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    async fn id_exists(&self, id: i64) -> StoreResult<bool>;

    async fn find_id_by_email(&self, email: &str) -> StoreResult<Option<i64>>;

    /// Only the stored password hash, nothing else.
    async fn find_password_by_email(&self, email: &str) -> StoreResult<Option<String>>;

    async fn find_profile_by_id(&self, id: i64) -> StoreResult<Option<UserProfile>>;

    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<User>>;

    async fn list_all(&self) -> StoreResult<Vec<User>>;

    async fn insert(&self, name: &str, email: &str, password_hash: &str)
        -> StoreResult<UserProfile>;

    /// Writes `name` and `email` only.
    async fn update_profile(&self, update: &UserUpdate) -> StoreResult<u64>;

    /// Writes `refresh_token` only.
    async fn update_refresh_token(&self, id: i64, token: &str) -> StoreResult<u64>;

    async fn delete_by_id(&self, id: i64) -> StoreResult<u64>;
}

/// Postgres-backed repository over a shared pool.
#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

fn storage(op: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        error!(error = %e, op, "users query failed");
        StoreError::Storage(e)
    }
}

// Unique violations on email become the duplicate-email validation failure.
fn write_error<'a>(
    op: &'static str,
    email: &'a str,
) -> impl FnOnce(sqlx::Error) -> StoreError + 'a {
    move |e| {
        if is_unique_violation(&e) {
            warn!(email = %email, op, "email already registered");
            StoreError::Validation(DUPLICATE_EMAIL.into())
        } else {
            storage(op)(e)
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#,
        )
        .bind(email)
        .fetch_one(&self.db)
        .await
        .map_err(storage("email_exists"))?;
        Ok(exists)
    }

    async fn id_exists(&self, id: i64) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#)
                .bind(id)
                .fetch_one(&self.db)
                .await
                .map_err(storage("id_exists"))?;
        Ok(exists)
    }

    async fn find_id_by_email(&self, email: &str) -> StoreResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(r#"SELECT id FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(storage("find_id_by_email"))?;
        Ok(id)
    }

    async fn find_password_by_email(&self, email: &str) -> StoreResult<Option<String>> {
        let password =
            sqlx::query_scalar::<_, String>(r#"SELECT password FROM users WHERE email = $1"#)
                .bind(email)
                .fetch_optional(&self.db)
                .await
                .map_err(storage("find_password_by_email"))?;
        Ok(password)
    }

    async fn find_profile_by_id(&self, id: i64) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(storage("find_profile_by_id"))?;
        Ok(profile)
    }

    async fn find_by_refresh_token(&self, token: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, refresh_token
            FROM users
            WHERE refresh_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(storage("find_by_refresh_token"))?;
        Ok(user)
    }

    async fn list_all(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, refresh_token
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(storage("list_all"))?;
        Ok(users)
    }

    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(write_error("insert", email))?;
        Ok(profile)
    }

    async fn update_profile(&self, update: &UserUpdate) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3
            WHERE id = $1
            "#,
        )
        .bind(update.id)
        .bind(&update.name)
        .bind(&update.email)
        .execute(&self.db)
        .await
        .map_err(write_error("update_profile", &update.email))?;
        Ok(result.rows_affected())
    }

    async fn update_refresh_token(&self, id: i64, token: &str) -> StoreResult<u64> {
        let result = sqlx::query(r#"UPDATE users SET refresh_token = $2 WHERE id = $1"#)
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(storage("update_refresh_token"))?;
        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(storage("delete_by_id"))?;
        Ok(result.rows_affected())
    }
}
