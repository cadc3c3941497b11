use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                       // assigned by storage
    pub name: String,
    pub email: String,                 // unique
    #[serde(skip_serializing)]
    pub password: String,              // Argon2 hash, not exposed in JSON
    pub refresh_token: Option<String>,
}

/// The `id, name, email` projection returned by create and lookup-by-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

/// Input for registering a user. `password` is plaintext here and hashed before insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Profile update. Only `name` and `email` are ever written.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub id: i64,
    pub name: String,
    pub email: String,
}
