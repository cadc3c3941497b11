//! User account data access: validation, authentication and CRUD over a
//! `users` table.

pub mod config;
pub mod db;
pub mod error;
pub mod telemetry;
pub mod users;

pub use error::{StoreError, StoreResult};
pub use users::{
    MemoryUserRepository, NewUser, PgUserRepository, User, UserProfile, UserRepository,
    UserStore, UserUpdate,
};
