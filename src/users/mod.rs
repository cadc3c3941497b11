pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod store;

pub use memory::MemoryUserRepository;
pub use repo::{PgUserRepository, UserRepository};
pub use repo_types::{NewUser, User, UserProfile, UserUpdate};
pub use store::UserStore;
