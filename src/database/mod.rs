pub mod manager;
pub mod models;
pub mod repository;
pub mod schema;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{PgPostRepository, PgUserRepository, PostRepository, UserRepository};
