pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::{PgAttemptStore, PgStore};
pub use repository::{ContactRepository, ProjectRepository, RevocationStore, SkillRepository, UserRepository};
