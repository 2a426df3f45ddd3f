//! Task infrastructure module
//!
//! In-memory and PostgreSQL task stores plus the service that validates
//! input and scopes every call to the acting owner.

mod postgres_repository;
mod repository;
mod service;

pub use postgres_repository::PostgresTaskRepository;
pub use repository::InMemoryTaskRepository;
pub use service::TaskService;
