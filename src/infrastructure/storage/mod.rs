//! Relational storage plumbing

mod migrations;
mod postgres;

pub use migrations::{todo_migrations, Migration, Migrator, PostgresMigrator};
pub use postgres::{connect, PostgresConfig};
