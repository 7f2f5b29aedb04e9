//! CARX Persistence - SQLite storage for the achievements engine

pub mod sqlite;

pub use sqlite::Database;
