//! Persistence layer for the route server.
//!
//! SQLite-backed storage for authored routes. The engine only consumes the
//! loaded records; the graph is rebuilt from them after every change.

pub mod db;
pub mod routes;

pub use db::{init_database, Database};
