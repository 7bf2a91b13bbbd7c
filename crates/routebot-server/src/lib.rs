//! Shared library surface for the route server and its tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod loops;
pub mod persistence;
pub mod routes_file;
pub mod state;
pub mod terrain;
