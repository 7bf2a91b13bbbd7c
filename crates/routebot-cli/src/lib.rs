//! Routebot CLI - command line tools for the route planner.
//!
//! Binaries:
//! - routebot-plan: offline planning and follower simulation
//! - routebot-import: push a routes file to a running server

pub mod client;
pub mod input;

pub use client::RouteServerClient;
pub use input::{load_routes, parse_point};
