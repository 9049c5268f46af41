//! Waypoint: job interaction tracking and a career-assistant gateway.
//!
//! The library exposes the full application so integration tests and the
//! embedded assistant can run against the same code the binary serves.

pub mod assistant;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod interactions;
pub mod llm_client;
pub mod models;
pub mod prompt;
pub mod references;
pub mod routes;
pub mod state;
pub mod store;
