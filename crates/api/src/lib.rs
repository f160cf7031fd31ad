//! Lathe fleet API server library.
//!
//! Exposes config, state, error handling, routes and the live stream
//! machinery so integration tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod live;
pub mod logging;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
