//! HTTP server layer
//!
//! Axum server with request tracing, graceful shutdown, and the three
//! filings read routes.

pub mod routes;
pub mod server;

pub use server::{build_router, run_server, ServerConfig, ServerError};
