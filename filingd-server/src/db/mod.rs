//! Database layer - startup connection and read queries
//!
//! # Design Principles
//!
//! - One pool, built once at startup, injected everywhere - no globals
//! - Configuration failures are immediate; only reachability is retried
//! - The read operations are a closed enum, not ad hoc functions

pub mod bootstrap;
pub mod filings;

pub use bootstrap::{connect_with_timeout, ConnectError};
pub use filings::{Filing, FilingQuery, QueryError};
