//! filingd-server: HTTP read endpoints over the filings database
//!
//! The interesting part is the bootstrap: a startup connection established
//! with bounded retries racing an overall deadline. Everything after that is
//! three small GET handlers sharing one pool.

pub mod db;
pub mod http;
pub mod state;

pub use db::{connect_with_timeout, ConnectError, Filing, FilingQuery, QueryError};
pub use http::{run_server, ServerConfig, ServerError};
pub use state::AppState;
