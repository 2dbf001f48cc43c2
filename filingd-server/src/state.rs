//! Application state shared across handlers

use sqlx::PgPool;

/// State handed to every request handler. Carries the pool established at
/// startup; `PgPool` is internally reference-counted, so clones of the
/// state all share that one pool.
#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
}

impl AppState {
    /// Wrap the bootstrap-produced pool for injection into the router.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
