//! Startup database connection with bounded retries.
//!
//! [`connect_with_timeout`] races a background attempt loop against a
//! deadline: whichever resolves first wins, and the loser is told to stop
//! through a single-use signal rather than being abandoned.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::time::{self, Instant};
use tracing::{trace, warn};

/// Maximum connections for the pool.
/// Kept low for a single-purpose read service.
const MAX_CONNECTIONS: u32 = 5;

/// Upper bound on acquiring a connection from the established pool while
/// serving requests. Bootstrap dials do not go through the pool.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors produced while establishing the startup database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Missing or malformed input. Never retried: bad syntax cannot become
    /// valid by waiting.
    #[error("invalid connection string: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Server unreachable or the liveness probe failed. Retried until the
    /// bootstrap deadline.
    #[error("database unreachable: {0}")]
    Transient(#[from] sqlx::Error),

    /// The deadline elapsed before any attempt succeeded. Wraps the most
    /// recent transient failure; `None` only if no attempt had finished
    /// failing yet (zero timeout, or a first dial still in flight).
    #[error("timed out after {waited:?} connecting to the database")]
    TimedOut {
        waited: Duration,
        #[source]
        source: Option<Box<ConnectError>>,
    },

    /// The attempt task stopped without reporting an outcome. Only a
    /// panicked attempt produces this; connection failures always come
    /// back as [`ConnectError::Transient`].
    #[error("connection attempt crashed before reporting an outcome")]
    AttemptCrashed,
}

impl ConnectError {
    fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
            source: None,
        }
    }
}

/// Connect to PostgreSQL, retrying transient failures until `timeout` elapses.
///
/// The connection string is validated and parsed once up front; anything
/// wrong with it fails immediately, without touching the network. Attempts
/// then run in a background task, pausing `retry` between failures, while
/// this call waits for the first of {established pool, deadline}. Exactly
/// one pool is ever handed to the caller.
pub async fn connect_with_timeout(
    database_url: &str,
    timeout: Duration,
    retry: Duration,
) -> Result<PgPool, ConnectError> {
    if database_url.is_empty() {
        return Err(ConnectError::config("connection string is empty"));
    }
    if retry.is_zero() {
        return Err(ConnectError::config("retry interval must be positive"));
    }
    let options: PgConnectOptions =
        database_url.parse().map_err(|source| ConnectError::Config {
            reason: format!("could not parse {database_url:?}"),
            source: Some(source),
        })?;

    retry_with_deadline(timeout, retry, move || connect_and_probe(options.clone())).await
}

/// One connection attempt: dial a single probe connection, prove the
/// server answers queries, then hand back a pool over the same options.
///
/// The dial is direct, not through the pool: pool acquisition retries
/// internally until its acquire timeout and surfaces only a generic
/// `PoolTimedOut`, while a direct dial fails in one round trip with the
/// underlying cause. The probe connection never escapes; it is closed
/// whether or not the probe passed.
async fn connect_and_probe(options: PgConnectOptions) -> Result<PgPool, ConnectError> {
    let mut probe = PgConnection::connect_with(&options).await?;
    let ping = sqlx::query("SELECT 1").execute(&mut probe).await;
    let _ = probe.close().await;
    ping?;

    Ok(PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy_with(options))
}

/// Race a retrying attempt loop against a deadline.
///
/// The loop runs in a spawned task, coordinated through two single-fire
/// channels: `ready` delivers the first success, `stop` tells the loop the
/// race is over. The loop checks `stop` at the top of every iteration so it
/// never starts another doomed attempt after resolution. A success landing
/// after the caller has given up is dropped, never delivered; the most
/// recent failure is kept in a shared slot so the timeout can report it.
async fn retry_with_deadline<T, F, Fut>(
    timeout: Duration,
    retry: Duration,
    mut attempt: F,
) -> Result<T, ConnectError>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ConnectError>> + Send + 'static,
{
    let started = Instant::now();
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let last_error = Arc::new(Mutex::new(None::<ConnectError>));

    let recorder = Arc::clone(&last_error);
    tokio::spawn(async move {
        loop {
            // Stop requested, or the caller vanished entirely: the race is
            // decided and dialing again would be wasted work.
            if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                trace!("giving up on the connect loop");
                break;
            }
            match attempt().await {
                Ok(value) => {
                    // The caller may have timed out already; a refused
                    // delivery just drops the value.
                    let _ = ready_tx.send(value);
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "connection attempt failed, retrying in {:?}", retry);
                    *recorder.lock().unwrap() = Some(err);
                    time::sleep(retry).await;
                }
            }
        }
    });

    tokio::select! {
        outcome = ready_rx => {
            let _ = stop_tx.send(());
            // The loop drops its sender without delivering only if an
            // attempt panicked; that is a crash, not a timeout.
            outcome.map_err(|_| ConnectError::AttemptCrashed)
        }
        _ = time::sleep(timeout) => {
            let _ = stop_tx.send(());
            Err(ConnectError::TimedOut {
                waited: started.elapsed(),
                source: last_error.lock().unwrap().take().map(Box::new),
            })
        }
    }
}
