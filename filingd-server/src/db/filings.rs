//! Read queries over the filings table.

use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

/// A row in the `filings` table. A single integer identifier; stands in
/// for any queryable row type.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct Filing {
    pub id: i32,
}

/// Per-request query failures. The cause stays on the chain for
/// diagnostics; handlers decide what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Db(#[from] sqlx::Error),

    #[error("query timed out after {limit:?}")]
    DeadlineExceeded { limit: Duration },
}

/// The closed set of read operations this service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingQuery {
    /// Full-table count over filings.
    CountAll,
    /// One filing, whichever row the storage engine yields first.
    /// Deliberately unordered; callers must not depend on which row.
    FetchFirst,
}

impl FilingQuery {
    /// Execute the query on the shared pool. Cancellation is by dropping
    /// the future; see [`Self::execute_with_timeout`] for a server-side
    /// bound.
    pub async fn execute(self, pool: &PgPool) -> Result<i64, QueryError> {
        match self {
            Self::CountAll => {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM filings")
                    .fetch_one(pool)
                    .await?;
                info!(count, "count query done");
                Ok(count)
            }
            Self::FetchFirst => {
                let filing: Filing = sqlx::query_as("SELECT id FROM filings LIMIT 1")
                    .fetch_one(pool)
                    .await?;
                info!(?filing, "first-filing query done");
                Ok(i64::from(filing.id))
            }
        }
    }

    /// Execute with a server-side deadline. An elapsed deadline fails
    /// promptly with [`QueryError::DeadlineExceeded`] instead of letting
    /// the request block on the database.
    pub async fn execute_with_timeout(
        self,
        pool: &PgPool,
        limit: Duration,
    ) -> Result<i64, QueryError> {
        match tokio::time::timeout(limit, self.execute(pool)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::DeadlineExceeded { limit }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    /// Pool pointed at a dead address; queries fail fast and no server is
    /// ever required.
    fn dead_pool() -> PgPool {
        let options: PgConnectOptions = "postgres://postgres@127.0.0.1:1/filings"
            .parse()
            .expect("static url parses");
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy_with(options)
    }

    #[tokio::test]
    async fn failed_query_surfaces_the_db_cause() {
        let err = FilingQuery::CountAll
            .execute(&dead_pool())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Db(_)));
    }

    #[tokio::test]
    async fn expired_deadline_fails_promptly() {
        let err = FilingQuery::FetchFirst
            .execute_with_timeout(&dead_pool(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::DeadlineExceeded { .. }));
    }

    // Integration tests - run with POSTGRESQL_ADDRESS set:
    // cargo test -p filingd-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn count_and_first_against_a_live_table() {
        let url = std::env::var("POSTGRESQL_ADDRESS").expect("POSTGRESQL_ADDRESS required");
        let pool = PgPool::connect(&url).await.expect("connect failed");

        sqlx::query("DROP TABLE IF EXISTS filings")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE filings (id integer PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(FilingQuery::CountAll.execute(&pool).await.unwrap(), 0);
        let err = FilingQuery::FetchFirst.execute(&pool).await.unwrap_err();
        assert!(matches!(err, QueryError::Db(sqlx::Error::RowNotFound)));

        sqlx::query("INSERT INTO filings (id) VALUES (1), (2), (3)")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(FilingQuery::CountAll.execute(&pool).await.unwrap(), 3);
        let id = FilingQuery::FetchFirst.execute(&pool).await.unwrap();
        assert!((1..=3).contains(&id), "unexpected first id {id}");
    }
}
