use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Postgres SQLSTATE raised when a query references a table that does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let url = config.database_url();
    PgPoolOptions::new()
        .min_connections(config.db.pool_min)
        .max_connections(config.db.pool_max)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&url)
        .await
}

pub fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

/// True for failures where the database never answered.
pub fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_count_as_unavailable() {
        assert!(is_unavailable(&sqlx::Error::PoolTimedOut));
        assert!(is_unavailable(&sqlx::Error::PoolClosed));
        assert!(!is_unavailable(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn non_database_errors_are_not_undefined_table() {
        assert!(!is_undefined_table(&sqlx::Error::RowNotFound));
    }
}
