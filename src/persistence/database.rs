//! Connection pools for the two supported databases.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};

use crate::config::{DatabaseBackend, PostgresTarget};
use crate::error::QuizError;

/// Runs the same query body against whichever pool is active.
///
/// Each arm is type-checked against its concrete pool, so the body may
/// use any sqlx API both drivers support.
macro_rules! with_pool {
    ($db:expr, |$pool:ident| $body:expr) => {
        match $db {
            $crate::persistence::Database::Sqlite($pool) => $body,
            $crate::persistence::Database::Postgres($pool) => $body,
        }
    };
}

pub(crate) use with_pool;

/// An open connection pool.
#[derive(Debug, Clone)]
pub enum Database {
    /// SQLite file or in-memory database.
    Sqlite(SqlitePool),
    /// PostgreSQL server.
    Postgres(PgPool),
}

impl Database {
    /// Opens a pool for `backend`.
    ///
    /// In-memory SQLite is pinned to one long-lived connection, since each
    /// new connection would otherwise see an empty database.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(
        backend: &DatabaseBackend,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, QuizError> {
        match backend {
            DatabaseBackend::Sqlite(url) => {
                let options = SqliteConnectOptions::from_str(url)?
                    .create_if_missing(true)
                    .foreign_keys(true);
                let in_memory = url.contains(":memory:") || url.contains("mode=memory");
                let pool_options = if in_memory {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    SqlitePoolOptions::new().max_connections(max_connections.max(1))
                };
                let pool = pool_options
                    .acquire_timeout(connect_timeout)
                    .connect_with(options)
                    .await?;
                Ok(Self::Sqlite(pool))
            }
            DatabaseBackend::Postgres(target) => {
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections.max(1))
                    .acquire_timeout(connect_timeout)
                    .connect_with(postgres_options(target)?)
                    .await?;
                Ok(Self::Postgres(pool))
            }
        }
    }

    /// Opens a fresh in-memory SQLite database and migrates it.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] on failure.
    pub async fn in_memory() -> Result<Self, QuizError> {
        let db = Self::connect(
            &DatabaseBackend::Sqlite("sqlite::memory:".to_string()),
            1,
            Duration::from_secs(5),
        )
        .await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Applies the embedded migrations for the active backend.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), QuizError> {
        let result = match self {
            Self::Sqlite(pool) => sqlx::migrate!("./migrations/sqlite").run(pool).await,
            Self::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(pool).await,
        };
        result.map_err(|e| QuizError::Persistence(sqlx::Error::Migrate(Box::new(e))))
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Runs `SELECT 1` against the pool.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::Persistence`] if the database is unreachable.
    pub async fn ping(&self) -> Result<(), QuizError> {
        with_pool!(self, |pool| {
            sqlx::query("SELECT 1").execute(pool).await?;
        });
        Ok(())
    }
}

/// Driver options for `target`.
///
/// # Errors
///
/// Returns [`QuizError::Persistence`] if a `DATABASE_URL` cannot be parsed.
pub fn postgres_options(target: &PostgresTarget) -> Result<PgConnectOptions, QuizError> {
    match target {
        PostgresTarget::Url(url) => Ok(PgConnectOptions::from_str(url)?),
        PostgresTarget::Parts {
            user,
            password,
            host,
            port,
            name,
        } => {
            let options = PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .database(name);
            Ok(if password.is_empty() {
                options
            } else {
                options.password(password)
            })
        }
    }
}
