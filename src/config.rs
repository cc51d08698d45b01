//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Two switches select the backing
//! services: `USE_REDIS` picks the channel layer and `USE_SQLITE` picks the
//! database.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which channel layer implementation to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelBackend {
    /// Single-process delivery. Nothing survives a restart.
    InMemory,
    /// Redis pub/sub fan-out across server instances.
    Redis {
        /// Connection URL, e.g. `redis://localhost:6379/`.
        url: String,
        /// Prefix for all published channel names.
        prefix: String,
    },
}

/// Which database to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// SQLite connection string (`sqlite://path?mode=rwc` or `sqlite::memory:`).
    Sqlite(String),
    /// PostgreSQL server.
    Postgres(PostgresTarget),
}

/// Where the PostgreSQL server is.
///
/// The parts are passed to the driver one by one, so credentials never
/// need URL escaping.
#[derive(Clone, PartialEq, Eq)]
pub enum PostgresTarget {
    /// A full `DATABASE_URL`.
    Url(String),
    /// Settings assembled from the `DB_*` variables.
    Parts {
        /// `DB_USER`.
        user: String,
        /// `DB_PASSWORD`; empty means none.
        password: String,
        /// `DB_HOST`.
        host: String,
        /// `DB_PORT`.
        port: u16,
        /// `DB_NAME`.
        name: String,
    },
}

impl fmt::Debug for PostgresTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            Self::Parts {
                user,
                host,
                port,
                name,
                ..
            } => f
                .debug_struct("Parts")
                .field("user", user)
                .field("host", host)
                .field("port", port)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level server configuration.
///
/// Loaded once at startup via [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// Selected channel layer.
    pub channel_backend: ChannelBackend,

    /// Per-connection inbox capacity of the channel layer.
    pub channel_capacity: usize,

    /// Selected database.
    pub database: DatabaseBackend,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Root directory for uploaded media.
    pub media_root: PathBuf,

    /// Directory reserved for the vector store.
    pub vector_db_dir: PathBuf,

    /// Per-request timeout for REST handlers.
    pub request_timeout_secs: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()?;

        let channel_backend = if parse_env_bool("USE_REDIS", false) {
            let host = env_or("REDIS_HOST", "localhost");
            let port: u16 = parse_env("REDIS_PORT", 6379);
            ChannelBackend::Redis {
                url: format!("redis://{host}:{port}/"),
                prefix: env_or("REDIS_CHANNEL_PREFIX", "livequiz"),
            }
        } else {
            ChannelBackend::InMemory
        };

        let database = if parse_env_bool("USE_SQLITE", false) {
            let path = env_or("SQLITE_PATH", "db.sqlite3");
            DatabaseBackend::Sqlite(format!("sqlite://{path}?mode=rwc"))
        } else {
            DatabaseBackend::Postgres(postgres_target_from_env())
        };

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            channel_backend,
            channel_capacity: parse_env("CHANNEL_CAPACITY", 100),
            database,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
            database_connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5),
            media_root: PathBuf::from(env_or("MEDIA_ROOT", "media")),
            vector_db_dir: PathBuf::from(env_or("VECTOR_DB_DIR", "vector_db")),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            log_format,
        })
    }

    /// Configuration that needs no external service: in-memory channel
    /// layer and an in-memory SQLite database.
    #[must_use]
    pub fn local(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            channel_backend: ChannelBackend::InMemory,
            channel_capacity: 100,
            database: DatabaseBackend::Sqlite("sqlite::memory:".to_string()),
            database_max_connections: 1,
            database_connect_timeout_secs: 5,
            media_root: PathBuf::from("media"),
            vector_db_dir: PathBuf::from("vector_db"),
            request_timeout_secs: 30,
            log_format: LogFormat::Text,
        }
    }
}

/// `DATABASE_URL` wins; otherwise the target is assembled from the `DB_*`
/// variables.
fn postgres_target_from_env() -> PostgresTarget {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return PostgresTarget::Url(url);
    }
    PostgresTarget::Parts {
        user: env_or("DB_USER", "postgres"),
        password: env_or("DB_PASSWORD", ""),
        host: env_or("DB_HOST", "localhost"),
        port: parse_env("DB_PORT", 5432),
        name: env_or("DB_NAME", "livequiz"),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. See [`parse_bool`].
fn parse_env_bool(key: &str, default: bool) -> bool {
    parse_bool(std::env::var(key).ok().as_deref(), default)
}

/// Accepts `"true"`, `"True"`, `"TRUE"`, `"1"` and the `false`/`0`
/// equivalents. Returns `default` otherwise.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value {
        Some("true") | Some("True") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("False") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
