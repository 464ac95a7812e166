//! PostgreSQL connection configuration.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use schemadrift_core::ConnectionConfig;

use crate::error::{PgError, PgResult};

/// Default number of catalog queries kept in flight per connection.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Host.
    pub host: String,
    /// Port (default: 5432).
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    pub password: Option<String>,
    /// SSL mode.
    pub ssl_mode: SslMode,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Application name (shown in pg_stat_activity).
    pub application_name: Option<String>,
    /// Upper bound on concurrently pipelined catalog queries.
    pub max_concurrency: usize,
}

/// SSL mode for connections.
///
/// Connections are made without a TLS connector, so only modes that can
/// fall back to plaintext are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Disable SSL.
    Disable,
    /// Prefer SSL but allow non-SSL.
    #[default]
    Prefer,
    /// Require SSL.
    Require,
}

impl SslMode {
    fn parse(value: &str) -> PgResult<Self> {
        match value {
            "disable" => Ok(SslMode::Disable),
            "prefer" | "allow" => Ok(SslMode::Prefer),
            "require" | "verify-ca" | "verify-full" => Ok(SslMode::Require),
            other => Err(PgError::config(format!("invalid sslmode: {}", other))),
        }
    }
}

impl PgConfig {
    /// Create a new configuration from a database URL.
    pub fn from_url(url: impl AsRef<str>) -> PgResult<Self> {
        let parsed = url::Url::parse(url.as_ref())
            .map_err(|e| PgError::config(format!("invalid database URL: {}", e)))?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            return Err(PgError::config(format!(
                "invalid scheme: expected 'postgresql' or 'postgres', got '{}'",
                parsed.scheme()
            )));
        }

        let mut builder = PgConfig::builder()
            .host(
                parsed
                    .host_str()
                    .ok_or_else(|| PgError::config("missing host in URL"))?,
            )
            .database(parsed.path().trim_start_matches('/'));

        if let Some(port) = parsed.port() {
            builder = builder.port(port);
        }
        if !parsed.username().is_empty() {
            builder = builder.user(decode(parsed.username())?);
        }
        if let Some(password) = parsed.password() {
            builder = builder.password(decode(password)?);
        }

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "sslmode" => builder = builder.ssl_mode(SslMode::parse(&value)?),
                "connect_timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| PgError::config("invalid connect_timeout"))?;
                    builder = builder.connect_timeout(Duration::from_secs(secs));
                }
                "application_name" => builder = builder.application_name(value.as_ref()),
                _ => {}
            }
        }

        builder.build()
    }

    /// Create a configuration from dialect-independent settings.
    pub fn from_connection(config: &ConnectionConfig) -> PgResult<Self> {
        let mut builder = PgConfig::builder()
            .host(config.host.as_str())
            .database(config.database.as_str())
            .user(config.user.as_str())
            .ssl_mode(if config.ssl {
                SslMode::Require
            } else {
                SslMode::Prefer
            });

        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        if let Some(ref password) = config.password {
            builder = builder.password(password.as_str());
        }

        builder.build()
    }

    /// Create a builder for configuration.
    pub fn builder() -> PgConfigBuilder {
        PgConfigBuilder::new()
    }

    /// Set the concurrency bound, clamped to at least one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Convert to tokio-postgres config.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.dbname(&self.database);
        config.user(&self.user);

        if let Some(ref password) = self.password {
            config.password(password);
        }

        config.application_name(self.application_name.as_deref().unwrap_or("schemadrift"));
        config.connect_timeout(self.connect_timeout);
        config.ssl_mode(match self.ssl_mode {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer | SslMode::Require => tokio_postgres::config::SslMode::Prefer,
        });

        config
    }
}

/// Builder for PostgreSQL configuration.
#[derive(Debug, Default)]
pub struct PgConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    ssl_mode: Option<SslMode>,
    connect_timeout: Option<Duration>,
    application_name: Option<String>,
    max_concurrency: Option<usize>,
}

impl PgConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the SSL mode.
    pub fn ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = Some(mode);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Set the number of catalog queries kept in flight.
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> PgResult<PgConfig> {
        let database = self
            .database
            .filter(|db| !db.is_empty())
            .ok_or_else(|| PgError::config("missing database name"))?;

        let ssl_mode = self.ssl_mode.unwrap_or_default();
        if ssl_mode == SslMode::Require {
            return Err(PgError::config(
                "TLS connections are not supported; use sslmode=disable or sslmode=prefer",
            ));
        }

        Ok(PgConfig {
            host: self.host.unwrap_or_else(|| "localhost".to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            database,
            user: self.user.unwrap_or_else(|| "postgres".to_string()),
            password: self.password,
            ssl_mode,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            application_name: self.application_name,
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY).max(1),
        })
    }
}

fn decode(s: &str) -> PgResult<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PgError::config("invalid UTF-8 in URL user info"))
}
