// ABOUTME: MySQL connection handling for the conversion source
// ABOUTME: Parses server specifications and opens pooled connections to information_schema

pub mod catalog;

pub use catalog::MySqlCatalog;

use anyhow::{bail, Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::fmt;
use std::time::Duration;

use crate::utils;

/// Catalog database every connection is opened against
pub const CATALOG_DATABASE: &str = "information_schema";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Server address and credentials in `<user>:<password>@<host>:<port>` form
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl ServerSpec {
    /// Parse a server specification
    ///
    /// The credentials end at the last `@`, so passwords may contain `@`
    /// and `:`. The port follows the last `:` of the host part.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql2sqlite::mysql::ServerSpec;
    /// let spec = ServerSpec::parse("root:p@ss:word@db.local:3306").unwrap();
    /// assert_eq!(spec.user, "root");
    /// assert_eq!(spec.password, "p@ss:word");
    /// assert_eq!(spec.host, "db.local");
    /// assert_eq!(spec.port, 3306);
    ///
    /// assert!(ServerSpec::parse("root@db.local:3306").is_err());
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        const EXPECTED: &str = "Expected format: <user>:<password>@<host>:<port>";

        let Some((credentials, address)) = spec.rsplit_once('@') else {
            bail!("Malformed server specification: missing '@'.\n{}", EXPECTED);
        };
        let Some((user, password)) = credentials.split_once(':') else {
            bail!(
                "Malformed server specification: missing ':' between user and password.\n{}",
                EXPECTED
            );
        };
        let Some((host, port)) = address.rsplit_once(':') else {
            bail!(
                "Malformed server specification: missing ':' before the port.\n{}",
                EXPECTED
            );
        };

        if user.is_empty() {
            bail!("Malformed server specification: user is empty.\n{}", EXPECTED);
        }
        if host.is_empty() {
            bail!("Malformed server specification: host is empty.\n{}", EXPECTED);
        }
        let port = port.parse::<u16>().with_context(|| {
            format!(
                "Malformed server specification: invalid port '{}'.\n{}",
                port, EXPECTED
            )
        })?;

        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
        })
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(CATALOG_DATABASE)
            .charset("utf8mb4")
    }
}

impl fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

impl fmt::Debug for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSpec")
            .field("user", &self.user)
            .field("password", &"********")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Open a connection pool to the server's catalog database
pub async fn connect(spec: &ServerSpec, max_connections: u32) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect_with(spec.connect_options())
        .await
        .with_context(|| format!("Failed to connect to MySQL server {}", spec))?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .with_context(|| format!("MySQL server {} did not answer a test query", spec))?;

    tracing::info!("Connected to MySQL server {}", spec);
    Ok(pool)
}

/// Connect with automatic retry for transient failures
pub async fn connect_with_retry(spec: &ServerSpec, max_connections: u32) -> Result<MySqlPool> {
    utils::retry_with_backoff(
        || connect(spec, max_connections),
        3,                      // Max 3 retries
        Duration::from_secs(1), // Start with 1 second delay
    )
    .await
    .context("Failed to connect after retries")
}
