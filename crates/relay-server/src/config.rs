//! Configuration for the relay server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `RELAY_BIND_ADDR`          (default: "0.0.0.0")
//! - `RELAY_PORT`               (default: "8000")
//! - `RELAY_MAX_CLIENTS`        (default: "1024")
//! - `RELAY_DATABASE_URL`       (default: "sqlite://chat-relay.db?mode=rwc")
//! - `RELAY_DB_MAX_CONNECTIONS` (default: "5")
//! - `RELAY_OUTBOUND_QUEUE`     (default: "0", write inline from the dispatcher)
//! - `RELAY_LOG_JSON`           (default: "false")

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients. Upgrade
    /// requests beyond this are refused with 503.
    pub max_clients: usize,

    /// sqlx connection URL of the message store.
    pub database_url: String,

    pub db_max_connections: u32,

    /// Per-connection outbound queue capacity. `0` means no queue: the
    /// dispatching task writes to each socket itself.
    pub outbound_queue: usize,

    /// Emit logs as JSON lines instead of the human format.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            max_clients: 1024,
            database_url: "sqlite://chat-relay.db?mode=rwc".to_string(),
            db_max_connections: 5,
            outbound_queue: 0,
            log_json: false,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let bind_addr = env::var("RELAY_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("RELAY_PORT", defaults.port)?;
        let max_clients = read_env_or_default("RELAY_MAX_CLIENTS", defaults.max_clients)?;
        let database_url = env::var("RELAY_DATABASE_URL").unwrap_or(defaults.database_url);
        let db_max_connections =
            read_env_or_default("RELAY_DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        let outbound_queue = read_env_or_default("RELAY_OUTBOUND_QUEUE", defaults.outbound_queue)?;
        let log_json = read_env_flag("RELAY_LOG_JSON", defaults.log_json)?;

        if db_max_connections == 0 {
            bail!("RELAY_DB_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            database_url,
            db_max_connections,
            outbound_queue,
            log_json,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}

fn read_env_flag(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(val) => parse_flag(&val).with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}
