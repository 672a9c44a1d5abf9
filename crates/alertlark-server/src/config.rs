//! Server configuration.
//!
//! Every option can be given as a flag or through its environment variable.

use std::net::SocketAddr;
use std::time::Duration;

use alertlark_client::{DEFAULT_BASE_URL, LarkConfig};
use alertlark_core::RedisConfig;
use clap::Parser;

use crate::error::{ServerError, ServerResult};

/// Command-line arguments of the `alertlark` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "alertlark", version, about = "Alertmanager to Lark alert bridge")]
pub struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Redis `host:port` used for alert/message correlation.
    #[arg(long, env = "REDIS_ADDRESS")]
    pub redis_address: String,

    /// Redis password.
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Redis database index.
    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: i64,

    /// Alertmanager host, e.g. `alertmanager:9093`.
    #[arg(long, env = "ALERTMANAGER_HOST")]
    pub alertmanager_host: String,

    /// Token Lark sends with URL verification challenges.
    #[arg(long, env = "VERIFICATION_TOKEN", hide_env_values = true)]
    pub verification_token: String,

    /// Lark app id.
    #[arg(long, env = "LARK_APP_ID")]
    pub lark_app_id: String,

    /// Lark app secret.
    #[arg(long, env = "LARK_APP_SECRET", hide_env_values = true)]
    pub lark_app_secret: String,

    /// Lark Open Platform endpoint.
    #[arg(long, env = "LARK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub lark_base_url: String,

    /// Deadline in seconds for every outbound call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Expire correlation entries after this many seconds.
    #[arg(long, env = "CORRELATION_TTL_SECS")]
    pub correlation_ttl_secs: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Validates the arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if a required value is blank or a
    /// duration is zero.
    pub fn into_config(self) -> ServerResult<ServerConfig> {
        require("REDIS_ADDRESS", &self.redis_address)?;
        require("ALERTMANAGER_HOST", &self.alertmanager_host)?;
        require("VERIFICATION_TOKEN", &self.verification_token)?;
        require("LARK_APP_ID", &self.lark_app_id)?;
        require("LARK_APP_SECRET", &self.lark_app_secret)?;
        if self.request_timeout_secs == 0 {
            return Err(ServerError::Config(
                "REQUEST_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }
        if self.correlation_ttl_secs == Some(0) {
            return Err(ServerError::Config(
                "CORRELATION_TTL_SECS must be greater than zero".into(),
            ));
        }

        Ok(ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], self.port)))
            .with_redis_address(self.redis_address)
            .with_redis_password(self.redis_password)
            .with_redis_db(self.redis_db)
            .with_alertmanager_host(self.alertmanager_host)
            .with_verification_token(self.verification_token)
            .with_lark_credentials(self.lark_app_id, self.lark_app_secret)
            .with_lark_base_url(self.lark_base_url)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_correlation_ttl(self.correlation_ttl_secs.map(Duration::from_secs)))
    }
}

fn require(name: &str, value: &str) -> ServerResult<()> {
    if value.trim().is_empty() {
        return Err(ServerError::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Configuration for the alertlark server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Redis `host:port`.
    pub redis_address: String,
    /// Redis password.
    pub redis_password: Option<String>,
    /// Redis database index.
    pub redis_db: i64,
    /// Alertmanager host.
    pub alertmanager_host: String,
    /// Expected URL verification token.
    pub verification_token: String,
    /// Lark app id.
    pub lark_app_id: String,
    /// Lark app secret.
    pub lark_app_secret: String,
    /// Lark Open Platform endpoint.
    pub lark_base_url: String,
    /// Deadline for every outbound call.
    pub request_timeout: Duration,
    /// Time-to-live of correlation entries.
    pub correlation_ttl: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_address: "localhost:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            alertmanager_host: "localhost:9093".to_string(),
            verification_token: String::new(),
            lark_app_id: String::new(),
            lark_app_secret: String::new(),
            lark_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            correlation_ttl: None,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the Redis address.
    #[must_use]
    pub fn with_redis_address(mut self, address: impl Into<String>) -> Self {
        self.redis_address = address.into();
        self
    }

    /// Set the Redis password; an empty password means none.
    #[must_use]
    pub fn with_redis_password(mut self, password: Option<String>) -> Self {
        self.redis_password = password.filter(|p| !p.is_empty());
        self
    }

    /// Set the Redis database index.
    #[must_use]
    pub const fn with_redis_db(mut self, db: i64) -> Self {
        self.redis_db = db;
        self
    }

    /// Set the Alertmanager host.
    #[must_use]
    pub fn with_alertmanager_host(mut self, host: impl Into<String>) -> Self {
        self.alertmanager_host = host.into();
        self
    }

    /// Set the expected URL verification token.
    #[must_use]
    pub fn with_verification_token(mut self, token: impl Into<String>) -> Self {
        self.verification_token = token.into();
        self
    }

    /// Set the Lark app credentials.
    #[must_use]
    pub fn with_lark_credentials(
        mut self,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        self.lark_app_id = app_id.into();
        self.lark_app_secret = app_secret.into();
        self
    }

    /// Set the Lark endpoint.
    #[must_use]
    pub fn with_lark_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.lark_base_url = base_url.into();
        self
    }

    /// Set the outbound call deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the correlation entry time-to-live.
    #[must_use]
    pub const fn with_correlation_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.correlation_ttl = ttl;
        self
    }

    /// Settings for the Lark client.
    #[must_use]
    pub fn lark(&self) -> LarkConfig {
        LarkConfig::new(&self.lark_app_id, &self.lark_app_secret)
            .with_base_url(&self.lark_base_url)
            .with_timeout(self.request_timeout)
    }

    /// Settings for the Redis correlation store.
    #[must_use]
    pub fn redis(&self) -> RedisConfig {
        RedisConfig::new(&self.redis_address)
            .with_password(self.redis_password.clone())
            .with_db(self.redis_db)
            .with_ttl(self.correlation_ttl)
            .with_timeout(self.request_timeout)
    }
}
