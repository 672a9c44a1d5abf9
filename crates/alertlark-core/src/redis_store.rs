//! Redis-backed [`CorrelationStore`].

use std::future::Future;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::store::CorrelationStore;

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub address: String,
    /// Optional password.
    pub password: Option<String>,
    /// Database index.
    pub db: i64,
    /// Time-to-live for new entries; `None` keeps them until deleted.
    pub ttl: Option<Duration>,
    /// Deadline applied to every command.
    pub timeout: Duration,
}

impl RedisConfig {
    /// Creates a configuration for the given address with no password,
    /// database 0, no TTL and a 10 second command deadline.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: None,
            db: 0,
            ttl: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Sets the database index.
    #[must_use]
    pub const fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// Sets the entry time-to-live.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the per-command deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the `redis://` connection URL.
    ///
    /// # Errors
    ///
    /// Returns a store error if the address does not form a valid URL.
    pub fn url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!("redis://{}/{}", self.address, self.db))
            .map_err(|e| CoreError::store(format!("invalid redis address {}: {e}", self.address)))?;
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|()| CoreError::store("redis address cannot carry a password"))?;
        }
        Ok(url)
    }

    /// Returns the connection URL with the password masked, for logging.
    #[must_use]
    pub fn sanitized_url(&self) -> String {
        match self.url() {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "invalid_url".to_string(),
        }
    }
}

/// Correlation store backed by Redis string keys.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    ttl: Option<Duration>,
    timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns a store error if the URL is invalid or the connection cannot
    /// be established within the configured deadline.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!(url = %config.sanitized_url(), "connecting to redis");

        let client = redis::Client::open(config.url()?.as_str())
            .map_err(|e| CoreError::store(e.to_string()))?;
        let conn = with_deadline(config.timeout, ConnectionManager::new(client)).await?;

        info!("redis connection established");
        Ok(Self {
            conn,
            ttl: config.ttl,
            timeout: config.timeout,
        })
    }
}

async fn with_deadline<T>(
    timeout: Duration,
    fut: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| CoreError::store(e.to_string())),
        Err(_) => Err(CoreError::store(format!(
            "redis command timed out after {timeout:?}"
        ))),
    }
}

impl CorrelationStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = with_deadline(self.timeout, conn.get(key)).await?;
        debug!(key, found = value.is_some(), "redis get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        match self.ttl {
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                let _: () = with_deadline(self.timeout, conn.set_ex(key, value, secs)).await?;
            }
            None => {
                let _: () = with_deadline(self.timeout, conn.set(key, value)).await?;
            }
        }
        debug!(key, "redis set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = with_deadline(self.timeout, conn.del(key)).await?;
        debug!(key, "redis del");
        Ok(())
    }
}
