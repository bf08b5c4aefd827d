use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tokio::sync::OnceCell;

use crate::cache::{CacheError, CacheStore, DEFAULT_OP_TIMEOUT};

/// Redis-backed cache using `SET key value EX ttl`.
///
/// The connection is opened lazily on first use so an unreachable server does
/// not block startup. Connects and commands are bounded by `timeout`; every
/// failure surfaces as `CacheError::Backend`.
pub struct RedisStore {
    client: Client,
    prefix: String,
    timeout: Duration,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisStore {
    pub fn open(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        Ok(Self {
            client: Client::open(url)?,
            prefix: prefix.into(),
            timeout: DEFAULT_OP_TIMEOUT,
            connection: OnceCell::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, what: &str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Backend(format!(
                "redis {what} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let conn = self
            .connection
            .get_or_try_init(|| {
                self.bounded("connect", self.client.get_multiplexed_async_connection())
            })
            .await?;
        Ok(conn.clone())
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let mut get = redis::cmd("GET");
        get.arg(self.key(key));
        self.bounded("GET", get.query_async::<_, Option<String>>(&mut conn))
            .await
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let key = self.key(key);

        let mut get = redis::cmd("GET");
        get.arg(&key);
        let current = self
            .bounded("GET", get.query_async::<_, Option<String>>(&mut conn))
            .await?;
        if !needs_write(current.as_deref(), &value) {
            return Ok(());
        }

        let seconds = ttl.as_secs().max(1);
        let mut set = redis::cmd("SET");
        set.arg(&key).arg(value).arg("EX").arg(seconds);
        self.bounded("SET", set.query_async::<_, ()>(&mut conn)).await
    }
}

/// Identical live value: keep the existing TTL, same as the memory store.
fn needs_write(current: Option<&str>, value: &str) -> bool {
    current != Some(value)
}
