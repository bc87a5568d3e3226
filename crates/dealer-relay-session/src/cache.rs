//! Redis-backed [`CredentialCache`].

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::{CredentialCache, SessionError};

/// Stores credentials in Redis with `SET key value EX ttl`.
///
/// The connection manager reconnects on its own and is cheap to clone, so
/// every call works on a clone instead of locking a shared connection.
#[derive(Clone)]
pub struct RedisCredentialCache {
    redis: ConnectionManager,
}

impl RedisCredentialCache {
    /// Connects to the Redis server at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!("credential cache connected");
        Ok(Self { redis })
    }
}

impl CredentialCache for RedisCredentialCache {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionError> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }
}
