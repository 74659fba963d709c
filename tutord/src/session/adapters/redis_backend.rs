use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::session::adapters::durable::KeyValueBackend;
use crate::session::store::SessionStoreError;

/// Redis implementation of `KeyValueBackend`
#[derive(Debug)]
pub struct RedisBackend {
    client: redis::Client,
    connection: OnceCell<redis::aio::MultiplexedConnection>,
}

impl RedisBackend {
    /// Create a backend from a connection URL. No connection is made yet.
    pub fn new(connection_url: &str) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, SessionStoreError> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| SessionStoreError::Backend(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn ping(&self) -> Result<(), SessionStoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
        let mut conn = self.connection().await?;
        let payload: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        Ok(payload)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.connection().await?;
        // PX rejects zero
        let millis = ttl.as_millis().max(1) as u64;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
