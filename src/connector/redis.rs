//! Redis Connector
//!
//! Production [`StoreConnector`] over a multiplexed Redis connection. Every
//! command is bounded by the configured operation timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::info;

use crate::config::Config;
use crate::connector::{Pipeline, PipelineCommand, StoreConnector, StoreScript};
use crate::error::{CacheError, Result};

// == Redis Connector ==
/// Redis-backed store connector.
///
/// The multiplexed connection is cheap to clone; each command clones it so
/// concurrent callers share one socket.
#[derive(Clone)]
pub struct RedisConnector {
    conn: MultiplexedConnection,
    operation_timeout: Duration,
}

impl RedisConnector {
    /// Opens a connection to the server named by `config.redis_url`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| CacheError::Config(format!("Redis client error: {}", e)))?;

        let conn = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout),
            client.get_multiplexed_async_connection(),
        )
        .await??;

        info!(url = %config.redis_url, "connected to redis");
        Ok(Self {
            conn,
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
        })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    /// Runs one command under the operation timeout.
    async fn bounded<T, F>(&self, command: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        Ok(tokio::time::timeout(self.operation_timeout, command).await??)
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        self.bounded(async move { conn.get(key).await }).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn();
        self.bounded(async move { conn.set_ex(key, value, ttl_secs).await })
            .await
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl_ms: u64) -> Result<bool> {
        let mut conn = self.conn();
        let reply: Option<String> = self
            .bounded(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut conn = self.conn();
        self.bounded(async move { conn.del(keys).await }).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut conn = self.conn();
        self.bounded(async move { redis::cmd("MGET").arg(keys).query_async(&mut conn).await })
            .await
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<()> {
        let mut pipe = redis::pipe();
        for command in pipeline.commands() {
            match command {
                PipelineCommand::SetEx {
                    key,
                    value,
                    ttl_secs,
                } => {
                    pipe.cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("EX")
                        .arg(*ttl_secs)
                        .ignore();
                }
            }
        }

        let mut conn = self.conn();
        self.bounded(async move { pipe.query_async(&mut conn).await })
            .await
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        self.bounded(async move {
            let mut iter = conn.scan_match::<_, String>(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            Ok::<_, redis::RedisError>(keys)
        })
        .await
    }

    async fn eval(&self, script: &StoreScript, keys: &[String], args: &[String]) -> Result<i64> {
        let script = redis::Script::new(script.source);
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let mut conn = self.conn();
        self.bounded(async move { invocation.invoke_async(&mut conn).await })
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn();
        self.bounded(async move { conn.exists(key).await }).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let seconds = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let mut conn = self.conn();
        self.bounded(async move { conn.expire(key, seconds).await })
            .await
    }

    async fn ping(&self) -> Result<String> {
        let mut conn = self.conn();
        self.bounded(async move { redis::cmd("PING").query_async(&mut conn).await })
            .await
    }

    async fn info(&self) -> Result<String> {
        let mut conn = self.conn();
        self.bounded(async move { redis::cmd("INFO").query_async(&mut conn).await })
            .await
    }
}
