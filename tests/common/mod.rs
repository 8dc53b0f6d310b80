//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use projects_cache::connector::{MemoryConnector, Pipeline, StoreConnector, StoreScript};
use projects_cache::error::{CacheError, Result};
use projects_cache::{CacheService, Config};

/// Wraps a [`MemoryConnector`], counting calls and optionally failing all of them.
#[derive(Default)]
pub struct FlakyConnector {
    inner: MemoryConnector,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryConnector {
        &self.inner
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Connectivity("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreConnector for FlakyConnector {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter()?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.enter()?;
        self.inner.set_ex(key, value, ttl_secs).await
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl_ms: u64) -> Result<bool> {
        self.enter()?;
        self.inner.set_nx_px(key, value, ttl_ms).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.enter()?;
        self.inner.del(keys).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.enter()?;
        self.inner.mget(keys).await
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<()> {
        self.enter()?;
        self.inner.execute(pipeline).await
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        self.enter()?;
        self.inner.scan(pattern).await
    }

    async fn eval(&self, script: &StoreScript, keys: &[String], args: &[String]) -> Result<i64> {
        self.enter()?;
        self.inner.eval(script, keys, args).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.enter()?;
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        self.enter()?;
        self.inner.expire(key, ttl_secs).await
    }

    async fn ping(&self) -> Result<String> {
        self.enter()?;
        self.inner.ping().await
    }

    async fn info(&self) -> Result<String> {
        self.enter()?;
        self.inner.info().await
    }
}

/// Service over a fresh [`FlakyConnector`], returning both.
pub fn flaky_service() -> (Arc<CacheService>, Arc<FlakyConnector>) {
    let connector = Arc::new(FlakyConnector::new());
    let service = CacheService::new(connector.clone(), &Config::default())
        .expect("default config is valid");
    (Arc::new(service), connector)
}
