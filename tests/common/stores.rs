use async_trait::async_trait;
use bastian::{InMemoryStore, KeyValueStore, StoreEntry, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// In-memory store that can be told to fail reads or writes, and counts reads
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    short_reads: AtomicBool,
    reads: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make multi-get return one value fewer than asked for
    pub fn set_short_reads(&self, short: bool) {
        self.short_reads.store(short, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check_read(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        Ok(())
    }

    fn check_write(&self, operation: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::operation(operation, "read-only replica"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.check_read()?;
        let mut values = self.inner.multi_get(keys).await?;
        if self.short_reads.load(Ordering::SeqCst) {
            values.pop();
        }
        Ok(values)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_read()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.check_write("set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn multi_set(&self, entries: Vec<StoreEntry>) -> Result<(), StoreError> {
        self.check_write("multi_set")?;
        self.inner.multi_set(entries).await
    }
}

/// In-memory store whose writes wait for a released permit
#[derive(Debug)]
pub struct GatedStore {
    inner: InMemoryStore,
    gate: Semaphore,
    parked_writes: AtomicUsize,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::new(),
            gate: Semaphore::new(0),
            parked_writes: AtomicUsize::new(0),
        })
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    /// Writes currently waiting for a permit
    pub fn parked_writes(&self) -> usize {
        self.parked_writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    async fn pass_gate(&self) -> Result<(), StoreError> {
        self.parked_writes.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.parked_writes.fetch_sub(1, Ordering::SeqCst);
        permit
            .map(|permit| permit.forget())
            .map_err(|_| StoreError::unavailable("gate closed"))
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.inner.multi_get(keys).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.pass_gate().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn multi_set(&self, entries: Vec<StoreEntry>) -> Result<(), StoreError> {
        self.pass_gate().await?;
        self.inner.multi_set(entries).await
    }
}
