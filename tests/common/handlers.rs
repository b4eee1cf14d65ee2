use super::Cuisine;
use async_trait::async_trait;
use bastian::{BatchOriginHandler, OriginHandler};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Origin that records every batch it is asked for
#[derive(Debug, Default)]
pub struct CountingBatchHandler {
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<String>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl CountingBatchHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let handler = Self::default();
        handler.failing.store(true, Ordering::SeqCst);
        Arc::new(handler)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Vec<String>> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl BatchOriginHandler<Cuisine> for CountingBatchHandler {
    async fn fetch_many(&self, ids: Vec<String>) -> anyhow::Result<Vec<Cuisine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(ids.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("cuisine service unavailable");
        }
        Ok(ids.iter().map(|id| Cuisine::from_id(id)).collect())
    }
}

/// Single-item origin recording the ids it receives
#[derive(Debug, Default)]
pub struct CountingHandler {
    calls: AtomicUsize,
    received: Mutex<Vec<Option<String>>>,
    failing: AtomicBool,
}

impl CountingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let handler = Self::default();
        handler.failing.store(true, Ordering::SeqCst);
        Arc::new(handler)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Option<String>> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl OriginHandler<Cuisine> for CountingHandler {
    async fn fetch_one(&self, id: Option<String>) -> anyhow::Result<Cuisine> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(id.clone());

        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("cuisine service unavailable");
        }
        Ok(id.as_deref().map(Cuisine::from_id).unwrap_or_else(|| Cuisine::new(0)))
    }
}

/// Origin that blocks every call until a permit is released
#[derive(Debug)]
pub struct GatedBatchHandler {
    calls: AtomicUsize,
    gate: Semaphore,
}

impl GatedBatchHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchOriginHandler<Cuisine> for GatedBatchHandler {
    async fn fetch_many(&self, ids: Vec<String>) -> anyhow::Result<Vec<Cuisine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await?.forget();
        Ok(ids.iter().map(|id| Cuisine::from_id(id)).collect())
    }
}
