#![allow(dead_code)]

pub mod handlers;
pub mod stores;

pub use handlers::*;
pub use stores::*;

use bastian::{CacheEvent, PublishedEvent};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cuisine {
    pub id: u32,
    pub name: String,
}

impl Cuisine {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("cuisine-{id}"),
        }
    }

    pub fn from_id(id: &str) -> Self {
        Self::new(id.parse().unwrap_or_default())
    }

    pub fn json(id: u32) -> String {
        serde_json::to_string(&Self::new(id)).unwrap()
    }
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("bastian=debug")
        .try_init();
}

/// Poll `condition` until it holds; write-back runs on a spawned task
pub async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Everything published so far, without waiting
pub fn drain(receiver: &mut broadcast::Receiver<PublishedEvent>) -> Vec<CacheEvent> {
    let mut events = Vec::new();
    while let Ok(published) = receiver.try_recv() {
        events.push(published.event);
    }
    events
}

pub fn names(events: &[CacheEvent]) -> Vec<&'static str> {
    events.iter().map(CacheEvent::name).collect()
}
