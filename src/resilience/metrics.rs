//! Breaker statistics.
//!
//! A breaker counts every call it sees: `fires` reached the origin and ended as a success,
//! failure or timeout; `rejects` were refused without running. The registry gathers one
//! snapshot per service into [`SystemCircuitBreakerMetrics`].

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Lifetime counters of one breaker plus its current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// Calls that reached the origin
    pub fires: u64,
    pub successes: u64,
    /// Origin errors, timeouts excluded
    pub failures: u64,
    pub timeouts: u64,
    /// Calls refused while open or while a trial was running
    pub rejects: u64,
    /// Failures and timeouts over the rolling window, in percent
    pub window_error_percentage: f64,
    /// Mean origin latency over every fire
    pub latency_mean: Duration,
}

impl CircuitBreakerMetrics {
    /// Failures plus timeouts
    pub fn errors(&self) -> u64 {
        self.failures + self.timeouts
    }

    /// Lifetime share of fires that ended in an error
    pub fn error_rate(&self) -> f64 {
        if self.fires == 0 {
            return 0.0;
        }
        self.errors() as f64 / self.fires as f64
    }
}

/// Snapshot of every breaker in a registry, keyed by service name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    pub services: BTreeMap<String, CircuitBreakerMetrics>,
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    pub fn collect(services: impl IntoIterator<Item = (String, CircuitBreakerMetrics)>) -> Self {
        Self {
            services: services.into_iter().collect(),
            collected_at: Utc::now(),
        }
    }

    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for metrics in self.services.values() {
            *counts.entry(metrics.state).or_insert(0) += 1;
        }
        counts
    }

    /// Share of services whose circuit is not open; 1.0 for an empty registry
    pub fn health_score(&self) -> f64 {
        if self.services.is_empty() {
            return 1.0;
        }
        let serving = self
            .services
            .values()
            .filter(|metrics| metrics.state != CircuitState::Open)
            .count();
        serving as f64 / self.services.len() as f64
    }

    /// Errors over fires across every service
    pub fn error_rate(&self) -> f64 {
        let (fires, errors) = self
            .services
            .values()
            .fold((0, 0), |(fires, errors), metrics| {
                (fires + metrics.fires, errors + metrics.errors())
            });
        if fires == 0 {
            return 0.0;
        }
        errors as f64 / fires as f64
    }
}

impl fmt::Display for SystemCircuitBreakerMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.count_by_state();
        let count = |state: CircuitState| counts.get(&state).copied().unwrap_or(0);
        write!(
            f,
            "{} services ({} open, {} half-open), error rate {:.1}%",
            self.services.len(),
            count(CircuitState::Open),
            count(CircuitState::HalfOpen),
            self.error_rate() * 100.0
        )
    }
}
