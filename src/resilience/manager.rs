//! # Circuit Breaker Manager
//!
//! Process-wide registry holding one circuit breaker per origin service. Built once at
//! application start and shared (it is cheap to clone) with every cache that calls an
//! origin. Breakers are never removed.

use crate::config::CircuitBreakersConfig;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState,
    CircuitStateListener, SystemCircuitBreakerMetrics,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Manager for the circuit breakers of every origin service
#[derive(Clone)]
pub struct CircuitBreakerManager {
    /// Circuit breakers by service name
    circuit_breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,

    /// Configuration
    config: Arc<CircuitBreakersConfig>,

    /// Subscribed to every breaker, existing and future
    listeners: Arc<RwLock<Vec<Arc<dyn CircuitStateListener>>>>,
}

impl CircuitBreakerManager {
    /// Create a manager with default breaker settings for every service
    pub fn new() -> Self {
        Self::from_config(&CircuitBreakersConfig::default())
    }

    /// Create a manager from file-based configuration
    pub fn from_config(config: &CircuitBreakersConfig) -> Self {
        info!(
            configured_components = config.component_configs.len(),
            max_circuit_breakers = config.global_settings.max_circuit_breakers,
            "Initializing circuit breaker manager"
        );

        Self {
            circuit_breakers: Arc::new(DashMap::new()),
            config: Arc::new(config.clone()),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_listener(self, listener: Arc<dyn CircuitStateListener>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Subscribe a listener to all current and future circuit breakers.
    ///
    /// Adding the same listener again is a no-op. Listeners that report themselves inactive
    /// are dropped here and by every breaker.
    pub fn add_listener(&self, listener: Arc<dyn CircuitStateListener>) {
        {
            let mut listeners = self.listeners.write();
            listeners.retain(|existing| existing.is_active());
            if listeners
                .iter()
                .any(|existing| same_listener(existing, &listener))
            {
                return;
            }
            listeners.push(Arc::clone(&listener));
        }

        for breaker in self.snapshot() {
            breaker.subscribe(Arc::clone(&listener));
        }
    }

    /// Listeners still able to receive transitions
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|listener| listener.is_active())
            .count()
    }

    /// Get or create the breaker for a service using its configured settings
    pub fn get_circuit_breaker(&self, service_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(service_name) {
            return Arc::clone(breaker.value());
        }

        let config = self
            .config
            .config_for_component(service_name)
            .to_resilience_config();
        self.get_or_create(service_name, &config)
    }

    /// Get the breaker for a service, creating it with `config` if none exists yet.
    ///
    /// The first configuration registered for a name wins; later ones are ignored.
    pub fn get_or_create(
        &self,
        service_name: &str,
        config: &CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(service_name) {
            let breaker = Arc::clone(breaker.value());
            if breaker.config() != config {
                warn!(
                    component = service_name,
                    "Circuit breaker already exists with different settings, keeping original"
                );
            }
            return breaker;
        }

        let max_allowed = self.config.global_settings.max_circuit_breakers;
        let mut created = false;

        // The entry holds the shard lock, so concurrent first use creates exactly one breaker
        let breaker = self
            .circuit_breakers
            .entry(service_name.to_string())
            .or_insert_with(|| {
                created = true;
                let breaker = CircuitBreaker::new(service_name, config.clone());
                for listener in self.listeners.read().iter() {
                    if listener.is_active() {
                        breaker.subscribe(Arc::clone(listener));
                    }
                }
                breaker
            })
            .value()
            .clone();

        if created {
            let total = self.circuit_breakers.len();
            if total > max_allowed {
                warn!(
                    component = service_name,
                    current_count = total,
                    max_allowed = max_allowed,
                    "Circuit breaker count exceeds configured maximum"
                );
            }
            info!(
                component = service_name,
                total_circuit_breakers = total,
                "Created new circuit breaker"
            );
        }

        breaker
    }

    /// Get all circuit breaker names
    pub fn list_components(&self) -> Vec<String> {
        self.circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.circuit_breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuit_breakers.is_empty()
    }

    /// Get metrics for a specific circuit breaker
    pub fn get_component_metrics(&self, service_name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breakers
            .get(service_name)
            .map(|breaker| breaker.metrics())
    }

    /// Get system-wide circuit breaker metrics
    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        SystemCircuitBreakerMetrics::collect(
            self.snapshot()
                .into_iter()
                .map(|breaker| (breaker.name().to_string(), breaker.metrics())),
        )
    }

    /// Get count of circuit breakers by state
    pub fn get_state_summary(&self) -> HashMap<CircuitState, usize> {
        self.get_system_metrics().count_by_state()
    }

    /// Check overall system health based on circuit breaker states
    pub fn system_health_score(&self) -> f64 {
        self.get_system_metrics().health_score()
    }

    /// Force open all circuit breakers (emergency stop)
    pub fn force_open_all(&self) {
        warn!(
            summary = %self.get_system_metrics(),
            "Forcing all circuit breakers open (emergency stop)"
        );

        for breaker in self.snapshot() {
            breaker.force_open();
        }
    }

    /// Force close all circuit breakers (emergency recovery)
    pub fn force_close_all(&self) {
        warn!(
            summary = %self.get_system_metrics(),
            "Forcing all circuit breakers closed (emergency recovery)"
        );

        for breaker in self.snapshot() {
            breaker.force_closed();
        }
    }

    /// Breakers collected outside the map locks so listeners may call back into the manager
    fn snapshot(&self) -> Vec<Arc<CircuitBreaker>> {
        self.circuit_breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

fn same_listener(a: &Arc<dyn CircuitStateListener>, b: &Arc<dyn CircuitStateListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CircuitBreakerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerManager")
            .field("components", &self.list_components())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
