//! # Circuit Breaker Implementation
//!
//! Protects an origin call with a rolling failure-rate window and a call timeout.
//! Three states: Closed (normal operation), Open (failing fast) and Half-Open (a single
//! trial call decides whether the origin has recovered).
//!
//! ```text
//! Closed   → Open:     error percentage over the rolling window reaches the threshold
//! Open     → HalfOpen: reset timeout elapsed
//! HalfOpen → Closed:   trial call succeeded (window reset)
//! HalfOpen → Open:     trial call failed or timed out (reset timer restarts)
//! ```

use crate::resilience::rolling_window::{Outcome, RollingWindow};
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifetime call counters, separate from the rolling window used for tripping
#[derive(Debug, Default)]
struct CallCounters {
    fires: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    rejects: AtomicU64,
    latency_nanos: AtomicU64,
}

impl CallCounters {
    fn record(&self, outcome: Outcome, duration: Duration) {
        let counter = match outcome {
            Outcome::Success => &self.successes,
            Outcome::Failure => &self.failures,
            Outcome::Timeout => &self.timeouts,
            Outcome::Rejection => {
                self.rejects.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.fires.fetch_add(1, Ordering::Relaxed);
        self.latency_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn snapshot(&self, state: CircuitState, window_error_percentage: f64) -> CircuitBreakerMetrics {
        let fires = self.fires.load(Ordering::Relaxed);
        let latency_nanos = self.latency_nanos.load(Ordering::Relaxed);

        CircuitBreakerMetrics {
            state,
            fires,
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            rejects: self.rejects.load(Ordering::Relaxed),
            window_error_percentage,
            latency_mean: Duration::from_nanos(latency_nanos.checked_div(fires).unwrap_or(0)),
        }
    }
}

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - a single trial call is allowed through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Receives every state transition of the breakers it is subscribed to.
///
/// Called synchronously from the transitioning call; implementations must not block.
pub trait CircuitStateListener: Send + Sync {
    fn on_state_change(&self, service_name: &str, state: CircuitState);

    /// False once the listener has nowhere left to deliver; breakers and the registry then
    /// drop it
    fn is_active(&self) -> bool {
        true
    }
}

impl<F> CircuitStateListener for F
where
    F: Fn(&str, CircuitState) + Send + Sync,
{
    fn on_state_change(&self, service_name: &str, state: CircuitState) {
        self(service_name, state)
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or a trial is already running), the operation was not executed
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation exceeded the configured timeout and was recorded as a failure
    #[error("Operation for {component} timed out after {}ms", .timeout.as_millis())]
    Timeout { component: String, timeout: Duration },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

#[derive(Debug, Default)]
struct OpenMarker {
    opened_at: Option<Instant>,
    /// Bumped on every transition to open so stale reset timers can be ignored
    generation: u64,
}

/// Releases the half-open trial slot, including when the trial future is dropped.
struct TrialSlot<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Core circuit breaker implementation with atomic state management
pub struct CircuitBreaker {
    /// Service name for logging, metrics and notifications
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Configuration parameters
    config: CircuitBreakerConfig,

    counters: CallCounters,

    /// Recent outcomes used to decide when to open
    window: Mutex<RollingWindow>,

    open_marker: Mutex<OpenMarker>,

    trial_in_flight: AtomicBool,

    listeners: RwLock<Vec<Arc<dyn CircuitStateListener>>>,

    /// Handle given to reset timer tasks
    self_ref: Weak<CircuitBreaker>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given service name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Arc<Self> {
        let name = name.into();
        info!(
            component = %name,
            enabled = config.enabled,
            timeout_ms = config.timeout.as_millis(),
            error_threshold_percentage = config.error_threshold_percentage,
            reset_timeout_ms = config.reset_timeout.as_millis(),
            "Circuit breaker initialized"
        );

        Arc::new_cyclic(|self_ref| Self {
            window: Mutex::new(RollingWindow::new(
                config.rolling_window,
                config.rolling_buckets,
            )),
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            counters: CallCounters::default(),
            open_marker: Mutex::new(OpenMarker::default()),
            trial_in_flight: AtomicBool::new(false),
            listeners: RwLock::new(Vec::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Register a listener for state transitions. Registering the same listener twice is a no-op.
    pub fn subscribe(&self, listener: Arc<dyn CircuitStateListener>) {
        let mut listeners = self.listeners.write();
        listeners.retain(|existing| existing.is_active());
        let incoming = Arc::as_ptr(&listener) as *const ();
        if listeners
            .iter()
            .any(|existing| Arc::as_ptr(existing) as *const () == incoming)
        {
            return;
        }
        listeners.push(listener);
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return operation()
                .await
                .map_err(CircuitBreakerError::OperationFailed);
        }

        let trial = match self.admit() {
            Some(trial) => trial,
            None => {
                self.record_rejection();
                return Err(CircuitBreakerError::CircuitOpen {
                    component: self.name.clone(),
                });
            }
        };
        let is_trial = trial.is_some();

        let start_time = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, operation()).await;
        let duration = start_time.elapsed();

        let outcome = match result {
            Ok(Ok(value)) => {
                self.record_success(duration, is_trial);
                Ok(value)
            }
            Ok(Err(error)) => {
                self.record_failure(duration, Outcome::Failure, is_trial);
                Err(CircuitBreakerError::OperationFailed(error))
            }
            Err(_) => {
                self.record_failure(duration, Outcome::Timeout, is_trial);
                Err(CircuitBreakerError::Timeout {
                    component: self.name.clone(),
                    timeout: self.config.timeout,
                })
            }
        };

        drop(trial);
        outcome
    }

    /// Decide whether a call may run. `Some(None)` admits a regular call, `Some(Some(_))`
    /// admits the half-open trial, `None` rejects.
    fn admit(&self) -> Option<Option<TrialSlot<'_>>> {
        if self.state() == CircuitState::Open {
            self.try_half_open(None);
        }

        match self.state() {
            CircuitState::Closed => Some(None),
            CircuitState::Open => None,
            CircuitState::HalfOpen => self
                .trial_in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| {
                    Some(TrialSlot {
                        in_flight: &self.trial_in_flight,
                    })
                }),
        }
    }

    fn record_rejection(&self) {
        self.counters.record(Outcome::Rejection, Duration::ZERO);
        self.window.lock().record(Outcome::Rejection, Instant::now());

        debug!(component = %self.name, state = %self.state(), "Call rejected");
    }

    /// Record a successful operation
    fn record_success(&self, duration: Duration, is_trial: bool) {
        self.counters.record(Outcome::Success, duration);
        self.window.lock().record(Outcome::Success, Instant::now());

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            "Operation succeeded"
        );

        if is_trial {
            self.transition_to_closed(CircuitState::HalfOpen);
        }
    }

    /// Record a failed or timed out operation
    fn record_failure(&self, duration: Duration, outcome: Outcome, is_trial: bool) {
        self.counters.record(outcome, duration);
        let totals = {
            let mut window = self.window.lock();
            let now = Instant::now();
            window.record(outcome, now);
            window.totals(now)
        };

        error!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            timed_out = outcome == Outcome::Timeout,
            window_errors = totals.errors(),
            window_volume = totals.volume(),
            "Operation failed"
        );

        if is_trial {
            // Any failure of the trial call reopens the circuit
            self.transition_to_open(CircuitState::HalfOpen);
        } else if self.state() == CircuitState::Closed
            && totals.exceeds(
                self.config.error_threshold_percentage,
                self.config.volume_threshold,
            )
        {
            self.transition_to_open(CircuitState::Closed);
        }
    }

    /// Transition to open state (failing fast). Returns false if `from` no longer holds.
    fn transition_to_open(&self, from: CircuitState) -> bool {
        let generation = {
            let mut marker = self.open_marker.lock();
            if self
                .state
                .compare_exchange(
                    from as u8,
                    CircuitState::Open as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                return false;
            }
            marker.opened_at = Some(Instant::now());
            marker.generation += 1;
            marker.generation
        };

        error!(
            component = %self.name,
            from_state = %from,
            error_threshold_percentage = self.config.error_threshold_percentage,
            reset_timeout_ms = self.config.reset_timeout.as_millis(),
            "Circuit breaker opened (failing fast)"
        );

        self.notify(CircuitState::Open);
        self.schedule_half_open(generation);
        true
    }

    /// Transition to closed state (normal operation)
    fn transition_to_closed(&self, from: CircuitState) -> bool {
        {
            let mut marker = self.open_marker.lock();
            if self
                .state
                .compare_exchange(
                    from as u8,
                    CircuitState::Closed as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                return false;
            }
            marker.opened_at = None;
        }
        self.window.lock().reset();

        info!(
            component = %self.name,
            fires = self.counters.fires.load(Ordering::Relaxed),
            "Circuit breaker closed (recovered)"
        );

        self.notify(CircuitState::Closed);
        true
    }

    /// Move from open to half-open. With a generation, only the matching open period may
    /// be ended (reset timer); without one, the reset timeout must have elapsed.
    fn try_half_open(&self, generation: Option<u64>) -> bool {
        {
            let marker = self.open_marker.lock();
            let due = match generation {
                Some(generation) => marker.generation == generation,
                None => marker
                    .opened_at
                    .is_some_and(|opened_at| opened_at.elapsed() >= self.config.reset_timeout),
            };
            if !due {
                return false;
            }
            if self
                .state
                .compare_exchange(
                    CircuitState::Open as u8,
                    CircuitState::HalfOpen as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                return false;
            }
            self.trial_in_flight.store(false, Ordering::Release);
        }

        info!(component = %self.name, "Circuit breaker half-open (admitting trial call)");

        self.notify(CircuitState::HalfOpen);
        true
    }

    fn schedule_half_open(&self, generation: u64) {
        // Without a runtime the next call performs the transition lazily
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let breaker = self.self_ref.clone();
        let reset_timeout = self.config.reset_timeout;

        handle.spawn(async move {
            tokio::time::sleep(reset_timeout).await;
            if let Some(breaker) = breaker.upgrade() {
                breaker.try_half_open(Some(generation));
            }
        });
    }

    fn notify(&self, state: CircuitState) {
        let listeners = self.listeners.read().clone();
        let mut inactive = false;
        for listener in listeners {
            if listener.is_active() {
                listener.on_state_change(&self.name, state);
            } else {
                inactive = true;
            }
        }
        if inactive {
            self.listeners.write().retain(|listener| listener.is_active());
        }
    }

    /// Subscribed listeners that are still active
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|listener| listener.is_active())
            .count()
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        if !self.transition_to_open(CircuitState::Closed) {
            self.transition_to_open(CircuitState::HalfOpen);
        }
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        if !self.transition_to_closed(CircuitState::Open) {
            self.transition_to_closed(CircuitState::HalfOpen);
        }
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let window_error_percentage = self.window.lock().totals(Instant::now()).error_percentage();
        self.counters.snapshot(self.state(), window_error_percentage)
    }

    /// Get service name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Closed or half-open, with the window error percentage under the trip threshold
    pub fn is_healthy(&self) -> bool {
        let metrics = self.metrics();
        metrics.state != CircuitState::Open
            && metrics.window_error_percentage < f64::from(self.config.error_threshold_percentage)
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("config", &self.config)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
