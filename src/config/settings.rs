//! Cache Configuration Context
//!
//! Explicitly constructed, shared configuration for the interceptor and the
//! expiration pipeline. Scalars are fixed when the builder is sealed; only the
//! listener registries change afterwards.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::ExpiryPolicy;
use crate::config::source::{parsed, MapSource, PropertySource};
use crate::config::TimeUnit;
use crate::expiration::{ExpirationMessageListener, ListeningRecovery};
use crate::persistence::SolverKind;

// == Defaults ==
pub const DEFAULT_CACHE_DURATION: u64 = 10;
pub const DEFAULT_CACHE_DURATION_UNIT: TimeUnit = TimeUnit::Seconds;
pub const DEFAULT_CRITICAL_DURATION: u64 = 60;
pub const DEFAULT_CRITICAL_DURATION_UNIT: TimeUnit = TimeUnit::Seconds;

// == Property Names ==
pub const PROP_DEFAULT_DURATION: &str = "DEFAULT_DURATION";
pub const PROP_DEFAULT_DURATION_UNIT: &str = "DEFAULT_DURATION_UNIT";
pub const PROP_ENABLE_PERSISTENCE: &str = "ENABLE_PERSISTENCE";
pub const PROP_ENABLE_PERSISTENCE_ASYNC: &str = "ENABLE_PERSISTENCE_ASYNC";
pub const PROP_CRITICAL_DURATION: &str = "CRITICAL_DURATION";
pub const PROP_CRITICAL_DURATION_UNIT: &str = "CRITICAL_DURATION_UNIT";
pub const PROP_EXPIRY_POLICY: &str = "EXPIRY_POLICY";
pub const PROP_SOLVER: &str = "SOLVER";

// == Builder ==
/// Collects explicitly set values before the configuration is sealed.
#[derive(Debug, Clone, Default)]
pub struct CacheConfigurationBuilder {
    default_cache_duration: Option<u64>,
    default_cache_duration_unit: Option<TimeUnit>,
    enable_persistence: Option<bool>,
    enable_persistence_async: Option<bool>,
    critical_duration: Option<u64>,
    critical_duration_unit: Option<TimeUnit>,
    expiry_policy: Option<ExpiryPolicy>,
    solver: Option<SolverKind>,
}

impl CacheConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_cache_duration(mut self, amount: u64) -> Self {
        self.default_cache_duration = Some(amount);
        self
    }

    pub fn default_cache_duration_unit(mut self, unit: TimeUnit) -> Self {
        self.default_cache_duration_unit = Some(unit);
        self
    }

    pub fn enable_persistence(mut self, enabled: bool) -> Self {
        self.enable_persistence = Some(enabled);
        self
    }

    pub fn enable_persistence_async(mut self, enabled: bool) -> Self {
        self.enable_persistence_async = Some(enabled);
        self
    }

    pub fn critical_duration(mut self, amount: u64) -> Self {
        self.critical_duration = Some(amount);
        self
    }

    pub fn critical_duration_unit(mut self, unit: TimeUnit) -> Self {
        self.critical_duration_unit = Some(unit);
        self
    }

    pub fn expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = Some(policy);
        self
    }

    pub fn solver(mut self, solver: SolverKind) -> Self {
        self.solver = Some(solver);
        self
    }

    // == Seal ==
    /// Resolves every field (explicit value, then `source`, then the hard
    /// default) and computes the derived thresholds once.
    pub fn seal(self, source: &dyn PropertySource) -> CacheConfiguration {
        let default_cache_duration = self
            .default_cache_duration
            .or_else(|| parsed(source, PROP_DEFAULT_DURATION))
            .unwrap_or(DEFAULT_CACHE_DURATION);
        let default_cache_duration_unit = self
            .default_cache_duration_unit
            .or_else(|| parsed(source, PROP_DEFAULT_DURATION_UNIT))
            .unwrap_or(DEFAULT_CACHE_DURATION_UNIT);
        let enable_persistence = self
            .enable_persistence
            .or_else(|| parsed(source, PROP_ENABLE_PERSISTENCE))
            .unwrap_or(false);
        let enable_persistence_async = self
            .enable_persistence_async
            .or_else(|| parsed(source, PROP_ENABLE_PERSISTENCE_ASYNC))
            .unwrap_or(false);
        let critical_duration = self
            .critical_duration
            .or_else(|| parsed(source, PROP_CRITICAL_DURATION))
            .unwrap_or(DEFAULT_CRITICAL_DURATION);
        let critical_duration_unit = self
            .critical_duration_unit
            .or_else(|| parsed(source, PROP_CRITICAL_DURATION_UNIT))
            .unwrap_or(DEFAULT_CRITICAL_DURATION_UNIT);
        let expiry_policy = self
            .expiry_policy
            .or_else(|| parsed(source, PROP_EXPIRY_POLICY))
            .unwrap_or_default();
        let solver = self
            .solver
            .or_else(|| parsed(source, PROP_SOLVER))
            .unwrap_or_default();

        let default_duration_millis = default_cache_duration_unit.to_millis(default_cache_duration);
        let critical_duration_millis = critical_duration_unit.to_millis(critical_duration);
        let default_compare_with_cache_persistence =
            default_duration_millis >= critical_duration_millis;

        debug!(
            "Configuration sealed: default={}ms, critical={}ms, default persisted={}",
            default_duration_millis, critical_duration_millis, default_compare_with_cache_persistence
        );

        CacheConfiguration {
            default_cache_duration,
            default_cache_duration_unit,
            enable_persistence,
            enable_persistence_async,
            critical_duration,
            critical_duration_unit,
            expiry_policy,
            solver,
            default_duration: default_cache_duration_unit.to_duration(default_cache_duration),
            critical_duration_millis,
            default_compare_with_cache_persistence,
            listeners: Mutex::new(ListenerRegistry::default()),
        }
    }

    /// Seals with no external properties.
    pub fn build(self) -> CacheConfiguration {
        self.seal(&MapSource::new())
    }
}

// == Listener Registry ==
/// Both listener lists, guarded together by one monitor.
#[derive(Default)]
struct ListenerRegistry {
    expiration: Vec<Arc<dyn ExpirationMessageListener>>,
    recovery: Vec<Arc<dyn ListeningRecovery>>,
}

// == Cache Configuration ==
/// Sealed, shareable configuration.
pub struct CacheConfiguration {
    default_cache_duration: u64,
    default_cache_duration_unit: TimeUnit,
    enable_persistence: bool,
    enable_persistence_async: bool,
    critical_duration: u64,
    critical_duration_unit: TimeUnit,
    expiry_policy: ExpiryPolicy,
    solver: SolverKind,
    default_duration: Duration,
    critical_duration_millis: u64,
    default_compare_with_cache_persistence: bool,
    listeners: Mutex<ListenerRegistry>,
}

impl CacheConfiguration {
    pub fn builder() -> CacheConfigurationBuilder {
        CacheConfigurationBuilder::new()
    }

    // == Accessors ==
    /// Default TTL amount, in [`default_cache_duration_unit`](Self::default_cache_duration_unit).
    pub fn default_cache_duration(&self) -> u64 {
        self.default_cache_duration
    }

    pub fn default_cache_duration_unit(&self) -> TimeUnit {
        self.default_cache_duration_unit
    }

    /// TTL applied to writes that do not carry their own.
    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Master switch for the persistence side channel.
    pub fn is_enable_persistence(&self) -> bool {
        self.enable_persistence
    }

    /// Whether records are applied by the background worker.
    pub fn is_enable_persistence_async(&self) -> bool {
        self.enable_persistence_async
    }

    /// Whether persistence jobs must leave request threads: async mode is on,
    /// or the configured solver blocks on file I/O.
    pub fn persists_off_thread(&self) -> bool {
        self.enable_persistence_async || self.solver.blocks_on_io()
    }

    /// Critical duration amount, in its own unit.
    pub fn non_cache_persistent_critical_duration(&self) -> u64 {
        self.critical_duration
    }

    pub fn non_cache_persistent_critical_duration_unit(&self) -> TimeUnit {
        self.critical_duration_unit
    }

    /// Critical duration normalized to milliseconds at seal time.
    pub fn critical_duration_millis(&self) -> u64 {
        self.critical_duration_millis
    }

    /// Clock that entry TTLs run against.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry_policy
    }

    /// Solver the standard method table routes records to.
    pub fn solver(&self) -> SolverKind {
        self.solver
    }

    /// True iff entries written with the default TTL live at least as long as
    /// the critical duration, both compared in milliseconds.
    pub fn is_default_compare_with_cache_persistence(&self) -> bool {
        self.default_compare_with_cache_persistence
    }

    /// Whether an entry living for the given TTL deserves a durable record.
    ///
    /// Writes without an explicit TTL follow the default comparison; explicit
    /// TTLs, including ones set by a duration change, are compared against the
    /// critical duration directly.
    pub fn is_persistence_worthy(&self, explicit_ttl: Option<Duration>) -> bool {
        match explicit_ttl {
            None => self.default_compare_with_cache_persistence,
            Some(ttl) => ttl.as_millis() >= u128::from(self.critical_duration_millis),
        }
    }

    // == Listener Registries ==
    /// Registers an expiration listener. An equal listener already present is
    /// removed first, so the new one ends up last and is notified once.
    pub fn add_expiration_listener(&self, listener: Arc<dyn ExpirationMessageListener>) {
        let mut registry = self.listeners.lock();
        let identity = listener.identity();
        registry.expiration.retain(|existing| existing.identity() != identity);
        registry.expiration.push(listener);
    }

    /// Registers a recovery hook with the same replace-then-append rule.
    pub fn add_recovery_listener(&self, listener: Arc<dyn ListeningRecovery>) {
        let mut registry = self.listeners.lock();
        let identity = listener.identity();
        registry.recovery.retain(|existing| existing.identity() != identity);
        registry.recovery.push(listener);
    }

    /// Snapshot of the expiration listeners in registration order.
    pub fn expiration_listeners(&self) -> Vec<Arc<dyn ExpirationMessageListener>> {
        self.listeners.lock().expiration.clone()
    }

    /// Snapshot of the recovery hooks in registration order.
    pub fn recovery_listeners(&self) -> Vec<Arc<dyn ListeningRecovery>> {
        self.listeners.lock().recovery.clone()
    }
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        CacheConfigurationBuilder::new().build()
    }
}

impl std::fmt::Debug for CacheConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("CacheConfiguration")
            .field("default_cache_duration", &self.default_cache_duration)
            .field("default_cache_duration_unit", &self.default_cache_duration_unit)
            .field("enable_persistence", &self.enable_persistence)
            .field("enable_persistence_async", &self.enable_persistence_async)
            .field("critical_duration", &self.critical_duration)
            .field("critical_duration_unit", &self.critical_duration_unit)
            .field("expiry_policy", &self.expiry_policy)
            .field("solver", &self.solver)
            .field("expiration_listeners", &listeners.expiration.len())
            .field("recovery_listeners", &listeners.recovery.len())
            .finish()
    }
}
