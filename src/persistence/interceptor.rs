//! Interceptor Module
//!
//! [`PersistentCommands`] wraps any [`CacheCommands`] implementation. After
//! each call it looks the method up in a [`MethodTable`], gates on the real
//! return value and, if the gate passes, hands an [`OperationRecord`] to the
//! resolved solver. Callers only ever see the wrapped command's result.
//!
//! The durable record of a key always follows the key's current TTL: a
//! write or duration change that leaves the key below the persistence
//! threshold erases its record, and one that lifts it above records it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::cache::ByteIdentity;
use crate::commands::{CacheCommands, Codec, EntryView, JsonCodec, Method};
use crate::config::CacheConfiguration;
use crate::error::Result;
use crate::persistence::{
    Invocation, Observe, OperationKind, OperationRecord, SolverKind, SolverRegistry,
    ValueExpectation,
};
use crate::tasks::PersistenceQueue;

// == Method Metadata ==
/// Persistence metadata attached to one command method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodMeta {
    pub kind: OperationKind,
    pub expectation: ValueExpectation,
    pub solver: SolverKind,
}

impl MethodMeta {
    /// Metadata using the kind's own expectation.
    pub fn new(kind: OperationKind, solver: SolverKind) -> Self {
        Self {
            kind,
            expectation: kind.expectation(),
            solver,
        }
    }
}

// == Method Table ==
/// Side table from method identity to persistence metadata. Methods that are
/// not registered are never persisted.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: HashMap<Method, MethodMeta>,
}

impl MethodTable {
    /// An empty table: nothing is persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for every mutating command, all routed to `solver`.
    pub fn standard(solver: SolverKind) -> Self {
        let mut table = Self::new();
        for (method, kind) in [
            (Method::Set, OperationKind::Write),
            (Method::SetWithTtl, OperationKind::Write),
            (Method::SetIfAbsent, OperationKind::Write),
            (Method::Delete, OperationKind::RemoveKeys),
            (Method::DeleteSimilar, OperationKind::RemoveBySimilarity),
            (Method::DeleteAll, OperationKind::RemoveAll),
            (Method::ReplaceDuration, OperationKind::ReplaceDuration),
            (Method::ResetDuration, OperationKind::ResetDuration),
            (Method::Replace, OperationKind::ReplaceValue),
        ] {
            table.register(method, MethodMeta::new(kind, solver));
        }
        table
    }

    /// Attaches `meta` to `method`, replacing earlier metadata.
    pub fn register(&mut self, method: Method, meta: MethodMeta) {
        self.entries.insert(method, meta);
    }

    /// Metadata for `method`, or `None` when calls to it are never persisted.
    pub fn get(&self, method: Method) -> Option<&MethodMeta> {
        self.entries.get(&method)
    }
}

// == Dispatch ==
/// Applies `record` with the solver registered for `kind`, logging and
/// swallowing every failure. Returns whether the solver accepted the record.
pub fn dispatch(registry: &SolverRegistry, kind: SolverKind, record: &OperationRecord) -> bool {
    let solver = match registry.resolve(kind) {
        Ok(solver) => solver,
        Err(err) => {
            warn!("Skipping {:?} persistence: {}", record.kind, err);
            return false;
        }
    };
    match solver.dispose(record) {
        Ok(()) => {
            trace!("Persisted {:?} for {} key(s)", record.kind, record.keys.len());
            true
        }
        Err(err) => {
            error!("Persistence of {:?} failed: {}", record.kind, err);
            false
        }
    }
}

/// Erases the durable record of `key` with the solver registered for `kind`.
/// Failures are logged. Returns whether a record was erased.
pub fn dispatch_cleanup(registry: &SolverRegistry, kind: SolverKind, key: &ByteIdentity) -> bool {
    let solver = match registry.resolve(kind) {
        Ok(solver) => solver,
        Err(err) => {
            warn!("Durable cleanup skipped: {}", err);
            return false;
        }
    };
    match solver.cleanup(key) {
        Ok(erased) => erased,
        Err(err) => {
            error!("Durable cleanup of {:?} failed: {}", key, err);
            false
        }
    }
}

// == Persistent Commands ==
/// Decorator that adds the persistence side channel to a command surface.
pub struct PersistentCommands<C> {
    inner: C,
    config: Arc<CacheConfiguration>,
    registry: Arc<SolverRegistry>,
    table: MethodTable,
    codec: Arc<dyn Codec>,
    queue: Option<PersistenceQueue>,
}

impl<C: CacheCommands> PersistentCommands<C> {
    /// Wraps `inner` with the standard method table targeting the configured solver.
    pub fn new(inner: C, config: Arc<CacheConfiguration>, registry: Arc<SolverRegistry>) -> Self {
        let table = MethodTable::standard(config.solver());
        Self {
            inner,
            config,
            registry,
            table,
            codec: Arc::new(JsonCodec),
            queue: None,
        }
    }

    pub fn with_table(mut self, table: MethodTable) -> Self {
        self.table = table;
        self
    }

    /// Codec used to encode record keys and values. Must match the wrapped surface's.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Hands every record to the background worker instead of applying it
    /// on the calling thread.
    pub fn with_queue(mut self, queue: PersistenceQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    // == Intercept ==
    /// Runs `call` against the wrapped surface, then applies the persistence
    /// side effect for `invocation`. Errors from `call` propagate unchanged
    /// and skip persistence; persistence never fails the call.
    pub fn intercept<R, F>(&self, invocation: Invocation<'_>, call: F) -> Result<R>
    where
        R: Observe,
        F: FnOnce(&C) -> Result<R>,
    {
        let result = call(&self.inner)?;
        self.after_call(&invocation, &result);
        Ok(result)
    }

    fn after_call<R: Observe>(&self, invocation: &Invocation<'_>, result: &R) {
        if !self.config.is_enable_persistence() {
            return;
        }
        let Some(meta) = self.table.get(invocation.method) else {
            return;
        };

        let outcome = result.observe();
        if !meta.expectation.expects(&outcome) {
            trace!("{} had no effect, nothing to persist", invocation.method);
            return;
        }

        let record = match meta.kind {
            OperationKind::Write if !self.config.is_persistence_worthy(invocation.ttl) => {
                trace!(
                    "{} is below the persistence threshold, erasing any durable record",
                    invocation.method
                );
                Some(self.erase_record(invocation))
            }
            OperationKind::ReplaceDuration | OperationKind::ResetDuration => {
                self.duration_record(meta.kind, invocation)
            }
            kind => match OperationRecord::build(
                kind,
                invocation,
                &outcome,
                self.codec.as_ref(),
                self.config.default_duration(),
            ) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("Cannot build {:?} record for {}: {}", kind, invocation.method, err);
                    None
                }
            },
        };

        if let Some(record) = record {
            self.submit(meta.solver, record);
        }
    }

    fn erase_record(&self, invocation: &Invocation<'_>) -> OperationRecord {
        OperationRecord::erase(
            invocation
                .keys
                .iter()
                .map(|key| self.codec.encode_key(key))
                .collect(),
        )
    }

    /// Record for a TTL change, judged on the TTL now in force. A key that
    /// qualifies is recorded with its current value; one that does not is
    /// erased.
    fn duration_record(
        &self,
        kind: OperationKind,
        invocation: &Invocation<'_>,
    ) -> Option<OperationRecord> {
        let key = *invocation.keys.first()?;
        let view = match self.inner.peek(key) {
            Ok(Some(view)) => view,
            Ok(None) => {
                trace!("'{}' left the cache before its new TTL was persisted", key);
                return None;
            }
            Err(err) => {
                warn!("Cannot read '{}' back after {}: {}", key, invocation.method, err);
                return None;
            }
        };

        if !self.config.is_persistence_worthy(Some(view.ttl)) {
            trace!("'{}' now lives below the persistence threshold", key);
            return Some(self.erase_record(invocation));
        }

        match self.codec.encode_value(&view.value) {
            Ok(value) => Some(OperationRecord {
                kind,
                keys: vec![self.codec.encode_key(key)],
                value: Some(value),
                ttl: Some(view.ttl),
            }),
            Err(err) => {
                warn!("Cannot build {:?} record for '{}': {}", kind, key, err);
                None
            }
        }
    }

    fn submit(&self, solver: SolverKind, record: OperationRecord) {
        match &self.queue {
            Some(queue) => {
                if let Err(err) = queue.submit(solver, record.clone()) {
                    debug!("{}, persisting inline", err);
                    dispatch(&self.registry, solver, &record);
                }
            }
            None => {
                dispatch(&self.registry, solver, &record);
            }
        }
    }
}

impl<C: CacheCommands> CacheCommands for PersistentCommands<C> {
    fn set(&self, key: &str, value: &Value) -> Result<bool> {
        let invocation = Invocation::new(Method::Set).key(key).value(value);
        self.intercept(invocation, |inner| inner.set(key, value))
    }

    fn set_with_ttl(&self, key: &str, value: &Value, ttl: Duration) -> Result<bool> {
        let invocation = Invocation::new(Method::SetWithTtl)
            .key(key)
            .value(value)
            .ttl(Some(ttl));
        self.intercept(invocation, |inner| inner.set_with_ttl(key, value, ttl))
    }

    fn set_if_absent(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<bool> {
        let invocation = Invocation::new(Method::SetIfAbsent)
            .key(key)
            .value(value)
            .ttl(ttl);
        self.intercept(invocation, |inner| inner.set_if_absent(key, value, ttl))
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.intercept(Invocation::new(Method::Get).key(key), |inner| inner.get(key))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.intercept(Invocation::new(Method::Contains).key(key), |inner| {
            inner.contains(key)
        })
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.intercept(Invocation::new(Method::Ttl).key(key), |inner| inner.ttl(key))
    }

    fn delete(&self, keys: &[String]) -> Result<usize> {
        self.intercept(Invocation::new(Method::Delete).keys(keys), |inner| {
            inner.delete(keys)
        })
    }

    fn delete_similar(&self, prefix: &str) -> Result<HashMap<String, Value>> {
        self.intercept(Invocation::new(Method::DeleteSimilar).key(prefix), |inner| {
            inner.delete_similar(prefix)
        })
    }

    fn delete_all(&self) -> Result<bool> {
        self.intercept(Invocation::new(Method::DeleteAll), |inner| inner.delete_all())
    }

    fn replace_duration(&self, key: &str, ttl: Duration) -> Result<bool> {
        let invocation = Invocation::new(Method::ReplaceDuration)
            .key(key)
            .ttl(Some(ttl));
        self.intercept(invocation, |inner| inner.replace_duration(key, ttl))
    }

    fn reset_duration(&self, key: &str) -> Result<bool> {
        self.intercept(Invocation::new(Method::ResetDuration).key(key), |inner| {
            inner.reset_duration(key)
        })
    }

    fn replace(&self, key: &str, value: &Value) -> Result<Option<Value>> {
        let invocation = Invocation::new(Method::Replace).key(key).value(value);
        self.intercept(invocation, |inner| inner.replace(key, value))
    }

    fn peek(&self, key: &str) -> Result<Option<EntryView>> {
        self.inner.peek(key)
    }
}
