//! Expiration Pipeline
//!
//! Installed as the store's expiration callback. For each expired entry it
//! decodes a [`Message`], notifies listeners, and erases the entry's durable
//! record. Each entry moves LIVE -> EXPIRING -> CLEANED once.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cache::{ByteIdentity, ExpirationCallback};
use crate::commands::{Codec, JsonCodec};
use crate::config::CacheConfiguration;
use crate::expiration::Message;
use crate::persistence::{dispatch_cleanup, SolverRegistry};
use crate::tasks::PersistenceQueue;

// == Entry State ==
/// Where an expired entry is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Live,
    Expiring,
    Cleaned,
}

// == Expiration Report ==
/// What happened to one expired entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationReport {
    pub state: EntryState,
    /// Whether the entry decoded into a message
    pub decoded: bool,
    /// Listeners that returned Ok
    pub notified: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
    /// Whether the durable store had a record to erase. Always false when
    /// the cleanup was queued.
    pub erased: bool,
    /// Whether the cleanup was handed to the persistence worker
    pub queued: bool,
}

impl ExpirationReport {
    fn new() -> Self {
        Self {
            state: EntryState::Live,
            decoded: false,
            notified: 0,
            failed: 0,
            erased: false,
            queued: false,
        }
    }
}

// == Expiration Pipeline ==
pub struct ExpirationPipeline {
    config: Arc<CacheConfiguration>,
    registry: Arc<SolverRegistry>,
    codec: Arc<dyn Codec>,
    queue: Option<PersistenceQueue>,
}

impl ExpirationPipeline {
    /// Pipeline decoding with [`JsonCodec`] and cleaning up inline.
    pub fn new(config: Arc<CacheConfiguration>, registry: Arc<SolverRegistry>) -> Self {
        Self::with_codec(config, registry, Arc::new(JsonCodec))
    }

    pub fn with_codec(
        config: Arc<CacheConfiguration>,
        registry: Arc<SolverRegistry>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            config,
            registry,
            codec,
            queue: None,
        }
    }

    /// Queues durable cleanups behind the records already submitted to the
    /// persistence worker, so an erase never overtakes an earlier write.
    pub fn with_queue(mut self, queue: PersistenceQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Processes one expired entry.
    ///
    /// An entry that fails to decode skips notification but is still erased
    /// from the durable store.
    pub fn handle(&self, key: ByteIdentity, value: ByteIdentity) -> ExpirationReport {
        let mut report = ExpirationReport::new();
        report.state = EntryState::Expiring;

        match Message::from_bytes(key.clone(), value, self.codec.as_ref()) {
            Ok(message) => {
                report.decoded = true;
                self.notify(&message, &mut report);
            }
            Err(err) => {
                error!("Expired entry {:?} cannot be decoded, listeners skipped: {}", key, err);
            }
        }

        self.erase(key, &mut report);
        report.state = EntryState::Cleaned;
        report
    }

    fn notify(&self, message: &Message, report: &mut ExpirationReport) {
        for listener in self.config.expiration_listeners() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_message(message))) {
                Ok(Ok(())) => report.notified += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        "Expiration listener {} failed for '{}': {:#}",
                        listener.identity(),
                        message.key(),
                        err
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(
                        "Expiration listener {} panicked for '{}'",
                        listener.identity(),
                        message.key()
                    );
                }
            }
        }
    }

    fn erase(&self, key: ByteIdentity, report: &mut ExpirationReport) {
        if !self.config.is_enable_persistence() {
            return;
        }
        let solver = self.config.solver();
        if let Some(queue) = &self.queue {
            match queue.submit_cleanup(solver, key.clone()) {
                Ok(()) => {
                    report.queued = true;
                    return;
                }
                Err(err) => debug!("{}, cleaning up inline", err),
            }
        }
        report.erased = dispatch_cleanup(&self.registry, solver, &key);
    }
}

impl ExpirationCallback for ExpirationPipeline {
    fn on_expired(&self, key: ByteIdentity, value: ByteIdentity) {
        let report = self.handle(key, value);
        debug!(
            "Expiration handled: notified={}, failed={}, erased={}, queued={}",
            report.notified, report.failed, report.erased, report.queued
        );
    }
}
