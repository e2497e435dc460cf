//! End-to-end scenarios for the persistence side channel
//!
//! Drives the public library API: decorated commands over a store whose
//! expirations flow through the pipeline into listeners and solvers.

mod common;

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use durable_cache::cache::{ByteIdentity, CacheStore};
use durable_cache::commands::{CacheCommands, StoreCommands};
use durable_cache::config::{CacheConfiguration, TimeUnit};
use durable_cache::expiration::{ExpirationMessageListener, Message, ReplayRecovery};
use durable_cache::persistence::{
    FileSolver, OperationKind, PersistenceSolver, PersistentCommands, SolverKind, SolverRegistry,
};
use durable_cache::{run_recovery, spawn_persistence_worker, ExpirationPipeline};

use common::RecordingSolver;

// == Helpers ==

/// Collects the key and value of every message it receives.
#[derive(Default)]
struct Collector(Mutex<Vec<(String, serde_json::Value)>>);

impl ExpirationMessageListener for Collector {
    fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        let value = message.value().cloned().unwrap_or_default();
        self.0.lock().push((message.key().to_string(), value));
        Ok(())
    }
}

struct Harness {
    store: Arc<CacheStore>,
    commands: PersistentCommands<StoreCommands>,
    solver: Arc<RecordingSolver>,
    collector: Arc<Collector>,
}

/// Persistence on, with a 50 ms critical duration so short-lived test
/// entries still qualify.
fn harness() -> Harness {
    let config = Arc::new(
        CacheConfiguration::builder()
            .enable_persistence(true)
            .critical_duration(50)
            .critical_duration_unit(TimeUnit::Milliseconds)
            .build(),
    );
    let collector = Arc::new(Collector::default());
    config.add_expiration_listener(collector.clone());

    let solver = Arc::new(RecordingSolver::new());
    let registry = Arc::new(SolverRegistry::new().with(SolverKind::Memory, solver.clone()));

    let store = Arc::new(CacheStore::new(config.expiry_policy()));
    store.set_expiration_callback(Arc::new(ExpirationPipeline::new(
        config.clone(),
        registry.clone(),
    )));
    let commands = PersistentCommands::new(
        StoreCommands::new(store.clone(), config.clone()),
        config,
        registry,
    );

    Harness {
        store,
        commands,
        solver,
        collector,
    }
}

fn id(s: &str) -> ByteIdentity {
    ByteIdentity::from(s)
}

// == Expiry ==

#[test]
fn test_expired_entry_notifies_then_cleans_once() {
    let h = harness();
    h.commands
        .set_with_ttl("c", &json!({"n": 1}), Duration::from_millis(100))
        .unwrap();
    assert!(h.solver.get(&id("c")).is_some());

    sleep(Duration::from_millis(150));
    assert_eq!(h.store.cleanup_expired(), 1);
    assert_eq!(h.store.cleanup_expired(), 0);

    assert_eq!(
        *h.collector.0.lock(),
        vec![("c".to_string(), json!({"n": 1}))]
    );
    assert_eq!(h.solver.cleanups(), vec![id("c")]);
    assert!(h.solver.get(&id("c")).is_none());
}

#[test]
fn test_read_of_expired_entry_cleans_it() {
    let h = harness();
    h.commands
        .set_with_ttl("c", &json!(1), Duration::from_millis(60))
        .unwrap();

    sleep(Duration::from_millis(100));

    assert_eq!(h.commands.get("c").unwrap(), None);
    assert_eq!(h.collector.0.lock().len(), 1);
    assert_eq!(h.solver.cleanups().len(), 1);
}

#[test]
fn test_delete_racing_expiry_cleans_at_most_once() {
    for _ in 0..20 {
        let h = Arc::new(harness());
        h.commands
            .set_with_ttl("k", &json!(1), Duration::from_millis(60))
            .unwrap();
        sleep(Duration::from_millis(80));

        let deleter = {
            let h = h.clone();
            std::thread::spawn(move || h.commands.delete(&["k".to_string()]).unwrap())
        };
        let sweeper = {
            let h = h.clone();
            std::thread::spawn(move || h.store.cleanup_expired())
        };
        let deleted = deleter.join().unwrap();
        sweeper.join().unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(h.solver.cleanups(), vec![id("k")]);
        assert_eq!(h.solver.disposed_count(OperationKind::RemoveKeys), 0);
        assert_eq!(h.collector.0.lock().len(), 1);
    }
}

// == Gating ==

#[test]
fn test_default_duration_below_critical_is_not_persisted() {
    let config = Arc::new(CacheConfiguration::builder().enable_persistence(true).build());
    let solver = Arc::new(RecordingSolver::new());
    let registry = Arc::new(SolverRegistry::new().with(SolverKind::Memory, solver.clone()));
    let store = Arc::new(CacheStore::default());
    let commands =
        PersistentCommands::new(StoreCommands::new(store, config.clone()), config, registry);

    commands.set("a", &json!(1)).unwrap();
    commands
        .set_with_ttl("b", &json!(1), Duration::from_secs(120))
        .unwrap();

    let written: Vec<_> = solver
        .disposed()
        .into_iter()
        .filter(|record| record.kind == OperationKind::Write)
        .flat_map(|record| record.keys)
        .collect();
    assert_eq!(written, vec![id("b")]);
}

#[test]
fn test_flush_twice_records_one_remove_all() {
    let h = harness();
    h.commands.set("x", &json!(1)).unwrap();

    assert!(h.commands.delete_all().unwrap());
    assert!(!h.commands.delete_all().unwrap());

    assert_eq!(h.solver.disposed_count(OperationKind::RemoveAll), 1);
}

// == Restart ==

#[test]
fn test_file_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(
        CacheConfiguration::builder()
            .enable_persistence(true)
            .solver(SolverKind::File)
            .build(),
    );
    config.add_recovery_listener(Arc::new(ReplayRecovery));

    {
        let solver = Arc::new(FileSolver::open(dir.path()).unwrap());
        let registry = Arc::new(SolverRegistry::new().with(SolverKind::File, solver));
        let store = Arc::new(CacheStore::default());
        let commands =
            PersistentCommands::new(StoreCommands::new(store, config.clone()), config.clone(), registry);
        commands
            .set_with_ttl("session", &json!({"user": 7}), Duration::from_secs(600))
            .unwrap();
        commands.set("scratch", &json!(0)).unwrap();
    }

    let solver = Arc::new(FileSolver::open(dir.path()).unwrap());
    assert_eq!(solver.enumerate().unwrap().len(), 1);
    let registry = SolverRegistry::new().with(SolverKind::File, solver);
    let store = Arc::new(CacheStore::default());

    let report = run_recovery(&config, &registry, &store).unwrap();
    assert_eq!(report.restored, 1);

    let commands = StoreCommands::new(store, config.clone());
    assert_eq!(commands.get("session").unwrap(), Some(json!({"user": 7})));
    assert_eq!(commands.get("scratch").unwrap(), None);
    assert!(commands.ttl("session").unwrap().unwrap() > Duration::from_secs(500));
}

/// Process-local restart: a fresh `FileSolver` over `dir` replayed into a new store.
fn restart(dir: &std::path::Path, config: &Arc<CacheConfiguration>) -> StoreCommands {
    let solver = Arc::new(FileSolver::open(dir).unwrap());
    let registry = SolverRegistry::new().with(SolverKind::File, solver);
    let store = Arc::new(CacheStore::default());
    run_recovery(config, &registry, &store).unwrap();
    StoreCommands::new(store, config.clone())
}

fn file_commands(
    dir: &std::path::Path,
    config: &Arc<CacheConfiguration>,
) -> PersistentCommands<StoreCommands> {
    let solver = Arc::new(FileSolver::open(dir).unwrap());
    let registry = Arc::new(SolverRegistry::new().with(SolverKind::File, solver));
    let store = Arc::new(CacheStore::default());
    PersistentCommands::new(StoreCommands::new(store, config.clone()), config.clone(), registry)
}

fn file_config() -> Arc<CacheConfiguration> {
    let config = Arc::new(
        CacheConfiguration::builder()
            .enable_persistence(true)
            .solver(SolverKind::File)
            .build(),
    );
    config.add_recovery_listener(Arc::new(ReplayRecovery));
    config
}

#[test]
fn test_short_overwrite_is_not_resurrected_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config();
    {
        let commands = file_commands(dir.path(), &config);
        commands
            .set_with_ttl("k", &json!("v1"), Duration::from_secs(120))
            .unwrap();
        commands.set("k", &json!("v2")).unwrap();
    }

    let commands = restart(dir.path(), &config);
    assert_eq!(commands.get("k").unwrap(), None);
}

#[test]
fn test_extended_entry_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config();
    {
        let commands = file_commands(dir.path(), &config);
        commands.set("a", &json!(1)).unwrap();
        commands.set("b", &json!(2)).unwrap();
        assert!(commands.replace_duration("a", Duration::from_secs(3_600)).unwrap());
    }

    let commands = restart(dir.path(), &config);
    assert_eq!(commands.get("a").unwrap(), Some(json!(1)));
    assert!(commands.ttl("a").unwrap().unwrap() > Duration::from_secs(3_500));
    assert_eq!(commands.get("b").unwrap(), None);
}

// == Async Mode ==

#[tokio::test]
async fn test_async_mode_applies_records_in_background() {
    let config = Arc::new(
        CacheConfiguration::builder()
            .enable_persistence(true)
            .enable_persistence_async(true)
            .build(),
    );
    let solver = Arc::new(RecordingSolver::new());
    let registry = Arc::new(SolverRegistry::new().with(SolverKind::Memory, solver.clone()));
    let (queue, worker) = spawn_persistence_worker(registry.clone());

    let store = Arc::new(CacheStore::default());
    let commands = PersistentCommands::new(StoreCommands::new(store, config.clone()), config, registry)
        .with_queue(queue);

    commands
        .set_with_ttl("b", &json!(1), Duration::from_secs(120))
        .unwrap();
    commands.delete(&["b".to_string()]).unwrap();
    drop(commands);
    worker.await.unwrap();

    let kinds: Vec<_> = solver.disposed().into_iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![OperationKind::Write, OperationKind::RemoveKeys]);
    assert!(solver.is_empty());
}

#[tokio::test]
async fn test_file_solver_jobs_run_on_worker_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(
        CacheConfiguration::builder()
            .enable_persistence(true)
            .solver(SolverKind::File)
            .critical_duration(50)
            .critical_duration_unit(TimeUnit::Milliseconds)
            .build(),
    );
    assert!(config.persists_off_thread());

    let solver = Arc::new(FileSolver::open(dir.path()).unwrap());
    let registry = Arc::new(SolverRegistry::new().with(SolverKind::File, solver.clone()));
    let (queue, worker) = spawn_persistence_worker(registry.clone());

    let store = Arc::new(CacheStore::default());
    store.set_expiration_callback(Arc::new(
        ExpirationPipeline::new(config.clone(), registry.clone()).with_queue(queue.clone()),
    ));
    let commands = PersistentCommands::new(StoreCommands::new(store.clone(), config.clone()), config, registry)
        .with_queue(queue);

    commands
        .set_with_ttl("gone", &json!(1), Duration::from_millis(60))
        .unwrap();
    commands
        .set_with_ttl("kept", &json!(2), Duration::from_secs(600))
        .unwrap();
    sleep(Duration::from_millis(100));
    assert_eq!(store.cleanup_expired(), 1);

    drop(commands);
    drop(store);
    worker.await.unwrap();

    let keys: Vec<_> = solver.enumerate().unwrap().into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![id("kept")]);
}
