//! Persistence Module
//!
//! Decides which command calls leave a durable trace and applies them
//! through a pluggable [`PersistenceSolver`].

mod file;
mod interceptor;
mod memory;
mod operation;
#[cfg(test)]
pub(crate) mod recording;
mod solver;

pub use file::{FileSolver, SNAPSHOT_FILE};
pub use interceptor::{dispatch, dispatch_cleanup, MethodMeta, MethodTable, PersistentCommands};
pub use memory::MemorySolver;
pub use operation::{Invocation, Observe, OperationKind, OperationRecord, Outcome, ValueExpectation};
pub use solver::{DurableTable, PersistedEntry, PersistenceSolver, SolverKind, SolverRegistry};
