//! Expiration Module
//!
//! Reacts to entries leaving the store on their own: decodes them, notifies
//! listeners, erases their durable records. Also owns startup recovery.

mod listener;
mod message;
mod pipeline;
mod recovery;

pub use listener::{ExpirationMessageListener, LoggingExpirationListener};
pub use message::Message;
pub use pipeline::{EntryState, ExpirationPipeline, ExpirationReport};
pub use recovery::{run_recovery, ListeningRecovery, RecoveryReport, ReplayRecovery};
