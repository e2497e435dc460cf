//! Expiration Listeners
//!
//! Callback contract for consumers that react to expirations.

use tracing::info;

use crate::expiration::Message;

// == Expiration Message Listener ==
pub trait ExpirationMessageListener: Send + Sync {
    /// Value identity used to de-duplicate registrations. Two listeners with
    /// the same identity are considered equal. Defaults to the type name.
    fn identity(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Called once per expired entry, in registration order.
    fn on_message(&self, message: &Message) -> anyhow::Result<()>;
}

// == Logging Listener ==
/// Logs every expiration at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExpirationListener;

impl ExpirationMessageListener for LoggingExpirationListener {
    fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        info!(
            key = message.key(),
            bytes = message.byte_value().len(),
            "Cache entry expired"
        );
        Ok(())
    }
}
