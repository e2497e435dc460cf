//! Listener Catalog
//!
//! Maps the listener names that appear in configuration to constructors.
//! Binding fails fast on an unknown name instead of silently dropping it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::CacheConfiguration;
use crate::error::{CacheError, Result};
use crate::expiration::{
    ExpirationMessageListener, ListeningRecovery, LoggingExpirationListener, ReplayRecovery,
};

type ExpirationFactory = Box<dyn Fn() -> Arc<dyn ExpirationMessageListener> + Send + Sync>;
type RecoveryFactory = Box<dyn Fn() -> Arc<dyn ListeningRecovery> + Send + Sync>;

// == Listener Catalog ==
#[derive(Default)]
pub struct ListenerCatalog {
    expiration: HashMap<String, ExpirationFactory>,
    recovery: HashMap<String, RecoveryFactory>,
}

impl ListenerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the listeners shipped by this crate: `logging` and `replay`.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register_expiration("logging", || Arc::new(LoggingExpirationListener));
        catalog.register_recovery("replay", || Arc::new(ReplayRecovery));
        catalog
    }

    pub fn register_expiration<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ExpirationMessageListener> + Send + Sync + 'static,
    {
        self.expiration.insert(name.into(), Box::new(factory));
    }

    pub fn register_recovery<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ListeningRecovery> + Send + Sync + 'static,
    {
        self.recovery.insert(name.into(), Box::new(factory));
    }

    // == Bind ==
    /// Instantiates every named listener and registers it on `config`.
    ///
    /// All names are resolved before anything is registered, so a failure
    /// leaves `config` untouched.
    pub fn bind(
        &self,
        config: &CacheConfiguration,
        expiration_names: &[String],
        recovery_names: &[String],
    ) -> Result<()> {
        let expiration = expiration_names
            .iter()
            .map(|name| {
                self.expiration
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| CacheError::Binding {
                        kind: "expiration listener",
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let recovery = recovery_names
            .iter()
            .map(|name| {
                self.recovery
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| CacheError::Binding {
                        kind: "recovery listener",
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Bound {} expiration listener(s) and {} recovery listener(s)",
            expiration.len(),
            recovery.len()
        );
        for listener in expiration {
            config.add_expiration_listener(listener);
        }
        for listener in recovery {
            config.add_recovery_listener(listener);
        }
        Ok(())
    }
}
