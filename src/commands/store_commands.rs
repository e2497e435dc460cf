//! Store Commands
//!
//! Plain command implementation over the expiring map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::cache::{ByteIdentity, CacheStore};
use crate::commands::{CacheCommands, Codec, EntryView, JsonCodec};
use crate::config::CacheConfiguration;
use crate::error::Result;

// == Store Commands ==
#[derive(Clone)]
pub struct StoreCommands {
    store: Arc<CacheStore>,
    config: Arc<CacheConfiguration>,
    codec: Arc<dyn Codec>,
}

impl StoreCommands {
    pub fn new(store: Arc<CacheStore>, config: Arc<CacheConfiguration>) -> Self {
        Self::with_codec(store, config, Arc::new(JsonCodec))
    }

    pub fn with_codec(
        store: Arc<CacheStore>,
        config: Arc<CacheConfiguration>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            store,
            config,
            codec,
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    fn decode(&self, bytes: Option<ByteIdentity>) -> Result<Option<Value>> {
        match bytes {
            Some(bytes) => Ok(self.codec.decode_value(&bytes)?),
            None => Ok(None),
        }
    }
}

impl CacheCommands for StoreCommands {
    fn set(&self, key: &str, value: &Value) -> Result<bool> {
        self.set_with_ttl(key, value, self.config.default_duration())
    }

    fn set_with_ttl(&self, key: &str, value: &Value, ttl: Duration) -> Result<bool> {
        let value = self.codec.encode_value(value)?;
        self.store.put(self.codec.encode_key(key), value, ttl)?;
        Ok(true)
    }

    fn set_if_absent(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<bool> {
        let value = self.codec.encode_value(value)?;
        let ttl = ttl.unwrap_or_else(|| self.config.default_duration());
        self.store.put_if_absent(self.codec.encode_key(key), value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let bytes = self.store.get(&self.codec.encode_key(key));
        self.decode(bytes)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(&self.codec.encode_key(key)))
    }

    fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.store.ttl(&self.codec.encode_key(key)))
    }

    fn delete(&self, keys: &[String]) -> Result<usize> {
        Ok(keys
            .iter()
            .filter(|key| self.store.remove(&self.codec.encode_key(key)).is_some())
            .count())
    }

    fn delete_similar(&self, prefix: &str) -> Result<HashMap<String, Value>> {
        let prefix = self.codec.encode_key(prefix);
        let removed = self
            .store
            .remove_where(|key| key.starts_with(prefix.as_bytes()));

        let mut out = HashMap::with_capacity(removed.len());
        for (key, value) in removed {
            let key = self
                .codec
                .decode_key(&key)
                .unwrap_or_else(|_| String::from_utf8_lossy(key.as_bytes()).into_owned());
            // Entries are already gone; a bad value must not hide the removal.
            let value = match self.codec.decode_value(&value) {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(err) => {
                    warn!("Removed key '{}' held an undecodable value: {}", key, err);
                    Value::Null
                }
            };
            out.insert(key, value);
        }
        Ok(out)
    }

    fn delete_all(&self) -> Result<bool> {
        Ok(self.store.clear() > 0)
    }

    fn replace_duration(&self, key: &str, ttl: Duration) -> Result<bool> {
        Ok(self.store.replace_ttl(&self.codec.encode_key(key), ttl))
    }

    fn reset_duration(&self, key: &str) -> Result<bool> {
        Ok(self.store.reset_ttl(&self.codec.encode_key(key)))
    }

    fn replace(&self, key: &str, value: &Value) -> Result<Option<Value>> {
        let value = self.codec.encode_value(value)?;
        let previous = self.store.replace(&self.codec.encode_key(key), value)?;
        self.decode(previous)
    }

    fn peek(&self, key: &str) -> Result<Option<EntryView>> {
        let Some(entry) = self.store.peek(&self.codec.encode_key(key)) else {
            return Ok(None);
        };
        Ok(self.codec.decode_value(&entry.value)?.map(|value| EntryView {
            value,
            original_ttl: entry.original_ttl,
            ttl: entry.ttl,
        }))
    }
}
