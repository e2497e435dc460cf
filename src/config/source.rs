//! Property Sources
//!
//! String-keyed lookup used to override configuration fields that were not
//! set explicitly.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use tracing::warn;

/// Prefix applied by [`EnvSource::default`].
pub const ENV_PREFIX: &str = "CACHE_";

// == Property Source ==
pub trait PropertySource {
    /// Raw value of `name`, if present.
    fn property(&self, name: &str) -> Option<String>;
}

/// Looks up `name` and converts it, ignoring (and logging) values that do not parse.
pub fn parsed<T>(source: &dyn PropertySource, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = source.property(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Ignoring property {}={:?}: {}", name, raw, err);
            None
        }
    }
}

// == Environment Source ==
/// Reads `{prefix}{name}` from the process environment.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}

impl PropertySource for EnvSource {
    fn property(&self, name: &str) -> Option<String> {
        env::var(format!("{}{}", self.prefix, name)).ok()
    }
}

// == Map Source ==
/// In-memory properties, handy for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapSource(HashMap<String, String>);

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl PropertySource for MapSource {
    fn property(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_lookup() {
        let source = MapSource::new().with("DEFAULT_DURATION", "30");
        assert_eq!(parsed::<u64>(&source, "DEFAULT_DURATION"), Some(30));
        assert_eq!(parsed::<u64>(&source, "MISSING"), None);
    }

    #[test]
    fn test_unparsable_value_is_ignored() {
        let source = MapSource::new().with("ENABLE_PERSISTENCE", "maybe");
        assert_eq!(parsed::<bool>(&source, "ENABLE_PERSISTENCE"), None);
    }

    #[test]
    fn test_env_source_uses_prefix() {
        env::set_var("DURABLE_CACHE_TEST_SOURCE_KEY", "42");
        let source = EnvSource::new("DURABLE_CACHE_TEST_");
        assert_eq!(parsed::<u16>(&source, "SOURCE_KEY"), Some(42));
        env::remove_var("DURABLE_CACHE_TEST_SOURCE_KEY");
    }
}
