//! Byte Identity Module
//!
//! Content-addressed byte wrapper used for every key and value held by the store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// == Byte Identity ==
/// Immutable byte sequence whose equality and hash are defined by its contents.
///
/// Two identities built from unrelated buffers with equal bytes are
/// interchangeable as map keys. Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteIdentity(Arc<[u8]>);

impl ByteIdentity {
    /// Wraps a copy of `bytes`.
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    /// Returns the original bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns an owned copy of the original bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the contents begin with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Debug for ByteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => write!(f, "ByteIdentity({text:?})"),
            Err(_) => write!(f, "ByteIdentity({:?})", &self.0),
        }
    }
}

impl From<Vec<u8>> for ByteIdentity {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&[u8]> for ByteIdentity {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for ByteIdentity {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for ByteIdentity {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl AsRef<[u8]> for ByteIdentity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ByteIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ByteIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<u8>::deserialize(deserializer).map(Self::from)
    }
}
