//! Expiration Message
//!
//! The raw and decoded form of an expired entry, as delivered to listeners.

use serde_json::Value;

use crate::cache::ByteIdentity;
use crate::commands::Codec;
use crate::error::CodecError;

// == Message ==
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    byte_key: ByteIdentity,
    byte_value: ByteIdentity,
    key: String,
    value: Option<Value>,
}

impl Message {
    /// Decodes both sides of an expired entry. Fails rather than hand
    /// listeners a half-built message.
    pub fn from_bytes(
        byte_key: ByteIdentity,
        byte_value: ByteIdentity,
        codec: &dyn Codec,
    ) -> Result<Self, CodecError> {
        let key = codec.decode_key(&byte_key)?;
        let value = codec.decode_value(&byte_value)?;
        Ok(Self {
            byte_key,
            byte_value,
            key,
            value,
        })
    }

    pub fn byte_key(&self) -> &ByteIdentity {
        &self.byte_key
    }

    pub fn byte_value(&self) -> &ByteIdentity {
        &self.byte_value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Decoded value; `None` when the entry held no bytes.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}
