//! Codec Module
//!
//! Turns command arguments into the bytes the store keeps, and back.

use serde_json::Value;

use crate::cache::ByteIdentity;
use crate::error::CodecError;

// == Codec ==
pub trait Codec: Send + Sync {
    fn encode_key(&self, key: &str) -> ByteIdentity;

    fn decode_key(&self, bytes: &ByteIdentity) -> Result<String, CodecError>;

    fn encode_value(&self, value: &Value) -> Result<ByteIdentity, CodecError>;

    /// Decodes a stored value. Empty bytes mean the value is absent, which is
    /// distinct from bytes that fail to decode.
    fn decode_value(&self, bytes: &ByteIdentity) -> Result<Option<Value>, CodecError>;
}

// == JSON Codec ==
/// Keys as UTF-8, values as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_key(&self, key: &str) -> ByteIdentity {
        ByteIdentity::from(key)
    }

    fn decode_key(&self, bytes: &ByteIdentity) -> Result<String, CodecError> {
        Ok(String::from_utf8(bytes.as_bytes().to_vec())?)
    }

    fn encode_value(&self, value: &Value) -> Result<ByteIdentity, CodecError> {
        Ok(ByteIdentity::from(serde_json::to_vec(value)?))
    }

    fn decode_value(&self, bytes: &ByteIdentity) -> Result<Option<Value>, CodecError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(bytes.as_bytes())?))
    }
}
