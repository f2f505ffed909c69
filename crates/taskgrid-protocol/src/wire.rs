//! CBOR encoding and decoding.
//!
//! Every frame payload is a single self-describing CBOR item. The protocol
//! only uses unsigned integers, booleans, text strings, byte strings,
//! arrays and maps; map entries keep their insertion order.

use std::io::Cursor;

use ciborium::value::Value;
use ciborium::{de, ser};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message as one CBOR item.
///
/// The encoding is deterministic for a given message and produces no
/// trailing bytes.
pub fn to_bytes<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut data = Vec::new();
    ser::into_writer(message, &mut data).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(data)
}

/// Decodes a message from exactly one CBOR item.
///
/// Fails with [`ProtocolError::MalformedWire`] on truncated input, on
/// unknown type tags and on trailing bytes after the item.
pub fn from_bytes<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let mut cursor = Cursor::new(data);
    let message =
        de::from_reader(&mut cursor).map_err(|e| ProtocolError::MalformedWire(e.to_string()))?;
    let consumed = cursor.position() as usize;
    if consumed < data.len() {
        return Err(ProtocolError::MalformedWire(format!(
            "{} trailing bytes after message",
            data.len() - consumed
        )));
    }
    Ok(message)
}

/// Converts a message into its value-tree form.
pub fn to_value<T: Serialize>(message: &T) -> ProtocolResult<Value> {
    Value::serialized(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Converts a value tree into a typed message.
///
/// Fails with [`ProtocolError::MalformedWire`] when the tree does not
/// have the expected shape.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> ProtocolResult<T> {
    value
        .deserialized()
        .map_err(|e| ProtocolError::MalformedWire(e.to_string()))
}
