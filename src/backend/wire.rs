//! Wire payload encoding shared by both backends.
//!
//! Structured values are UTF-8 JSON; bare strings are raw UTF-8 bytes
//! without JSON quoting. Both backends funnel their payloads through these
//! helpers so decode failures are reported uniformly, tagged with the
//! operation that produced the bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MarshalError, Result};

/// Serializes a structured argument to its JSON wire form.
pub(crate) fn encode<T: Serialize + ?Sized>(operation: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| MarshalError::encode(operation, e).into())
}

/// Deserializes a structured result from its JSON wire form.
pub(crate) fn decode<T: DeserializeOwned>(operation: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| MarshalError::decode(operation, e).into())
}

/// Decodes a bare-string result (raw UTF-8, no JSON quoting).
pub(crate) fn decode_text(operation: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| MarshalError::decode(operation, e).into())
}

/// Unwraps a result payload an operation is required to produce.
pub(crate) fn require(operation: &str, payload: Option<Vec<u8>>) -> Result<Vec<u8>> {
    payload.ok_or_else(|| MarshalError::missing_result(operation).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SearchResult, VectorEntry};

    #[test]
    fn test_encode_decode_round_trip() {
        let entry = VectorEntry::new("v1", vec![1.0, 2.0]);
        let bytes = encode("vectordb_insert", &entry).unwrap();
        let restored: VectorEntry = decode("vectordb_get", &bytes).unwrap();
        assert_eq!(entry, restored);
    }

    #[test]
    fn test_decode_malformed_payload_names_operation() {
        let err = decode::<Vec<SearchResult>>("vectordb_search", b"not json").unwrap_err();
        assert!(err.is_marshal());
        assert!(err.to_string().contains("vectordb_search"));
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        let err = decode_text("consensus_submit", vec![0xff, 0xfe]).unwrap_err();
        assert!(err.is_marshal());
    }

    #[test]
    fn test_require_missing_result() {
        let err = require("vectordb_len", None).unwrap_err();
        assert!(err.to_string().contains("vectordb_len"));
        assert_eq!(require("vectordb_len", Some(vec![b'3'])).unwrap(), vec![b'3']);
    }
}
