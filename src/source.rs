//! Serialized mapping definitions and their digests.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use serde_json::Value as JsonValue;

use crate::error::MappingError;
use crate::node::{kind_name, RawNode};

#[derive(Debug, Clone, PartialEq, Eq)]
/// An immutable JSON-encoded mapping definition.
pub struct MappingSource {
    bytes: Arc<[u8]>,
}

impl MappingSource {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            bytes: Arc::from(bytes),
        }
    }

    pub fn from_json_str(input: &str) -> Self {
        Self::from_bytes(input.as_bytes())
    }

    /// Serializes `value` compactly, keeping object key order.
    pub fn from_value(value: &JsonValue) -> Result<Self, MappingError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| MappingError::Serialization(e.to_string()))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the source into a fresh, exclusively owned node.
    pub fn decode(&self) -> Result<RawNode, MappingError> {
        let value: JsonValue = serde_json::from_slice(&self.bytes)
            .map_err(|e| MappingError::Decode(e.to_string()))?;
        match value {
            JsonValue::Object(map) => Ok(map),
            other => Err(MappingError::Decode(format!(
                "mapping root must be an object but got a {}",
                kind_name(&other)
            ))),
        }
    }

    /// `sha256:<hex>` digest of the raw bytes.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.bytes.as_ref());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Checks this source against a digest produced elsewhere.
    ///
    /// `expected` must be in `algorithm:hex_digest` form. Only `sha256` is supported.
    pub fn verify_digest(&self, expected: &str) -> Result<(), MappingError> {
        let (algo, expected_hex) = expected.split_once(':').ok_or_else(|| {
            MappingError::DigestMismatch(format!(
                "invalid digest format '{expected}'; expected 'algorithm:hex_digest'"
            ))
        })?;
        if algo != "sha256" {
            return Err(MappingError::DigestMismatch(format!(
                "unsupported digest algorithm '{algo}'; supported: sha256"
            )));
        }
        let actual = self.digest();
        let actual_hex = &actual["sha256:".len()..];
        if !actual_hex.eq_ignore_ascii_case(expected_hex) {
            return Err(MappingError::DigestMismatch(format!(
                "sha256 mismatch: expected {expected_hex}, got {actual_hex}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_requires_object_root() {
        let err = MappingSource::from_json_str("[1, 2]").decode().unwrap_err();
        assert!(err.to_string().contains("mapping root must be an object but got a array"));
        let err = MappingSource::from_json_str("{\"doc\": ").decode().unwrap_err();
        assert!(err.to_string().starts_with("failed to parse mapping source"));
    }

    #[test]
    fn decode_keeps_document_order() {
        let node = MappingSource::from_json_str(r#"{"z": 1, "a": 2}"#)
            .decode()
            .unwrap();
        assert_eq!(node.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn digest_roundtrip() {
        let source = MappingSource::from_json_str("{}");
        let digest = source.digest();
        // sha256 of "{}"
        assert_eq!(
            digest,
            "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        source.verify_digest(&digest).unwrap();
        assert!(source.verify_digest("sha256:00").is_err());
        assert!(source.verify_digest("md5:00").is_err());
        assert!(source.verify_digest("nocolon").is_err());
    }
}
