// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON documents, one file per object.

use strongbox_core::{Record, StorageError};

use crate::flat_file::{Codec, FlatFileBackend};

/// Pretty-printed JSON with keys in sorted order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    const NAME: &'static str = "json-file";
    const EXTENSION: &'static str = "json";

    fn encode(record: &Record) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Record, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::CorruptedData(e.to_string()))
    }
}

/// `<root>/<TypeName>/<identifier>.json`
pub type JsonFileBackend = FlatFileBackend<JsonCodec>;

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::Value;

    #[test]
    fn test_non_finite_floats_encode_as_text() {
        let mut record = Record::new();
        record.insert("ratio".to_string(), Value::Float(f64::NAN));
        record.insert("ceiling".to_string(), Value::Float(f64::INFINITY));
        let bytes = JsonCodec::encode(&record).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"inf\""));

        let back = JsonCodec::decode(&bytes).unwrap();
        assert_eq!(back["ratio"], Value::Text("NaN".to_string()));
        assert_eq!(back["ceiling"], Value::Text("inf".to_string()));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        let err = JsonCodec::decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, StorageError::CorruptedData(_)));
    }
}
