// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// YAML documents, one file per object.

use strongbox_core::{Record, StorageError};

use crate::flat_file::{Codec, FlatFileBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    const NAME: &'static str = "yaml-file";
    const EXTENSION: &'static str = "yml";

    fn encode(record: &Record) -> Result<Vec<u8>, StorageError> {
        serde_yaml::to_string(record)
            .map(String::into_bytes)
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Record, StorageError> {
        serde_yaml::from_slice(bytes).map_err(|e| StorageError::CorruptedData(e.to_string()))
    }
}

/// `<root>/<TypeName>/<identifier>.yml`
pub type YamlFileBackend = FlatFileBackend<YamlCodec>;

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::Value;

    #[test]
    fn test_document_is_readable_yaml() {
        let mut record = Record::new();
        record.insert("points".to_string(), Value::Int(10));
        record.insert(
            "tags".to_string(),
            Value::List(vec!["a".into(), "b".into()]),
        );
        let text = String::from_utf8(YamlCodec::encode(&record).unwrap()).unwrap();
        assert!(text.contains("points: 10"));
        assert!(text.contains("- a"));
        assert_eq!(YamlCodec::decode(text.as_bytes()).unwrap(), record);
    }

    #[test]
    fn test_decode_garbage() {
        let err = YamlCodec::decode(b"points: [unclosed").unwrap_err();
        assert!(matches!(err, StorageError::CorruptedData(_)));
    }
}
