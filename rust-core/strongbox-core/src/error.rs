// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the Strongbox persistence engine.
//
// Two layers: `ConversionError` describes why a single value could not be
// turned into (or out of) its declared type, and `StorageError` covers every
// way a whole save/load/delete call can fail, from a missing identifier to a
// driver that refused the connection.

use thiserror::Error;

/// Errors raised while converting one value between its Rust type and the
/// neutral representation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The stored value has the wrong shape for the target type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the shape the target type accepts.
        expected: &'static str,
        /// Name of the shape that was actually stored.
        found: &'static str,
    },

    /// A numeric value does not fit the target width.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// The offending value, rendered as text.
        value: String,
        /// The target Rust type.
        target: &'static str,
    },

    /// An enum name did not match any variant (case-sensitive).
    #[error("'{value}' is not a variant of {enum_name}")]
    UnknownVariant {
        /// The enum type.
        enum_name: &'static str,
        /// The stored name.
        value: String,
    },

    /// Text could not be parsed as the target type.
    #[error("cannot parse '{text}' as {target}")]
    InvalidText {
        /// The text that failed to parse.
        text: String,
        /// The target Rust type.
        target: &'static str,
    },

    /// A fixed-size array was stored with a different number of elements.
    #[error("expected {expected} elements, found {found}")]
    LengthMismatch {
        /// Declared array length.
        expected: usize,
        /// Stored list length.
        found: usize,
    },

    /// A default value was declared on a kind that has no text form.
    #[error("no text default is supported for {0}")]
    UnsupportedDefault(String),

    /// A nested complex value failed to marshal or reconstruct.
    #[error("nested {type_name}: {message}")]
    Nested {
        /// The nested type.
        type_name: &'static str,
        /// Rendered cause.
        message: String,
    },
}

/// Errors that can occur when saving, loading or deleting an object.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a stored representation.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (misconfigured or compiled out).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A networked backend was used before `connect()`.
    #[error("backend '{0}' is not connected")]
    NotConnected(String),

    /// The object has no identifier field, or its value is null.
    #[error("{type_name} has no identifier value")]
    MissingIdentifier {
        /// The domain type being saved.
        type_name: &'static str,
    },

    /// The identifier cannot be used as a storage key.
    #[error("invalid identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The type declares no reconstruction constructor.
    #[error("{0} has no reconstruction constructor")]
    NoReconstructionConstructor(&'static str),

    /// The type's metadata violates the persistence contract.
    #[error("invalid schema for {type_name}: {reason}")]
    InvalidSchema {
        /// The offending type.
        type_name: &'static str,
        /// Which rule was broken.
        reason: String,
    },

    /// A field value could not be converted.
    #[error("field '{field}' of {type_name}: {source}")]
    Conversion {
        /// The type being marshaled or reconstructed.
        type_name: &'static str,
        /// The field name.
        field: String,
        /// The underlying conversion failure.
        #[source]
        source: ConversionError,
    },

    /// A non-optional field has no stored value and no default.
    #[error("field '{field}' of {type_name} has no stored value and no default")]
    MissingField {
        /// The type being reconstructed.
        type_name: &'static str,
        /// The field name.
        field: String,
    },

    /// A reconstruction function asked for a field the schema does not declare.
    #[error("{type_name} declares no field named '{field}'")]
    UnknownField {
        /// The type being reconstructed.
        type_name: &'static str,
        /// The requested field name.
        field: String,
    },

    /// The reconstruction constructor itself rejected its arguments.
    #[error("failed to construct {type_name}: {message}")]
    Construction {
        /// The type being reconstructed.
        type_name: &'static str,
        /// The constructor's error, rendered.
        message: String,
    },

    /// The database driver reported an error.
    #[error("driver error: {0}")]
    Driver(String),

    /// A background worker running an async operation failed.
    #[error("background task failed: {0}")]
    Worker(String),
}

impl StorageError {
    /// Wrap a constructor error for `type_name`.
    pub fn construction(type_name: &'static str, err: impl std::fmt::Display) -> Self {
        StorageError::Construction {
            type_name,
            message: err.to_string(),
        }
    }

    /// True if the call failed only because the backend was not connected.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, StorageError::NotConnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StorageError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_not_connected_display() {
        let err = StorageError::NotConnected("mysql".to_string());
        assert_eq!(err.to_string(), "backend 'mysql' is not connected");
        assert!(err.is_not_connected());
    }

    #[test]
    fn test_missing_identifier_display() {
        let err = StorageError::MissingIdentifier { type_name: "Profile" };
        assert_eq!(err.to_string(), "Profile has no identifier value");
        assert!(!err.is_not_connected());
    }

    #[test]
    fn test_conversion_error_keeps_source() {
        let err = StorageError::Conversion {
            type_name: "Profile",
            field: "points".to_string(),
            source: ConversionError::OutOfRange {
                value: "300".to_string(),
                target: "u8",
            },
        };
        assert!(err.to_string().contains("points"));
        assert!(err.to_string().contains("300"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_construction_helper() {
        let err = StorageError::construction("Profile", "negative points");
        assert_eq!(
            err.to_string(),
            "failed to construct Profile: negative points"
        );
    }

    #[test]
    fn test_unknown_variant_display() {
        let err = ConversionError::UnknownVariant {
            enum_name: "Rank",
            value: "admin".to_string(),
        };
        assert_eq!(err.to_string(), "'admin' is not a variant of Rank");
    }
}
