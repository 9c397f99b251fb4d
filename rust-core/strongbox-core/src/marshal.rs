// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marshaler: object -> (identifier, neutral record).
//
// The identifier travels out of band. Every backend stores it as its own key
// (file stem, `_id` column, `_id` field), so it is never duplicated inside
// the record. Nested objects follow the same rule and pick up the parent's
// identifier again on load.

use tracing::{trace, warn};

use crate::classify;
use crate::error::{ConversionError, StorageError};
use crate::schema::{Entity, Kind};
use crate::value::{Record, Value};

/// The stored form of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Marshaled {
    /// Stringified identifier value; the storage key.
    pub identifier: String,
    /// Every other persisted field, keyed by stored name.
    pub record: Record,
}

struct Projection {
    identifier: Option<Value>,
    record: Record,
}

fn project<E: Entity>(object: &E) -> Result<Projection, StorageError> {
    let schema = E::schema();
    let info = schema.info();
    info.validate()?;

    let mut projection = Projection {
        identifier: None,
        record: Record::new(),
    };

    for (field, get) in schema.persisted() {
        trace!(
            type_name = info.name,
            field = field.name,
            class = ?classify::classify(&field.kind),
            "marshaling field"
        );
        match get(object) {
            Ok(value) if field.identifier => projection.identifier = Some(value),
            Ok(value) => {
                projection.record.insert(field.stored_name().to_string(), value);
            }
            // Only a field that can hold null may absorb a failure; anything
            // else would be saved in a form that never loads again.
            Err(source) if field.identifier || !matches!(field.kind, Kind::Optional(_)) => {
                return Err(StorageError::Conversion {
                    type_name: info.name,
                    field: field.name.to_string(),
                    source,
                });
            }
            Err(error) => {
                warn!(
                    type_name = info.name,
                    field = field.name,
                    %error,
                    "field could not be marshaled, storing null"
                );
                projection
                    .record
                    .insert(field.stored_name().to_string(), Value::Null);
            }
        }
    }

    Ok(projection)
}

/// Project `object` into its identifier and neutral record.
///
/// Fails with [`StorageError::MissingIdentifier`] when the type declares no
/// identifier or the identifier value is null. The source is never mutated.
pub fn marshal<E: Entity>(object: &E) -> Result<Marshaled, StorageError> {
    let type_name = E::schema_info().name;
    let projection = project(object)?;
    let identifier = projection
        .identifier
        .as_ref()
        .and_then(Value::to_key_string)
        .ok_or(StorageError::MissingIdentifier { type_name })?;

    Ok(Marshaled {
        identifier,
        record: projection.record,
    })
}

/// Marshal a complex value held in another object's field.
///
/// Used by `#[derive(Persist)]` for `Persist::to_value`. Nested types need
/// no identifier of their own.
pub fn nested_value<E: Entity>(object: &E) -> Result<Value, ConversionError> {
    project(object)
        .map(|projection| Value::Map(projection.record))
        .map_err(|err| ConversionError::Nested {
            type_name: E::schema_info().name,
            message: err.to_string(),
        })
}
