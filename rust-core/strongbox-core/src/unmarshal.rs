// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unmarshaler: (neutral record, identifier) -> object.
//
// The type's reconstruction constructor is the only construction path. It
// pulls each argument out of an `Arguments` by field name; resolution order
// is identifier, then stored value, then declared default.

use tracing::warn;

use crate::convert;
use crate::error::{ConversionError, StorageError};
use crate::persist::{mismatch, LoadContext, Persist};
use crate::schema::{Entity, FieldSchema, SchemaInfo};
use crate::value::{Record, Value};

/// How a field's value was found.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome<T> {
    /// Read from the stored record (or, for the identifier, from the key).
    Stored(T),
    /// The record had no value; the declared default was converted.
    Defaulted(T),
    /// The record had no value and no default is declared.
    Absent,
}

impl<T> FieldOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldOutcome::Stored(value) | FieldOutcome::Defaulted(value) => Some(value),
            FieldOutcome::Absent => None,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, FieldOutcome::Defaulted(_))
    }
}

/// The stored arguments of one reconstruction call.
///
/// Each stored value is handed out once; asking for the same field twice
/// sees it as missing.
pub struct Arguments<'a> {
    info: &'a SchemaInfo,
    record: Record,
    ctx: LoadContext<'a>,
}

impl<'a> Arguments<'a> {
    pub fn new(info: &'a SchemaInfo, record: Record, identifier: &'a str) -> Self {
        Self {
            info,
            record,
            ctx: LoadContext::new(identifier),
        }
    }

    /// The type being reconstructed.
    pub fn type_name(&self) -> &'static str {
        self.info.name
    }

    /// The out-of-band identifier of the object being loaded.
    pub fn identifier(&self) -> &'a str {
        self.ctx.identifier()
    }

    fn declared(&self, name: &str) -> Result<&'a FieldSchema, StorageError> {
        let info: &'a SchemaInfo = self.info;
        info.field(name)
            .filter(|field| !field.ignored)
            .ok_or_else(|| StorageError::UnknownField {
                type_name: info.name,
                field: name.to_string(),
            })
    }

    fn conversion(&self, field: &FieldSchema, source: ConversionError) -> StorageError {
        StorageError::Conversion {
            type_name: self.info.name,
            field: field.name.to_string(),
            source,
        }
    }

    /// Resolve `name` without applying any fallback.
    ///
    /// A value that is present but cannot be converted is an error here;
    /// [`Arguments::take`] decides whether to contain it.
    pub fn resolve<T: Persist>(&mut self, name: &str) -> Result<FieldOutcome<T>, StorageError> {
        let field = self.declared(name)?;

        if field.identifier {
            let value = convert::parse_text(&field.kind, self.ctx.identifier())
                .map_err(|err| self.conversion(field, err))?;
            return T::from_value(value, &self.ctx)
                .map(FieldOutcome::Stored)
                .map_err(|err| self.conversion(field, err));
        }

        match self.record.remove(field.stored_name()) {
            Some(value) if !value.is_null() => T::from_value(value, &self.ctx)
                .map(FieldOutcome::Stored)
                .map_err(|err| self.conversion(field, err)),
            _ => match field.default {
                Some(text) => convert::default_value(&field.kind, text)
                    .and_then(|value| T::from_value(value, &self.ctx))
                    .map(FieldOutcome::Defaulted)
                    .map_err(|err| self.conversion(field, err)),
                None => Ok(FieldOutcome::Absent),
            },
        }
    }

    /// Produce the constructor argument for field `name`.
    ///
    /// Missing values resolve to the declared default, then to the type's
    /// null (`None` for `Option<T>`). A conversion failure on an optional
    /// field is logged and yields `None`; on any other field it fails the
    /// whole reconstruction.
    pub fn take<T: Persist>(&mut self, name: &str) -> Result<T, StorageError> {
        match self.resolve::<T>(name) {
            Ok(FieldOutcome::Stored(value)) | Ok(FieldOutcome::Defaulted(value)) => Ok(value),
            Ok(FieldOutcome::Absent) => T::absent().ok_or_else(|| StorageError::MissingField {
                type_name: self.info.name,
                field: name.to_string(),
            }),
            Err(err @ StorageError::Conversion { .. }) => match T::absent() {
                Some(fallback) => {
                    warn!(
                        type_name = self.info.name,
                        id = self.ctx.identifier(),
                        field = name,
                        error = %err,
                        "stored value could not be converted, using null"
                    );
                    Ok(fallback)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

fn reconstruct<E: Entity>(record: Record, identifier: &str) -> Result<E, StorageError> {
    let schema = E::schema();
    let constructor = schema
        .constructor()
        .ok_or(StorageError::NoReconstructionConstructor(schema.name()))?;
    let mut args = Arguments::new(schema.info(), record, identifier);
    constructor(&mut args)
}

/// Rebuild an `E` from its stored record and identifier.
pub fn unmarshal<E: Entity>(record: Record, identifier: &str) -> Result<E, StorageError> {
    reconstruct(record, identifier)
}

/// Rebuild a complex value held in another object's field.
///
/// The parent's identifier is passed down unchanged.
pub fn nested_entity<E: Entity>(value: Value, ctx: &LoadContext<'_>) -> Result<E, ConversionError> {
    let record = match value {
        Value::Map(record) => record,
        other => return Err(mismatch("map", &other)),
    };
    reconstruct(record, ctx.identifier()).map_err(|err| ConversionError::Nested {
        type_name: E::schema_info().name,
        message: err.to_string(),
    })
}
