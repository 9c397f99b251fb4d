// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-to-value conversion for declared defaults and out-of-band identifiers.
//
// Both arrive as plain text; the declared kind decides what neutral value
// they become before the field's own `Persist::from_value` takes over.

use crate::classify::{self, Class};
use crate::error::ConversionError;
use crate::schema::{FloatWidth, Kind};
use crate::value::{Record, Value};

/// Convert a declared default to a value of `kind`.
///
/// Container kinds accept any default text and produce an empty instance.
pub fn default_value(kind: &Kind, text: &str) -> Result<Value, ConversionError> {
    match classify::classify(kind) {
        Class::Container => Ok(empty_container(kind)),
        Class::Complex => Err(ConversionError::UnsupportedDefault(kind.describe())),
        Class::Scalar | Class::Opaque => parse_text(kind, text),
    }
}

fn empty_container(kind: &Kind) -> Value {
    match kind.unwrap_optional() {
        Kind::Map(_) => Value::Map(Record::new()),
        _ => Value::List(Vec::new()),
    }
}

/// Parse `text` as a scalar of `kind`.
pub fn parse_text(kind: &Kind, text: &str) -> Result<Value, ConversionError> {
    let invalid = |target: &'static str| ConversionError::InvalidText {
        text: text.to_string(),
        target,
    };

    match kind.unwrap_optional() {
        Kind::Text | Kind::Opaque => Ok(Value::Text(text.to_string())),
        Kind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Text(c.to_string())),
                _ => Err(invalid("char")),
            }
        }
        Kind::Bool => match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid("bool")),
        },
        Kind::Int(width) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid(width.type_name())),
        Kind::Float(width) => {
            let target = match width {
                FloatWidth::F32 => "f32",
                FloatWidth::F64 => "f64",
            };
            text.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid(target))
        }
        Kind::BigInt => text
            .trim()
            .parse::<i128>()
            .map(|n| Value::Text(n.to_string()))
            .or_else(|_| text.trim().parse::<u128>().map(|n| Value::Text(n.to_string())))
            .map_err(|_| invalid("bigint")),
        Kind::Enum { name, variants } => {
            if variants.contains(&text) {
                Ok(Value::Text(text.to_string()))
            } else {
                Err(ConversionError::UnknownVariant {
                    enum_name: *name,
                    value: text.to_string(),
                })
            }
        }
        other => Err(ConversionError::UnsupportedDefault(other.describe())),
    }
}
