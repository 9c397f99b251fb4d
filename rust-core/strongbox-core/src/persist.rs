// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion of field types to and from the neutral representation.
//
// `Persist` is implemented here for scalars, strings, options and the std
// containers. Persisted structs and fieldless enums get their impl from
// `#[derive(Persist)]`, which routes complex values back through the
// marshaler and unmarshaler.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::error::ConversionError;
use crate::schema::{FloatWidth, IntWidth, Kind};
use crate::value::{Record, Value};

/// State carried down while reconstructing one object graph.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    identifier: &'a str,
}

impl<'a> LoadContext<'a> {
    pub fn new(identifier: &'a str) -> Self {
        Self { identifier }
    }

    /// The out-of-band identifier of the object being loaded.
    pub fn identifier(&self) -> &'a str {
        self.identifier
    }
}

/// A type that can be stored as a [`Value`].
pub trait Persist: Sized {
    /// The declared shape of this type.
    fn kind() -> Kind;

    /// Project `self` into the neutral representation.
    fn to_value(&self) -> Result<Value, ConversionError>;

    /// Rebuild a value from its neutral representation.
    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError>;

    /// What a missing or unconvertible value resolves to, if anything.
    ///
    /// `Option<T>` answers `Some(None)`; every other type has no null.
    fn absent() -> Option<Self> {
        None
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

/// Widen any stored integer-like value, for narrowing by the caller.
fn integer_of(value: &Value, target: &'static str) -> Result<i128, ConversionError> {
    match value {
        Value::Int(i) => Ok(i128::from(*i)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            if f.abs() < 1.7e38 {
                Ok(*f as i128)
            } else {
                Err(ConversionError::OutOfRange {
                    value: f.to_string(),
                    target,
                })
            }
        }
        Value::Text(s) => s.trim().parse::<i128>().map_err(|_| ConversionError::InvalidText {
            text: s.clone(),
            target,
        }),
        other => Err(mismatch("int", other)),
    }
}

fn float_of(value: &Value, target: &'static str) -> Result<f64, ConversionError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| ConversionError::InvalidText {
            text: s.clone(),
            target,
        }),
        other => Err(mismatch("float", other)),
    }
}

macro_rules! persist_int {
    ($($ty:ty => $width:ident),* $(,)?) => {$(
        impl Persist for $ty {
            fn kind() -> Kind {
                Kind::Int(IntWidth::$width)
            }

            // Unsigned values past i64::MAX are kept exact as decimal text.
            #[allow(clippy::useless_conversion)]
            fn to_value(&self) -> Result<Value, ConversionError> {
                Ok(i64::try_from(*self)
                    .map(Value::Int)
                    .unwrap_or_else(|_| Value::Text(self.to_string())))
            }

            fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
                let wide = integer_of(&value, stringify!($ty))?;
                <$ty>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                    value: wide.to_string(),
                    target: stringify!($ty),
                })
            }
        }
    )*};
}

persist_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
);

impl Persist for f64 {
    fn kind() -> Kind {
        Kind::Float(FloatWidth::F64)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        float_of(&value, "f64")
    }
}

impl Persist for f32 {
    fn kind() -> Kind {
        Kind::Float(FloatWidth::F32)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        // Every backend hands floats back as f64.
        float_of(&value, "f32").map(|f| f as f32)
    }
}

impl Persist for bool {
    fn kind() -> Kind {
        Kind::Bool
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            Value::Text(s) => Err(ConversionError::InvalidText {
                text: s,
                target: "bool",
            }),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl Persist for char {
    fn kind() -> Kind {
        Kind::Char
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Text(self.to_string()))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ConversionError::InvalidText {
                        text: s,
                        target: "char",
                    }),
                }
            }
            other => Err(mismatch("text", &other)),
        }
    }
}

impl Persist for String {
    fn kind() -> Kind {
        Kind::Text
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

macro_rules! persist_bigint {
    ($($ty:ty),*) => {$(
        impl Persist for $ty {
            fn kind() -> Kind {
                Kind::BigInt
            }

            fn to_value(&self) -> Result<Value, ConversionError> {
                Ok(Value::Text(self.to_string()))
            }

            fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i).map_err(|_| ConversionError::OutOfRange {
                        value: i.to_string(),
                        target: stringify!($ty),
                    }),
                    Value::Text(s) => s.trim().parse::<$ty>().map_err(|_| ConversionError::InvalidText {
                        text: s.clone(),
                        target: stringify!($ty),
                    }),
                    other => Err(mismatch("int or text", &other)),
                }
            }
        }
    )*};
}

persist_bigint!(i128, u128);

impl Persist for Value {
    fn kind() -> Kind {
        Kind::Opaque
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        Ok(self.clone())
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        Ok(value)
    }

    fn absent() -> Option<Self> {
        Some(Value::Null)
    }
}

impl<T: Persist> Persist for Option<T> {
    fn kind() -> Kind {
        Kind::Optional(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, ctx).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

fn list_of(value: Value) -> Result<Vec<Value>, ConversionError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(mismatch("list", &other)),
    }
}

fn elements<T: Persist>(value: Value, ctx: &LoadContext<'_>) -> Result<Vec<T>, ConversionError> {
    list_of(value)?
        .into_iter()
        .map(|item| T::from_value(item, ctx))
        .collect()
}

fn to_list<'a, T: Persist + 'a>(
    items: impl Iterator<Item = &'a T>,
) -> Result<Value, ConversionError> {
    items
        .map(Persist::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

impl<T: Persist> Persist for Vec<T> {
    fn kind() -> Kind {
        Kind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        to_list(self.iter())
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        elements(value, ctx)
    }
}

impl<T: Persist> Persist for VecDeque<T> {
    fn kind() -> Kind {
        Kind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        to_list(self.iter())
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        elements(value, ctx).map(VecDeque::from)
    }
}

impl<T: Persist> Persist for Box<[T]> {
    fn kind() -> Kind {
        Kind::Array(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        to_list(self.iter())
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        elements(value, ctx).map(Vec::into_boxed_slice)
    }
}

impl<T: Persist, const N: usize> Persist for [T; N] {
    fn kind() -> Kind {
        Kind::Array(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        to_list(self.iter())
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        let items: Vec<T> = elements(value, ctx)?;
        let found = items.len();
        items
            .try_into()
            .map_err(|_| ConversionError::LengthMismatch { expected: N, found })
    }
}

impl<T: Persist + Eq + Hash> Persist for HashSet<T> {
    fn kind() -> Kind {
        Kind::Set(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        // Hash order changes between runs; sort so the stored form is stable.
        let mut items = self
            .iter()
            .map(Persist::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by_cached_key(|item| serde_json::to_string(item).unwrap_or_default());
        Ok(Value::List(items))
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        elements(value, ctx).map(|items: Vec<T>| items.into_iter().collect())
    }
}

impl<T: Persist + Ord> Persist for BTreeSet<T> {
    fn kind() -> Kind {
        Kind::Set(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        to_list(self.iter())
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        elements(value, ctx).map(|items: Vec<T>| items.into_iter().collect())
    }
}

fn map_of(value: Value) -> Result<Record, ConversionError> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(mismatch("map", &other)),
    }
}

impl<T: Persist> Persist for HashMap<String, T> {
    fn kind() -> Kind {
        Kind::Map(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        self.iter()
            .map(|(key, value)| Ok::<_, ConversionError>((key.clone(), value.to_value()?)))
            .collect::<Result<Record, _>>()
            .map(Value::Map)
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        map_of(value)?
            .into_iter()
            .map(|(key, item)| Ok::<_, ConversionError>((key, T::from_value(item, ctx)?)))
            .collect()
    }
}

impl<T: Persist> Persist for BTreeMap<String, T> {
    fn kind() -> Kind {
        Kind::Map(Box::new(T::kind()))
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        self.iter()
            .map(|(key, value)| Ok::<_, ConversionError>((key.clone(), value.to_value()?)))
            .collect::<Result<Record, _>>()
            .map(Value::Map)
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        map_of(value)?
            .into_iter()
            .map(|(key, item)| Ok::<_, ConversionError>((key, T::from_value(item, ctx)?)))
            .collect()
    }
}
