// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata model for persisted types.
//
// Every domain type is described once by a `Schema<T>`: its stored name, its
// ordered fields (stored name, default text, identifier and ignore flags,
// declared `Kind`), an accessor per persisted field, and the reconstruction
// constructor. `#[derive(Persist)]` builds the schema through the same
// `SchemaBuilder` that hand-written registrations use.

use std::collections::HashSet;
use std::fmt;

use crate::error::{ConversionError, StorageError};
use crate::persist::Persist;
use crate::unmarshal::Arguments;
use crate::value::Value;

/// Declared width of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    /// Rust name of the width, for diagnostics.
    pub fn type_name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
        }
    }
}

/// Declared width of a floating point field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// The declared shape of a field, as far as persistence is concerned.
#[derive(Clone)]
pub enum Kind {
    Bool,
    Char,
    Text,
    Int(IntWidth),
    Float(FloatWidth),
    /// Integers wider than 64 bits, carried as decimal text.
    BigInt,
    /// A fieldless enum stored by variant name.
    Enum {
        name: &'static str,
        variants: &'static [&'static str],
    },
    /// Another persisted type, resolved lazily so types may nest themselves.
    Complex(fn() -> &'static SchemaInfo),
    Optional(Box<Kind>),
    Array(Box<Kind>),
    List(Box<Kind>),
    Set(Box<Kind>),
    /// String-keyed map.
    Map(Box<Kind>),
    /// Anything else; copied verbatim.
    Opaque,
}

impl Kind {
    /// Strip any number of `Optional` wrappers.
    pub fn unwrap_optional(&self) -> &Kind {
        match self {
            Kind::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// Human-readable description, e.g. `list<i32>`.
    pub fn describe(&self) -> String {
        match self {
            Kind::Bool => "bool".to_string(),
            Kind::Char => "char".to_string(),
            Kind::Text => "string".to_string(),
            Kind::Int(width) => width.type_name().to_string(),
            Kind::Float(FloatWidth::F32) => "f32".to_string(),
            Kind::Float(FloatWidth::F64) => "f64".to_string(),
            Kind::BigInt => "bigint".to_string(),
            Kind::Enum { name, .. } => format!("enum {name}"),
            Kind::Complex(info) => info().name.to_string(),
            Kind::Optional(inner) => format!("option<{}>", inner.describe()),
            Kind::Array(inner) => format!("array<{}>", inner.describe()),
            Kind::List(inner) => format!("list<{}>", inner.describe()),
            Kind::Set(inner) => format!("set<{}>", inner.describe()),
            Kind::Map(inner) => format!("map<string, {}>", inner.describe()),
            Kind::Opaque => "opaque".to_string(),
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Metadata for one field of a persisted type.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// The Rust field name.
    pub name: &'static str,
    /// Explicit stored name, if any.
    pub rename: Option<&'static str>,
    /// Default applied when the stored representation has no value.
    pub default: Option<&'static str>,
    /// True for the single identifier field.
    pub identifier: bool,
    /// True if the field is excluded from persistence.
    pub ignored: bool,
    /// Declared shape.
    pub kind: Kind,
}

impl FieldSchema {
    /// A plain persisted field with no overrides.
    pub fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            rename: None,
            default: None,
            identifier: false,
            ignored: false,
            kind,
        }
    }

    /// The key this field is stored under.
    pub fn stored_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }
}

/// Type-erased description of a persisted type.
///
/// Backends only ever see this: the type name names the folder, table or
/// collection, and the field kinds drive column typing.
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    /// Stored type name.
    pub name: &'static str,
    /// All declared fields, ignored ones included, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Whether a reconstruction constructor is registered.
    pub has_constructor: bool,
}

impl SchemaInfo {
    /// Look up a field by its Rust name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields that take part in persistence.
    pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|field| !field.ignored)
    }

    /// The identifier field, if one is declared.
    pub fn identifier(&self) -> Option<&FieldSchema> {
        self.persisted_fields().find(|field| field.identifier)
    }

    /// Check the metadata contract.
    ///
    /// At most one identifier, never on an ignored field, and no two
    /// persisted fields sharing a stored name. Whether an identifier is
    /// required at all depends on the call: nested types may omit it.
    pub fn validate(&self) -> Result<(), StorageError> {
        let invalid = |reason: String| StorageError::InvalidSchema {
            type_name: self.name,
            reason,
        };

        if self.fields.iter().any(|f| f.identifier && f.ignored) {
            return Err(invalid("identifier field is marked ignored".to_string()));
        }
        let identifiers = self.fields.iter().filter(|f| f.identifier).count();
        if identifiers > 1 {
            return Err(invalid(format!("{identifiers} identifier fields declared")));
        }

        let mut seen = HashSet::new();
        for field in self.persisted_fields() {
            if !seen.insert(field.stored_name()) {
                return Err(invalid(format!(
                    "stored name '{}' used twice",
                    field.stored_name()
                )));
            }
        }
        Ok(())
    }
}

type Accessor<T> = Box<dyn Fn(&T) -> Result<Value, ConversionError> + Send + Sync>;

/// Rebuilds a `T` from its resolved arguments.
pub type Constructor<T> = fn(&mut Arguments<'_>) -> Result<T, StorageError>;

/// Full descriptor of a persisted type `T`.
pub struct Schema<T> {
    info: SchemaInfo,
    /// One slot per entry in `info.fields`; `None` for ignored fields.
    accessors: Vec<Option<Accessor<T>>>,
    constructor: Option<Constructor<T>>,
}

impl<T: 'static> Schema<T> {
    /// Start describing a type stored under `name`.
    pub fn builder(name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            name,
            fields: Vec::new(),
            accessors: Vec::new(),
            constructor: None,
        }
    }

    pub fn info(&self) -> &SchemaInfo {
        &self.info
    }

    pub fn name(&self) -> &'static str {
        self.info.name
    }

    pub fn constructor(&self) -> Option<Constructor<T>> {
        self.constructor
    }

    /// Persisted fields paired with their accessor, in declaration order.
    pub(crate) fn persisted(&self) -> impl Iterator<Item = (&FieldSchema, &Accessor<T>)> {
        self.info
            .fields
            .iter()
            .zip(self.accessors.iter())
            .filter(|(field, _)| !field.ignored)
            .filter_map(|(field, accessor)| accessor.as_ref().map(|get| (field, get)))
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("info", &self.info)
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Builder for [`Schema`].
///
/// Field modifiers (`identifier`, `rename`, `default_value`) apply to the
/// most recently added field.
///
/// # Example
///
/// ```rust
/// use strongbox_core::{Arguments, Schema, StorageError};
///
/// struct Profile { id: String, points: i32 }
///
/// let schema = Schema::<Profile>::builder("Profile")
///     .field("id", |p: &Profile| &p.id).identifier()
///     .field("points", |p: &Profile| &p.points).default_value("0")
///     .constructor(|args: &mut Arguments<'_>| {
///         Ok::<_, StorageError>(Profile { id: args.take("id")?, points: args.take("points")? })
///     })
///     .build();
///
/// assert_eq!(schema.info().identifier().unwrap().name, "id");
/// ```
pub struct SchemaBuilder<T> {
    name: &'static str,
    fields: Vec<FieldSchema>,
    accessors: Vec<Option<Accessor<T>>>,
    constructor: Option<Constructor<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Add a persisted field read through `get`.
    pub fn field<F: Persist + 'static>(mut self, name: &'static str, get: fn(&T) -> &F) -> Self {
        self.fields.push(FieldSchema::new(name, F::kind()));
        self.accessors
            .push(Some(Box::new(move |target: &T| get(target).to_value())));
        self
    }

    /// Declare a field that is never persisted.
    pub fn ignored(mut self, name: &'static str) -> Self {
        let mut field = FieldSchema::new(name, Kind::Opaque);
        field.ignored = true;
        self.fields.push(field);
        self.accessors.push(None);
        self
    }

    /// Mark the last field as the identifier.
    pub fn identifier(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.identifier = true;
        }
        self
    }

    /// Store the last field under `stored_name`.
    pub fn rename(mut self, stored_name: &'static str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.rename = Some(stored_name);
        }
        self
    }

    /// Default text for the last field.
    pub fn default_value(mut self, text: &'static str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.default = Some(text);
        }
        self
    }

    /// Register the reconstruction constructor.
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn build(self) -> Schema<T> {
        Schema {
            info: SchemaInfo {
                name: self.name,
                fields: self.fields,
                has_constructor: self.constructor.is_some(),
            },
            accessors: self.accessors,
            constructor: self.constructor,
        }
    }
}

/// A type the engine can save and load.
///
/// Usually implemented by `#[derive(Persist)]`; hand-written impls return a
/// schema built once with [`Schema::builder`] and cached in a `OnceLock`.
pub trait Entity: Sized + Send + Sync + 'static {
    /// The type's descriptor.
    fn schema() -> &'static Schema<Self>;

    /// The type-erased part of the descriptor.
    fn schema_info() -> &'static SchemaInfo {
        Self::schema().info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        id: String,
        points: i32,
    }

    fn sample_schema() -> Schema<Sample> {
        Schema::<Sample>::builder("Sample")
            .field("id", |s: &Sample| &s.id)
            .identifier()
            .field("points", |s: &Sample| &s.points)
            .rename("score")
            .default_value("5")
            .ignored("cache")
            .build()
    }

    #[test]
    fn test_builder_records_metadata() {
        let schema = sample_schema();
        let info = schema.info();
        assert_eq!(info.name, "Sample");
        assert_eq!(info.fields.len(), 3);
        assert!(!info.has_constructor);

        let points = info.field("points").unwrap();
        assert_eq!(points.stored_name(), "score");
        assert_eq!(points.default, Some("5"));
        assert!(matches!(points.kind, Kind::Int(IntWidth::I32)));

        assert_eq!(info.identifier().unwrap().name, "id");
        assert_eq!(info.persisted_fields().count(), 2);
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_accessors_skip_ignored_fields() {
        let schema = sample_schema();
        let sample = Sample {
            id: "s1".to_string(),
            points: 9,
        };
        let values: Vec<_> = schema
            .persisted()
            .map(|(field, get)| (field.name, get(&sample).unwrap()))
            .collect();
        assert_eq!(
            values,
            vec![("id", Value::Text("s1".into())), ("points", Value::Int(9))]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_stored_names() {
        let schema = Schema::<Sample>::builder("Sample")
            .field("id", |s: &Sample| &s.id)
            .rename("points")
            .field("points", |s: &Sample| &s.points)
            .build();
        let err = schema.info().validate().unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn test_validate_rejects_two_identifiers() {
        let schema = Schema::<Sample>::builder("Sample")
            .field("id", |s: &Sample| &s.id)
            .identifier()
            .field("points", |s: &Sample| &s.points)
            .identifier()
            .build();
        assert!(matches!(
            schema.info().validate(),
            Err(StorageError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_kind_describe() {
        let kind = Kind::Optional(Box::new(Kind::List(Box::new(Kind::Int(IntWidth::U8)))));
        assert_eq!(kind.describe(), "option<list<u8>>");
        assert!(matches!(kind.unwrap_optional(), Kind::List(_)));
    }
}
