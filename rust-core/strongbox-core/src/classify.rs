// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Type classifier: decides whether a declared kind is copied verbatim, is a
// container whose elements are transformed one by one, or is a complex
// object that must be marshaled recursively.

use crate::schema::Kind;

/// How the marshaler treats a value of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Numbers, booleans, chars, strings, enum names and big integers.
    Scalar,
    /// Lists, sets, arrays and string-keyed maps.
    Container,
    /// A persisted type with fields or a reconstruction constructor.
    Complex,
    /// Anything else, copied as-is.
    Opaque,
}

/// Classify `kind`, looking through `Option`.
pub fn classify(kind: &Kind) -> Class {
    match kind.unwrap_optional() {
        Kind::Bool
        | Kind::Char
        | Kind::Text
        | Kind::Int(_)
        | Kind::Float(_)
        | Kind::BigInt
        | Kind::Enum { .. } => Class::Scalar,
        Kind::Array(_) | Kind::List(_) | Kind::Set(_) | Kind::Map(_) => Class::Container,
        Kind::Complex(info) => {
            let info = info();
            if info.persisted_fields().next().is_some() || info.has_constructor {
                Class::Complex
            } else {
                Class::Opaque
            }
        }
        Kind::Optional(_) | Kind::Opaque => Class::Opaque,
    }
}

pub fn is_complex(kind: &Kind) -> bool {
    classify(kind) == Class::Complex
}

pub fn is_scalar(kind: &Kind) -> bool {
    classify(kind) == Class::Scalar
}

pub fn is_container(kind: &Kind) -> bool {
    classify(kind) == Class::Container
}

/// The element kind of a container, if `kind` is one.
pub fn element_kind(kind: &Kind) -> Option<&Kind> {
    match kind.unwrap_optional() {
        Kind::Array(inner) | Kind::List(inner) | Kind::Set(inner) | Kind::Map(inner) => {
            Some(inner)
        }
        _ => None,
    }
}
