// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-registered test types, built with `Schema::builder` rather than the
// derive so the core can be tested on its own.

use std::sync::OnceLock;

use crate::error::ConversionError;
use crate::marshal::nested_value;
use crate::persist::{mismatch, LoadContext, Persist};
use crate::schema::{Entity, Kind, Schema};
use crate::unmarshal::nested_entity;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Member,
    Admin,
}

impl Persist for Rank {
    fn kind() -> Kind {
        Kind::Enum {
            name: "Rank",
            variants: &["Member", "Admin"],
        }
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        let name = match self {
            Rank::Member => "Member",
            Rank::Admin => "Admin",
        };
        Ok(Value::Text(name.to_string()))
    }

    fn from_value(value: Value, _ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        match value {
            Value::Text(name) => match name.as_str() {
                "Member" => Ok(Rank::Member),
                "Admin" => Ok(Rank::Admin),
                _ => Err(ConversionError::UnknownVariant {
                    enum_name: "Rank",
                    value: name,
                }),
            },
            other => Err(mismatch("text", &other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Entity for Position {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Position>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Position")
                .field("x", |p: &Position| &p.x)
                .field("y", |p: &Position| &p.y)
                .constructor(|args| {
                    Ok(Position {
                        x: args.take("x")?,
                        y: args.take("y")?,
                    })
                })
                .build()
        })
    }
}

impl Persist for Position {
    fn kind() -> Kind {
        Kind::Complex(<Position as Entity>::schema_info)
    }

    fn to_value(&self) -> Result<Value, ConversionError> {
        nested_value(self)
    }

    fn from_value(value: Value, ctx: &LoadContext<'_>) -> Result<Self, ConversionError> {
        nested_entity(value, ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub points: i32,
    pub tags: Vec<String>,
    pub rank: Rank,
    pub previous_rank: Option<Rank>,
    pub home: Option<Position>,
    pub nickname: Option<String>,
    pub visits: u64,
    pub cache: u32,
}

impl Profile {
    pub fn sample(id: &str) -> Self {
        Profile {
            id: id.to_string(),
            points: 10,
            tags: vec!["a".to_string(), "b".to_string()],
            rank: Rank::Member,
            previous_rank: None,
            home: None,
            nickname: None,
            visits: 0,
            cache: 7,
        }
    }
}

impl Entity for Profile {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Profile>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Profile")
                .field("id", |p: &Profile| &p.id)
                .identifier()
                .field("points", |p: &Profile| &p.points)
                .default_value("10")
                .field("tags", |p: &Profile| &p.tags)
                .default_value("[]")
                .field("rank", |p: &Profile| &p.rank)
                .rename("role")
                .default_value("Member")
                .field("previous_rank", |p: &Profile| &p.previous_rank)
                .rename("previous_role")
                .field("home", |p: &Profile| &p.home)
                .field("nickname", |p: &Profile| &p.nickname)
                .field("visits", |p: &Profile| &p.visits)
                .default_value("0")
                .ignored("cache")
                .constructor(|args| {
                    Ok(Profile {
                        id: args.take("id")?,
                        points: args.take("points")?,
                        tags: args.take("tags")?,
                        rank: args.take("rank")?,
                        previous_rank: args.take("previous_rank")?,
                        home: args.take("home")?,
                        nickname: args.take("nickname")?,
                        visits: args.take("visits")?,
                        cache: 0,
                    })
                })
                .build()
        })
    }
}

/// An identifier that may be null, and no constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: Option<String>,
    pub label: String,
}

impl Entity for Ticket {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Ticket>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Ticket")
                .field("id", |t: &Ticket| &t.id)
                .identifier()
                .field("label", |t: &Ticket| &t.label)
                .build()
        })
    }
}
