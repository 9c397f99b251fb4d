// SPDX-License-Identifier: PMPL-1.0-or-later
//! Contract suite shared by every backend's integration tests.
//!
//! Each check starts by clearing the ids it uses, so the suite can run
//! against a shared database as well as a fresh temp directory.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};

use strongbox_core::{Persist, StorageEngine, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Persist)]
pub enum Rank {
    Member,
    Officer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Persist)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// The minimal object every backend must round trip.
#[derive(Debug, Clone, PartialEq, Persist)]
pub struct Profile {
    #[persist(id)]
    pub id: String,
    #[persist(default = "0")]
    pub points: i32,
    #[persist(default = "[]")]
    pub tags: Vec<String>,
}

impl Profile {
    pub fn new(id: &str, points: i32, tags: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            points,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Every field class a backend has to carry.
#[derive(Debug, Clone, PartialEq, Persist)]
#[persist(name = "Player")]
pub struct Player {
    #[persist(id)]
    pub name: String,
    pub active: bool,
    pub ratio: f64,
    pub level: u8,
    pub initial: char,
    pub big: u128,
    #[persist(rename = "role", default = "Member")]
    pub rank: Rank,
    pub home: Option<Position>,
    pub nickname: Option<String>,
    #[persist(default = "[]")]
    pub waypoints: Vec<Position>,
    #[persist(default = "[]")]
    pub badges: HashSet<String>,
    #[persist(default = "{}")]
    pub counters: BTreeMap<String, i64>,
    pub grid: [i32; 3],
    #[persist(skip)]
    pub session: Option<String>,
}

impl Player {
    pub fn sample(name: &str) -> Self {
        Self {
            name: name.to_string(),
            active: true,
            ratio: 0.75,
            level: 7,
            initial: 'q',
            big: u128::MAX - 1,
            rank: Rank::Officer,
            home: Some(Position { x: 1.5, y: -2.0 }),
            nickname: None,
            waypoints: vec![Position { x: 0.0, y: 0.0 }, Position { x: 3.0, y: 4.0 }],
            badges: ["gold", "early"].iter().map(|s| s.to_string()).collect(),
            counters: [("wins".to_string(), 3), ("losses".to_string(), -1)]
                .into_iter()
                .collect(),
            grid: [1, -2, 3],
            session: Some("not stored".to_string()),
        }
    }
}

/// Values at the edges of their numeric widths.
#[derive(Debug, Clone, PartialEq, Persist)]
pub struct Gauge {
    #[persist(id)]
    pub id: String,
    pub total: u64,
    pub index: usize,
    pub floor: i64,
    pub ceiling: i64,
    pub small: i8,
    pub reading: f64,
    pub peak: Option<u64>,
}

impl Gauge {
    pub fn extremes(id: &str) -> Self {
        Self {
            id: id.to_string(),
            total: u64::MAX,
            index: 1usize << 63,
            floor: i64::MIN,
            ceiling: i64::MAX,
            small: i8::MIN,
            reading: -1.0e22,
            peak: Some(u64::MAX - 1),
        }
    }
}

/// A single float, for the non-finite values not every store can hold.
#[derive(Debug, Clone, PartialEq, Persist)]
pub struct Reading {
    #[persist(id)]
    pub id: String,
    pub value: f64,
}

/// A type whose identifier can be missing.
#[derive(Debug, Clone, PartialEq, Persist)]
pub struct Ticket {
    #[persist(id)]
    pub id: Option<String>,
    pub label: String,
}

fn clear<E: strongbox_core::Entity>(engine: &StorageEngine, ids: &[&str]) {
    for id in ids {
        engine.delete_by_id_sync::<E>(id).unwrap();
    }
}

pub fn profile_round_trip(engine: &StorageEngine) {
    clear::<Profile>(engine, &["u1"]);
    let original = Profile::new("u1", 10, &["a", "b"]);

    engine.save_or_update_sync(&original).unwrap();
    let loaded: Option<Profile> = engine.load_by_id_sync("u1").unwrap();
    assert_eq!(loaded, Some(original));
}

pub fn every_field_class_round_trips(engine: &StorageEngine) {
    clear::<Player>(engine, &["ada"]);
    let original = Player::sample("ada");

    engine.save_or_update_sync(&original).unwrap();
    let loaded: Player = engine.load_by_id_sync("ada").unwrap().unwrap();
    assert_eq!(
        loaded,
        Player {
            session: None,
            ..original
        }
    );
}

pub fn second_save_replaces_first(engine: &StorageEngine) {
    clear::<Profile>(engine, &["u2"]);
    engine
        .save_or_update_sync(&Profile::new("u2", 1, &["x"]))
        .unwrap();
    engine
        .save_or_update_sync(&Profile::new("u2", 2, &[]))
        .unwrap();

    let matching: Vec<Profile> = engine
        .load_all_sync::<Profile>()
        .unwrap()
        .into_iter()
        .filter(|p| p.id == "u2")
        .collect();
    assert_eq!(matching, vec![Profile::new("u2", 2, &[])]);
}

pub fn missing_load_is_none(engine: &StorageEngine) {
    clear::<Profile>(engine, &["nobody"]);
    assert_eq!(engine.load_by_id_sync::<Profile>("nobody").unwrap(), None);
}

pub fn delete_removes_and_tolerates_absence(engine: &StorageEngine) {
    clear::<Profile>(engine, &["u3", "u4"]);
    engine
        .save_or_update_sync(&Profile::new("u3", 3, &[]))
        .unwrap();
    engine
        .save_or_update_sync(&Profile::new("u4", 4, &[]))
        .unwrap();

    engine.delete_by_id_sync::<Profile>("u3").unwrap();
    engine.delete_by_id_sync::<Profile>("u3").unwrap();

    assert_eq!(engine.load_by_id_sync::<Profile>("u3").unwrap(), None);
    assert_eq!(
        engine.load_by_id_sync::<Profile>("u4").unwrap(),
        Some(Profile::new("u4", 4, &[]))
    );
}

pub fn load_all_returns_every_object(engine: &StorageEngine) {
    clear::<Profile>(engine, &["all-a", "all-b", "all-c"]);
    for (id, points) in [("all-a", 1), ("all-b", 2), ("all-c", 3)] {
        engine
            .save_or_update_sync(&Profile::new(id, points, &[]))
            .unwrap();
    }

    let mut ours: Vec<Profile> = engine
        .load_all_sync::<Profile>()
        .unwrap()
        .into_iter()
        .filter(|p| p.id.starts_with("all-"))
        .collect();
    ours.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(
        ours.iter().map(|p| p.points).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

pub fn numeric_extremes_round_trip(engine: &StorageEngine) {
    clear::<Gauge>(engine, &["edge"]);
    let original = Gauge::extremes("edge");

    engine.save_or_update_sync(&original).unwrap();
    assert_eq!(engine.load_by_id_sync::<Gauge>("edge").unwrap(), Some(original));

    let small = Gauge {
        total: 0,
        index: 0,
        peak: None,
        ..Gauge::extremes("edge")
    };
    engine.save_or_update_sync(&small).unwrap();
    assert_eq!(engine.load_by_id_sync::<Gauge>("edge").unwrap(), Some(small));
}

pub fn infinities_round_trip(engine: &StorageEngine) {
    clear::<Reading>(engine, &["pos-inf", "neg-inf"]);
    for (id, value) in [("pos-inf", f64::INFINITY), ("neg-inf", f64::NEG_INFINITY)] {
        let original = Reading {
            id: id.to_string(),
            value,
        };
        engine.save_or_update_sync(&original).unwrap();
        assert_eq!(engine.load_by_id_sync::<Reading>(id).unwrap(), Some(original));
    }
}

pub fn nan_round_trips(engine: &StorageEngine) {
    clear::<Reading>(engine, &["nan"]);
    engine
        .save_or_update_sync(&Reading {
            id: "nan".to_string(),
            value: f64::NAN,
        })
        .unwrap();
    let loaded = engine.load_by_id_sync::<Reading>("nan").unwrap().unwrap();
    assert!(loaded.value.is_nan());
}

/// For stores that cannot hold `value`: the save fails and nothing is kept.
pub fn unstorable_float_is_refused(engine: &StorageEngine, value: f64) {
    clear::<Reading>(engine, &["refused"]);
    let result = engine.save_or_update_sync(&Reading {
        id: "refused".to_string(),
        value,
    });
    assert!(result.is_err());
    assert_eq!(engine.load_by_id_sync::<Reading>("refused").unwrap(), None);
}

pub fn dotted_identifier_round_trips(engine: &StorageEngine) {
    clear::<Profile>(engine, &["v1..rc"]);
    let original = Profile::new("v1..rc", 12, &[]);
    engine.save_or_update_sync(&original).unwrap();
    assert_eq!(engine.load_by_id_sync::<Profile>("v1..rc").unwrap(), Some(original));
}

pub fn null_identifier_is_rejected(engine: &StorageEngine) {
    let before = engine.load_all_sync::<Ticket>().unwrap().len();
    let err = engine
        .save_or_update_sync(&Ticket {
            id: None,
            label: "orphan".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingIdentifier { .. }));
    assert_eq!(engine.load_all_sync::<Ticket>().unwrap().len(), before);
}

/// Every synchronous check, in order.
pub fn run_contract(engine: &StorageEngine) {
    profile_round_trip(engine);
    every_field_class_round_trips(engine);
    second_save_replaces_first(engine);
    missing_load_is_none(engine);
    delete_removes_and_tolerates_absence(engine);
    load_all_returns_every_object(engine);
    numeric_extremes_round_trip(engine);
    dotted_identifier_round_trips(engine);
    null_identifier_is_rejected(engine);
}

/// The async forms against the same backend.
pub async fn run_async_contract(engine: &StorageEngine) {
    engine.delete_by_id_async::<Profile>("async-1").await.unwrap();

    engine
        .save_or_update_async(Profile::new("async-1", 5, &["a"]))
        .await
        .unwrap();
    let loaded: Option<Profile> = engine.load_by_id_async("async-1").await.unwrap();
    assert_eq!(loaded, Some(Profile::new("async-1", 5, &["a"])));

    let all: Vec<Profile> = engine.load_all_async().await.unwrap();
    assert!(all.iter().any(|p| p.id == "async-1"));

    engine.delete_by_id_async::<Profile>("async-1").await.unwrap();
    assert_eq!(
        engine.load_by_id_async::<Profile>("async-1").await.unwrap(),
        None
    );
}
