// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for stored-document decoding and reconstruction.
// Run with: cargo +nightly fuzz run fuzz_record_decode
//
// Arbitrary bytes are decoded as a JSON and a YAML document, and anything
// that decodes is handed to the unmarshaler. Every step may fail; none may
// panic.

#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use strongbox_core::{unmarshal, Persist};
use strongbox_storage::{Codec, JsonCodec, YamlCodec};

#[derive(Debug, Clone, Copy, Persist)]
enum Rank {
    Member,
    Admin,
}

#[derive(Debug, Persist)]
struct Position {
    x: f64,
    y: f32,
}

#[derive(Debug, Persist)]
struct Profile {
    #[persist(id)]
    id: u32,
    #[persist(default = "0")]
    points: i8,
    #[persist(default = "Member")]
    rank: Rank,
    home: Option<Position>,
    #[persist(default = "[]")]
    route: Vec<Position>,
    grid: Option<[u8; 2]>,
    initial: Option<char>,
    big: Option<u128>,
    #[persist(default = "{}")]
    counters: BTreeMap<String, u16>,
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    for record in [JsonCodec::decode(data), YamlCodec::decode(data)]
        .into_iter()
        .flatten()
    {
        let _ = unmarshal::<Profile>(record.clone(), "42");
        let _ = unmarshal::<Profile>(record, "not-a-number");
    }
});
