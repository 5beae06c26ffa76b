//! Bit-level and list decoders for payload fields.
//!
//! Pure functions, no I/O. The raw entry types ([`RawSkill`], [`RawMisc`])
//! are the shapes found inside `PartyBatchedChange` bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{Color, Coordinate, ItemStack, Misc, RuneStack, Skill};

/// Skill names in ordinal order.
pub const SKILL_NAMES: [&str; 24] = [
    "Attack",
    "Defence",
    "Strength",
    "Hitpoints",
    "Ranged",
    "Prayer",
    "Magic",
    "Cooking",
    "Woodcutting",
    "Fletching",
    "Fishing",
    "Firemaking",
    "Crafting",
    "Smithing",
    "Mining",
    "Herblore",
    "Agility",
    "Thieving",
    "Slayer",
    "Farming",
    "Runecraft",
    "Hunter",
    "Construction",
    "Sailing",
];

const RUNE_ID_MASK: i64 = 0x3FFFF;
const RUNE_QTY_SHIFT: u32 = 18;

const COORD_AXIS_MASK: i32 = 0x3FFF;
const COORD_X_SHIFT: u32 = 14;
const COORD_PLANE_SHIFT: u32 = 28;
const COORD_PLANE_MASK: i32 = 0x3;

/// Misc codes with a known meaning.
pub mod misc_codes {
    pub const USERNAME: &str = "U";
    pub const WORLD: &str = "W";
    pub const COMBAT_LEVEL: &str = "C";
    pub const TOTAL_LEVEL: &str = "T";
}

/// A skill entry as sent: `{s: ordinal, l: level, b: boosted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawSkill {
    pub s: i64,
    pub l: i64,
    /// Missing means not boosted.
    #[serde(default)]
    pub b: Option<i64>,
}

/// A misc entry as sent: `{t: code, v: value}` or `{t: code, s: value}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMisc {
    pub t: String,
    #[serde(default)]
    pub v: Option<Value>,
    #[serde(default)]
    pub s: Option<Value>,
}

/// Pairs a flat `[id, qty, id, qty, ...]` list into stacks. A trailing id
/// without a quantity gets `qty = 0`.
pub fn chunk_pairs(flat: &[i64]) -> Vec<ItemStack> {
    flat.chunks(2)
        .map(|pair| ItemStack {
            id: pair[0],
            qty: pair.get(1).copied().unwrap_or(0),
        })
        .collect()
}

/// Unpacks one rune pouch slot: low 18 bits are the id, the rest the
/// quantity.
pub fn unpack_rune(packed: i64) -> RuneStack {
    RuneStack {
        id: packed & RUNE_ID_MASK,
        qty: packed >> RUNE_QTY_SHIFT,
    }
}

pub fn unpack_rune_pouch(packed: &[i64]) -> Vec<RuneStack> {
    packed.iter().copied().map(unpack_rune).collect()
}

/// Name for a skill ordinal; unknown ordinals become `skill#<n>`.
pub fn skill_name(ordinal: i64) -> String {
    usize::try_from(ordinal)
        .ok()
        .and_then(|i| SKILL_NAMES.get(i))
        .map_or_else(|| format!("skill#{ordinal}"), |name| (*name).to_string())
}

pub fn decode_skills(entries: &[RawSkill]) -> Vec<Skill> {
    entries
        .iter()
        .map(|entry| Skill {
            ordinal: entry.s,
            name: skill_name(entry.s),
            level: entry.l,
            boosted_level: entry.b.unwrap_or(entry.l),
        })
        .collect()
}

/// Splits a packed coordinate into x (bits 14-27), y (bits 0-13) and
/// plane (bits 28-29).
pub fn decode_coordinate(encoded: i32) -> Coordinate {
    Coordinate {
        encoded,
        x: ((encoded >> COORD_X_SHIFT) & COORD_AXIS_MASK) as u16,
        y: (encoded & COORD_AXIS_MASK) as u16,
        plane: ((encoded >> COORD_PLANE_SHIFT) & COORD_PLANE_MASK) as u8,
    }
}

/// Inverse of [`decode_coordinate`]. Out-of-range parts are masked.
pub fn encode_coordinate(x: u16, y: u16, plane: u8) -> i32 {
    ((i32::from(plane) & COORD_PLANE_MASK) << COORD_PLANE_SHIFT)
        | ((i32::from(x) & COORD_AXIS_MASK) << COORD_X_SHIFT)
        | (i32::from(y) & COORD_AXIS_MASK)
}

/// Parses `#AARRGGBB`. Anything else, including `#RRGGBB`, is `None`.
pub fn decode_color(text: &str) -> Option<Color> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color {
        a: channel(0)?,
        r: channel(2)?,
        g: channel(4)?,
        b: channel(6)?,
    })
}

/// Folds misc entries into a [`Misc`]. Later entries for the same code
/// win; `v` is preferred over `s`, and an entry with neither stores
/// `null`.
pub fn decode_misc(entries: Vec<RawMisc>) -> Misc {
    let raw: BTreeMap<String, Value> = entries
        .into_iter()
        .map(|entry| {
            let value = entry.v.or(entry.s).unwrap_or(Value::Null);
            (entry.t, value)
        })
        .collect();

    let int = |code: &str| raw.get(code).and_then(as_int);
    Misc {
        username: raw
            .get(misc_codes::USERNAME)
            .and_then(Value::as_str)
            .map(str::to_owned),
        world: int(misc_codes::WORLD),
        combat_level: int(misc_codes::COMBAT_LEVEL),
        total_level: int(misc_codes::TOTAL_LEVEL),
        raw,
    }
}

/// Integers sometimes arrive as strings.
fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
