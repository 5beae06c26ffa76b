//! Decoded domain values carried by payloads.
//!
//! All of these serialize to camelCase JSON so member state can be handed
//! to a UI as-is.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// One inventory, equipment, or quiver slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub id: i64,
    pub qty: i64,
}

/// One rune pouch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuneStack {
    pub id: i64,
    pub qty: i64,
}

/// A skill with its real and boosted level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub ordinal: i64,
    pub name: String,
    pub level: i64,
    pub boosted_level: i64,
}

/// A packed world coordinate and its unpacked parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coordinate {
    pub encoded: i32,
    pub x: u16,
    pub y: u16,
    pub plane: u8,
}

/// An RGBA color, each channel 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Miscellaneous member facts.
///
/// `raw` holds every code the sender used and is the authoritative form.
/// The named fields are a best-effort reading of the codes known today;
/// they are `None` when the code is missing or its value has an
/// unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Misc {
    pub raw: BTreeMap<String, Value>,
    pub username: Option<String>,
    pub world: Option<i64>,
    pub combat_level: Option<i64>,
    pub total_level: Option<i64>,
}
