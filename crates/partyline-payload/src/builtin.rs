//! The three payload types every registry understands.
//!
//! Each comes in two forms: a `Raw*` record that mirrors the body's short
//! JSON keys and is what validation deserializes into, and a transformed
//! update with descriptive field names and decoded domain values. Every
//! field of both is a [`Patch`], so the merge step can tell "key missing"
//! from "key set to null".

use serde::Deserialize;
use serde_json::Value;

use crate::parse::{
    RawMisc, RawSkill, chunk_pairs, decode_color, decode_coordinate, decode_misc,
    decode_skills, unpack_rune_pouch,
};
use crate::types::{Color, Coordinate, ItemStack, Misc, RuneStack, Skill};
use crate::{Patch, Payload};

/// Type name of member status (health, prayer, energy, color).
pub const STATUS_UPDATE: &str = "StatusUpdate";
/// Type name of member location.
pub const LOCATION_UPDATE: &str = "LocationUpdate";
/// Type name of the batched inventory/skills/misc update.
pub const PARTY_BATCHED_CHANGE: &str = "PartyBatchedChange";

// ---------------------------------------------------------------------------
// StatusUpdate
// ---------------------------------------------------------------------------

/// `StatusUpdate` body as sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStatusUpdate {
    #[serde(rename = "type")]
    pub type_name: Patch<String>,
    /// Name.
    pub n: Patch<String>,
    /// Current health.
    pub hc: Patch<i64>,
    /// Max health.
    pub hm: Patch<i64>,
    /// Current prayer.
    pub pc: Patch<i64>,
    /// Max prayer.
    pub pm: Patch<i64>,
    /// Run energy.
    pub r: Patch<i64>,
    /// Special attack energy.
    pub s: Patch<i64>,
    /// Vengeance active.
    pub v: Patch<bool>,
    /// Member color, `#AARRGGBB`.
    pub c: Patch<String>,
}

/// A partial status update.
///
/// Health and prayer stay split into halves here; the merge combines each
/// half with whatever is already stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub type_name: Patch<String>,
    pub name: Patch<String>,
    pub health_current: Patch<i64>,
    pub health_max: Patch<i64>,
    pub prayer_current: Patch<i64>,
    pub prayer_max: Patch<i64>,
    pub run_energy: Patch<i64>,
    pub spec_energy: Patch<i64>,
    pub vengeance_active: Patch<bool>,
    /// A malformed color string is treated as if the key were missing.
    pub member_color: Patch<Color>,
}

impl From<RawStatusUpdate> for StatusUpdate {
    fn from(raw: RawStatusUpdate) -> Self {
        Self {
            type_name: raw.type_name,
            name: raw.n,
            health_current: raw.hc,
            health_max: raw.hm,
            prayer_current: raw.pc,
            prayer_max: raw.pm,
            run_energy: raw.r,
            spec_energy: raw.s,
            vengeance_active: raw.v,
            member_color: raw
                .c
                .and_then(|text| decode_color(&text).map_or(Patch::Absent, Patch::Present)),
        }
    }
}

impl From<RawStatusUpdate> for Payload {
    fn from(raw: RawStatusUpdate) -> Self {
        Payload::Status(raw.into())
    }
}

// ---------------------------------------------------------------------------
// LocationUpdate
// ---------------------------------------------------------------------------

/// `LocationUpdate` body as sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLocationUpdate {
    #[serde(rename = "type")]
    pub type_name: Patch<String>,
    /// Packed coordinate.
    pub c: Patch<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationUpdate {
    pub type_name: Patch<String>,
    pub coordinate: Patch<Coordinate>,
}

impl From<RawLocationUpdate> for Payload {
    fn from(raw: RawLocationUpdate) -> Self {
        Payload::Location(LocationUpdate {
            type_name: raw.type_name,
            coordinate: raw.c.map(decode_coordinate),
        })
    }
}

// ---------------------------------------------------------------------------
// PartyBatchedChange
// ---------------------------------------------------------------------------

/// `PartyBatchedChange` body as sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBatchedChange {
    /// Inventory, flat id/qty pairs.
    pub i: Patch<Vec<i64>>,
    /// Equipment, flat id/qty pairs.
    pub e: Patch<Vec<i64>>,
    pub s: Patch<Vec<RawSkill>>,
    pub m: Patch<Vec<RawMisc>>,
    /// Prayer bitmasks, passed through untouched.
    pub ap: Patch<Value>,
    pub ep: Patch<Value>,
    pub up: Patch<Value>,
    /// Rune pouch, packed slots.
    pub rp: Patch<Vec<i64>>,
    /// Quiver, flat id/qty pairs.
    pub q: Patch<Vec<i64>>,
}

/// A partial batched update. Each facet is replaced wholesale when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchedUpdate {
    pub inventory: Patch<Vec<ItemStack>>,
    pub equipment: Patch<Vec<ItemStack>>,
    pub skills: Patch<Vec<Skill>>,
    pub misc: Patch<Misc>,
    pub available_prayers: Patch<Value>,
    pub enabled_prayers: Patch<Value>,
    pub unlocked_prayers: Patch<Value>,
    pub rune_pouch: Patch<Vec<RuneStack>>,
    pub quiver: Patch<Vec<ItemStack>>,
}

impl From<RawBatchedChange> for Payload {
    fn from(raw: RawBatchedChange) -> Self {
        Payload::Batched(BatchedUpdate {
            inventory: raw.i.map(|flat| chunk_pairs(&flat)),
            equipment: raw.e.map(|flat| chunk_pairs(&flat)),
            skills: raw.s.map(|entries| decode_skills(&entries)),
            misc: raw.m.map(decode_misc),
            available_prayers: raw.ap,
            enabled_prayers: raw.ep,
            unlocked_prayers: raw.up,
            rune_pouch: raw.rp.map(|packed| unpack_rune_pouch(&packed)),
            quiver: raw.q.map(|flat| chunk_pairs(&flat)),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(body: Value) -> StatusUpdate {
        serde_json::from_value::<RawStatusUpdate>(body).unwrap().into()
    }

    #[test]
    fn test_status_update_maps_short_keys() {
        let update = status(json!({
            "type": "StatusUpdate",
            "n": "Zezima",
            "hc": 50,
            "hm": 99,
            "v": true,
            "c": "#80ff0000"
        }));
        assert_eq!(update.name, Patch::Present("Zezima".into()));
        assert_eq!(update.health_current, Patch::Present(50));
        assert_eq!(update.health_max, Patch::Present(99));
        assert_eq!(update.vengeance_active, Patch::Present(true));
        assert_eq!(
            update.member_color,
            Patch::Present(Color { r: 255, g: 0, b: 0, a: 128 })
        );
        assert!(update.prayer_current.is_absent());
        assert!(update.run_energy.is_absent());
    }

    #[test]
    fn test_status_update_malformed_color_is_absent() {
        assert!(status(json!({"c": "red"})).member_color.is_absent());
        assert_eq!(status(json!({"c": null})).member_color, Patch::Null);
    }

    #[test]
    fn test_status_update_ignores_unknown_keys() {
        let update = status(json!({"hc": 1, "zz": "?"}));
        assert_eq!(update.health_current, Patch::Present(1));
    }

    #[test]
    fn test_location_update_decodes_coordinate() {
        let raw: RawLocationUpdate =
            serde_json::from_value(json!({"c": (3200 << 14) | 3216})).unwrap();
        let Payload::Location(update) = Payload::from(raw) else {
            panic!("expected a location payload");
        };
        let coordinate = match update.coordinate {
            Patch::Present(coordinate) => coordinate,
            other => panic!("expected a coordinate, got {other:?}"),
        };
        assert_eq!((coordinate.x, coordinate.y, coordinate.plane), (3200, 3216, 0));
        assert!(update.type_name.is_absent());
    }

    #[test]
    fn test_batched_change_decodes_each_facet() {
        let raw: RawBatchedChange = serde_json::from_value(json!({
            "i": [4151, 1, 995],
            "rp": [(4321 << 18) | 554],
            "s": [{"s": 0, "l": 99, "b": 112}],
            "ap": [1, 2],
            "up": null
        }))
        .unwrap();
        let Payload::Batched(update) = Payload::from(raw) else {
            panic!("expected a batched payload");
        };
        assert_eq!(
            update.inventory,
            Patch::Present(vec![
                ItemStack { id: 4151, qty: 1 },
                ItemStack { id: 995, qty: 0 },
            ])
        );
        assert_eq!(
            update.rune_pouch,
            Patch::Present(vec![RuneStack { id: 554, qty: 4321 }])
        );
        match &update.skills {
            Patch::Present(skills) => assert_eq!(skills[0].name, "Attack"),
            other => panic!("expected skills, got {other:?}"),
        }
        assert_eq!(update.available_prayers, Patch::Present(json!([1, 2])));
        assert_eq!(update.unlocked_prayers, Patch::Null);
        assert!(update.equipment.is_absent());
        assert!(update.misc.is_absent());
    }
}
