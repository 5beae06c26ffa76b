//! Per-member composite state and the merge rules that build it.
//!
//! Members send partial updates. A [`MemberState`] is the running result of
//! merging them: each update only overwrites the fields whose keys were in
//! its body ([`Patch::Present`] replaces, [`Patch::Null`] clears,
//! [`Patch::Absent`] keeps the stored value).
//!
//! Updates are merged in the order they are processed. Nothing here
//! detects reordered or duplicated delivery.

use partyline_payload::{
    BatchedUpdate, Color, Coordinate, ItemStack, LocationUpdate, Misc, Patch,
    RuneStack, Skill, StatusUpdate,
};
use serde::Serialize;
use serde_json::Value;

/// Everything known about one member.
///
/// Slots stay `None` until the first update of that kind arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberState {
    pub status: Option<Status>,
    pub location: Option<Location>,
    pub batched: Option<Batched>,
}

/// A current/max pair. Each half is stored independently so an update
/// carrying only one half never zeroes the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Vital {
    pub current: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub name: Option<String>,
    pub health: Option<Vital>,
    pub prayer: Option<Vital>,
    pub run_energy: Option<i64>,
    pub spec_energy: Option<i64>,
    pub vengeance_active: Option<bool>,
    pub member_color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Batched {
    pub inventory: Option<Vec<ItemStack>>,
    pub equipment: Option<Vec<ItemStack>>,
    pub skills: Option<Vec<Skill>>,
    pub misc: Option<Misc>,
    pub available_prayers: Option<Value>,
    pub enabled_prayers: Option<Value>,
    pub unlocked_prayers: Option<Value>,
    pub rune_pouch: Option<Vec<RuneStack>>,
    pub quiver: Option<Vec<ItemStack>>,
}

impl MemberState {
    pub fn merge_status(&mut self, update: StatusUpdate) {
        let status = self.status.get_or_insert_with(Status::default);
        update.type_name.apply_to(&mut status.type_name);
        update.name.apply_to(&mut status.name);
        merge_vital(&mut status.health, update.health_current, update.health_max);
        merge_vital(&mut status.prayer, update.prayer_current, update.prayer_max);
        update.run_energy.apply_to(&mut status.run_energy);
        update.spec_energy.apply_to(&mut status.spec_energy);
        update.vengeance_active.apply_to(&mut status.vengeance_active);
        update.member_color.apply_to(&mut status.member_color);
    }

    pub fn merge_location(&mut self, update: LocationUpdate) {
        let location = self.location.get_or_insert_with(Location::default);
        update.type_name.apply_to(&mut location.type_name);
        update.coordinate.apply_to(&mut location.coordinate);
    }

    pub fn merge_batched(&mut self, update: BatchedUpdate) {
        let batched = self.batched.get_or_insert_with(Batched::default);
        update.inventory.apply_to(&mut batched.inventory);
        update.equipment.apply_to(&mut batched.equipment);
        update.skills.apply_to(&mut batched.skills);
        update.misc.apply_to(&mut batched.misc);
        update.available_prayers.apply_to(&mut batched.available_prayers);
        update.enabled_prayers.apply_to(&mut batched.enabled_prayers);
        update.unlocked_prayers.apply_to(&mut batched.unlocked_prayers);
        update.rune_pouch.apply_to(&mut batched.rune_pouch);
        update.quiver.apply_to(&mut batched.quiver);
    }
}

/// Combines the halves present in an update with the stored ones. With
/// neither half present the stored vital is left exactly as it was.
fn merge_vital(slot: &mut Option<Vital>, current: Patch<i64>, max: Patch<i64>) {
    if current.is_absent() && max.is_absent() {
        return;
    }
    let vital = slot.get_or_insert_with(Vital::default);
    current.apply_to(&mut vital.current);
    max.apply_to(&mut vital.max);
}
