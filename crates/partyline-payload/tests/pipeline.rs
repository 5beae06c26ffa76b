//! End-to-end runs of realistic bodies through the default registry.

use partyline_payload::{
    Color, ItemStack, PARTY_BATCHED_CHANGE, Patch, Payload, PayloadRegistry,
    PipelineError, RuneStack, STATUS_UPDATE,
};
use serde_json::{Value, json};

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn test_batched_body_from_text_decodes_every_facet() {
    let body = parse(
        r##"{
            "i": [4151, 1, 995, 10000],
            "e": [11832, 1],
            "q": [892],
            "rp": [1132986922],
            "s": [{"s": 3, "l": 99, "b": 90}, {"s": 99, "l": 5}],
            "m": [{"t": "U", "s": "Lynx Titan"}, {"t": "W", "v": 420}, {"t": "X", "v": true}],
            "ep": 5,
            "future": "ignored"
        }"##,
    );

    let Payload::Batched(update) = PayloadRegistry::new()
        .process(PARTY_BATCHED_CHANGE, &body)
        .unwrap()
    else {
        panic!("expected a batched payload");
    };

    assert_eq!(
        update.inventory,
        Patch::Present(vec![
            ItemStack { id: 4151, qty: 1 },
            ItemStack { id: 995, qty: 10000 },
        ])
    );
    assert_eq!(update.quiver, Patch::Present(vec![ItemStack { id: 892, qty: 0 }]));
    // (4322 << 18) | 554
    assert_eq!(
        update.rune_pouch,
        Patch::Present(vec![RuneStack { id: 554, qty: 4322 }])
    );

    let Patch::Present(skills) = &update.skills else {
        panic!("expected skills");
    };
    assert_eq!(skills[0].name, "Hitpoints");
    assert_eq!(skills[0].boosted_level, 90);
    assert_eq!(skills[1].name, "skill#99");

    let Patch::Present(misc) = &update.misc else {
        panic!("expected misc");
    };
    assert_eq!(misc.username.as_deref(), Some("Lynx Titan"));
    assert_eq!(misc.world, Some(420));
    assert_eq!(misc.raw["X"], json!(true));

    assert_eq!(update.enabled_prayers, Patch::Present(json!(5)));
    assert!(update.available_prayers.is_absent());
}

#[test]
fn test_batched_body_negative_skill_ordinal_keeps_other_facets() {
    let body = json!({"i": [4151, 1], "s": [{"s": -1, "l": 1}]});

    let Payload::Batched(update) = PayloadRegistry::new()
        .process(PARTY_BATCHED_CHANGE, &body)
        .unwrap()
    else {
        panic!("expected a batched payload");
    };

    assert_eq!(update.inventory, Patch::Present(vec![ItemStack { id: 4151, qty: 1 }]));
    let Patch::Present(skills) = &update.skills else {
        panic!("expected skills");
    };
    assert_eq!(skills[0].ordinal, -1);
    assert_eq!(skills[0].name, "skill#-1");
    assert_eq!(skills[0].boosted_level, 1);
}

#[test]
fn test_status_body_keeps_key_presence() {
    let body = parse(r##"{"type": "StatusUpdate", "hm": 99, "pc": null, "c": "#ff00ff00"}"##);

    let Payload::Status(update) = PayloadRegistry::new().process(STATUS_UPDATE, &body).unwrap()
    else {
        panic!("expected a status payload");
    };

    assert!(update.health_current.is_absent());
    assert_eq!(update.health_max, Patch::Present(99));
    assert_eq!(update.prayer_current, Patch::Null);
    assert_eq!(
        update.member_color,
        Patch::Present(Color { r: 0, g: 255, b: 0, a: 255 })
    );
}

#[test]
fn test_batched_body_with_bad_skill_entry_is_rejected() {
    let body = json!({"s": [{"l": 99}]});
    let err = PayloadRegistry::new()
        .process(PARTY_BATCHED_CHANGE, &body)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Validation { ref type_name, .. } if type_name == PARTY_BATCHED_CHANGE
    ));
}
