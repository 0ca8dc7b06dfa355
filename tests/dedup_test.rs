//! Applied-effect dedup across owners, riders, and registry deletion

mod harness;

use harness::{dummy, effect, fighter, wizard, Table};
use rulebook::combat::{ActorRole, Effect, Modification, ALLOW_DUPLICATES_TAG};
use rulebook::subevent::{AbilityCheck, Pipeline, SubeventCore, SubeventKind};
use rulebook::Subevent;
use serde_json::{json, Value};

fn bless(id: &str) -> Effect {
    effect(
        id,
        json!({"subevent": "ability_check"}),
        ActorRole::Any,
        vec![Modification::AddBonus { amount: 1 }],
    )
}

fn strength_check() -> Value {
    json!({"subevent": "ability_check", "ability": "str", "determined": [10]})
}

fn check(subevent: Subevent) -> AbilityCheck {
    match subevent {
        Subevent::AbilityCheck(c) => c,
        other => panic!("expected ability_check, got {}", other.kind()),
    }
}

#[test]
fn test_same_effect_id_applies_once() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let ally = table.add(wizard());
    let foe = table.add(dummy("foe"));
    table.attach(hero, bless("bless"));
    table.attach(ally, bless("bless"));

    let check = check(table.resolve(strength_check(), hero, foe));
    // 10 + str 3 + one bless
    assert_eq!(check.total(), 14);
    assert_eq!(check.core().applied_effects().len(), 1);
}

#[test]
fn test_allow_duplicates_applies_each_instance() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let ally = table.add(wizard());
    let foe = table.add(dummy("foe"));
    table.attach(hero, bless("hex").with_tag(ALLOW_DUPLICATES_TAG));
    table.attach(ally, bless("hex").with_tag(ALLOW_DUPLICATES_TAG));

    let check = check(table.resolve(strength_check(), hero, foe));
    assert_eq!(check.total(), 15);
    assert_eq!(check.core().applied_effects().len(), 2);
}

#[test]
fn test_dedup_is_per_subevent() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let foe = table.add(dummy("foe"));
    table.attach(hero, bless("bless"));

    let first = check(table.resolve(strength_check(), hero, foe));
    let second = check(table.resolve(strength_check(), hero, foe));
    assert_eq!(first.total(), 14);
    assert_eq!(second.total(), 14);
}

#[test]
fn test_dedup_survives_registry_deletion() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let first_uuid = table.attach(hero, bless("bless"));
    let first = table
        .encounter
        .registry
        .effect(first_uuid)
        .cloned()
        .expect("effect is registered");

    let mut core = SubeventCore::from_document(SubeventKind::AbilityCheck, strength_check())
        .expect("valid check document");
    core.record_effect(&first);

    table
        .encounter
        .registry
        .unregister_effect(first_uuid)
        .expect("effect is registered");
    assert!(table.encounter.registry.effect(first_uuid).is_none());

    let second_uuid = table.attach(hero, bless("bless"));
    assert_ne!(second_uuid, first_uuid);
    let second = table
        .encounter
        .registry
        .effect(second_uuid)
        .cloned()
        .expect("effect is registered");

    assert!(core.effect_already_applied(&first));
    assert!(core.effect_already_applied(&second));
}

#[test]
fn test_instance_identity_after_deletion() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let first_uuid = table.attach(hero, bless("hex").with_tag(ALLOW_DUPLICATES_TAG));
    let first = table
        .encounter
        .registry
        .unregister_effect(first_uuid)
        .expect("effect is registered");

    let mut core = SubeventCore::from_document(SubeventKind::AbilityCheck, strength_check())
        .expect("valid check document");
    core.record_effect(&first);

    // The registry never hands out the old uuid again
    let second_uuid = table.attach(hero, bless("hex").with_tag(ALLOW_DUPLICATES_TAG));
    let second = table
        .encounter
        .registry
        .effect(second_uuid)
        .cloned()
        .expect("effect is registered");
    assert!(core.effect_already_applied(&first));
    assert!(!core.effect_already_applied(&second));
}

#[test]
fn test_rider_cannot_retrigger_its_effect() {
    let mut table = Table::new();
    let cleric = table.add(wizard());
    let hero = table.add(fighter());
    table.object_mut(hero).health.current = 20;
    table.attach(
        hero,
        effect(
            "second_wind",
            json!({"subevent": "heal"}),
            ActorRole::Target,
            vec![Modification::InvokeSubevent {
                subevent: json!({"subevent": "heal", "healing": [{"bonus": 1}]}),
            }],
        ),
    );

    let heal = table.resolve(
        json!({"subevent": "heal", "healing": [{"bonus": 2}]}),
        cleric,
        hero,
    );
    assert_eq!(heal.core().nested().len(), 1);
    assert_eq!(heal.descendants().len(), 1);
    assert_eq!(table.health(hero), 23);
}

#[test]
fn test_actor_role_gates_effects() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let foe = table.add(dummy("foe"));
    table.attach(
        hero,
        effect(
            "dodge",
            json!({"subevent": "ability_check"}),
            ActorRole::Target,
            vec![Modification::AddBonus { amount: 5 }],
        ),
    );

    let check = check(table.resolve(strength_check(), hero, foe));
    assert_eq!(check.total(), 13);
    assert!(check.core().applied_effects().is_empty());
}

#[test]
fn test_effects_of_objects_out_of_context_are_ignored() {
    let mut table = Table::new();
    let hero = table.add(fighter());
    let foe = table.add(dummy("foe"));
    let bystander = table.encounter.registry.register_object(dummy("bystander"));
    table.attach(bystander, bless("bless"));

    let unaffected = check(table.resolve(strength_check(), hero, foe));
    assert_eq!(unaffected.total(), 13);

    table.encounter.context.add(bystander);
    let blessed = check(table.resolve(strength_check(), hero, foe));
    assert_eq!(blessed.total(), 14);
}
