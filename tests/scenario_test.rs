//! Scenario files resolved end to end

use std::io::Write;

use rulebook::document::DocumentExt;
use rulebook::{EngineConfig, Scenario, ScenarioError, Subevent};

const DUEL: &str = r#"{
    "objects": [
        {
            "id": "knight",
            "health": {"current": 30, "maximum": 30},
            "abilities": {"str": 16, "dex": 10},
            "proficiencies": ["athletics"],
            "base_armor_class": 18
        },
        {
            "id": "vampire",
            "health": {"current": 12, "maximum": 40},
            "abilities": {"str": 18, "dex": 14},
            "affinities": {"necrotic": {"resistance": true}}
        }
    ],
    "effects": [
        {
            "owner": "vampire",
            "id": "bite",
            "triggers": [{
                "filter": {"subevent": "attack_roll"},
                "actor": "source",
                "modifications": [
                    {"modification": "vampirism", "numerator": 1, "denominator": 1}
                ]
            }]
        }
    ],
    "subevents": [
        {"source": "vampire", "target": "knight", "subevent": {
            "subevent": "attack_roll",
            "attack_ability": "str",
            "proficient": true,
            "determined": [16],
            "damage": [{"damage_type": "necrotic", "dice": [{"size": 6, "determined": [3]}]}]
        }},
        {"source": "knight", "target": "vampire", "subevent": {
            "subevent": "deal_damage",
            "damage": [{"damage_type": "necrotic", "bonus": 9}]
        }}
    ]
}"#;

#[test]
fn test_duel_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(DUEL.as_bytes()).expect("write scenario");

    let scenario = Scenario::from_file(file.path()).expect("scenario parses");
    let mut encounter = scenario.load().expect("scenario loads");
    let resolved = encounter
        .run(&EngineConfig::default(), &scenario.subevents)
        .expect("scenario resolves");
    assert_eq!(resolved.len(), 2);

    // 16 + str 4 + proficiency 2 = 22 against 18; 3 + str 4 necrotic
    match &resolved[0] {
        Subevent::AttackRoll(attack) => {
            assert_eq!(attack.hit(), Some(true));
            assert_eq!(attack.outcome().map(|o| o.vampiric_healing), Some(7));
        }
        other => panic!("expected attack_roll, got {}", other.kind()),
    }
    assert_eq!(encounter.object("knight").expect("knight").health.current, 23);

    // 12 + 7 healed, then 9 necrotic halved to 4
    assert_eq!(encounter.object("vampire").expect("vampire").health.current, 15);

    let state = encounter.state().expect("state");
    assert_eq!(
        state.seek("objects[{\"id\":\"knight\"}].health.current").expect("knight health"),
        &serde_json::json!(23)
    );
}

#[test]
fn test_missing_file() {
    let err = Scenario::from_file(std::path::Path::new("/nonexistent/duel.json")).unwrap_err();
    assert!(matches!(err, ScenarioError::Io { .. }));
}

#[test]
fn test_failed_step_reports_its_index() {
    let scenario = Scenario::from_json(
        r#"{
            "objects": [{"id": "a", "health": {"current": 5, "maximum": 5}}],
            "subevents": [
                {"source": "a", "target": "a", "subevent": {"subevent": "heal"}},
                {"source": "a", "target": "a", "subevent": {"subevent": "armor_class"}}
            ]
        }"#,
    )
    .expect("scenario parses");
    let mut encounter = scenario.load().expect("scenario loads");
    let err = encounter
        .run(&EngineConfig::default(), &scenario.subevents)
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Step { step: 1, .. }));
}
