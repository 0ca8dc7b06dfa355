//! Vampiric healing rider for damage-dealing subevents

use serde::{Deserialize, Serialize};

use super::damage::{check_denominator, DamageTotals, Scale};

/// Converts a fraction of damage dealt into healing for the damage's source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VampirismFields")]
pub struct Vampirism {
    pub numerator: i64,
    pub denominator: i64,
    pub round_up: bool,
    /// Only this type's damage counts; all types when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<String>,
}

#[derive(Deserialize)]
struct VampirismFields {
    numerator: i64,
    denominator: i64,
    #[serde(default)]
    round_up: bool,
    #[serde(default)]
    damage_type: Option<String>,
}

impl TryFrom<VampirismFields> for Vampirism {
    type Error = String;

    fn try_from(fields: VampirismFields) -> Result<Self, Self::Error> {
        check_denominator(fields.denominator)?;
        Ok(Self {
            numerator: fields.numerator,
            denominator: fields.denominator,
            round_up: fields.round_up,
            damage_type: fields.damage_type,
        })
    }
}

impl Vampirism {
    pub fn new(numerator: i64, denominator: i64, round_up: bool) -> Self {
        Self {
            numerator,
            denominator,
            round_up,
            damage_type: None,
        }
    }

    pub fn for_type(mut self, damage_type: &str) -> Self {
        self.damage_type = Some(damage_type.to_string());
        self
    }

    pub fn scale(&self) -> Scale {
        Scale::new(self.numerator, self.denominator, self.round_up)
    }

    /// Healing owed to the source, computed from pre-affinity totals
    pub fn healing(&self, pre_affinity: &DamageTotals) -> i64 {
        let damage = match &self.damage_type {
            Some(t) => pre_affinity.get(t).copied().unwrap_or(0),
            None => pre_affinity.values().sum(),
        };
        self.scale().apply(damage).max(0)
    }
}

/// Subevents that can carry a vampirism rider
pub trait HasVampirism {
    fn vampirism(&self) -> Option<&Vampirism>;

    fn set_vampirism(&mut self, vampirism: Vampirism);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn totals() -> DamageTotals {
        DamageTotals::from([("necrotic".to_string(), 9), ("slashing".to_string(), 4)])
    }

    #[test]
    fn test_all_types() {
        assert_eq!(Vampirism::new(1, 2, false).healing(&totals()), 6);
        assert_eq!(Vampirism::new(1, 2, true).healing(&totals()), 7);
    }

    #[test]
    fn test_zero_denominator_is_rejected() {
        let bad = serde_json::from_value::<Vampirism>(
            json!({"numerator": 1, "denominator": 0, "damage_type": "necrotic"}),
        );
        assert!(bad.is_err());

        let rider: Vampirism =
            serde_json::from_value(json!({"numerator": 1, "denominator": 2})).unwrap();
        assert_eq!(rider, Vampirism::new(1, 2, false));
    }

    #[test]
    fn test_single_type() {
        let vampirism = Vampirism::new(1, 2, true).for_type("necrotic");
        assert_eq!(vampirism.healing(&totals()), 5);

        let missing = Vampirism::new(1, 1, false).for_type("fire");
        assert_eq!(missing.healing(&totals()), 0);
    }
}
