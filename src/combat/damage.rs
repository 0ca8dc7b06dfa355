//! Typed dice entries for damage and healing
//!
//! The damage pipeline moves entries through three stages:
//! - Collection: per-type dice and bonus, merged by type
//! - Roll: every die gets a face; faces can be maximized, rerolled, or clamped
//! - Totals: each entry is scaled and reduced to one integer per type

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::dice::roll_die;

/// Key used for entries without a damage type
pub const UNTYPED: &str = "untyped";

/// Final integer amount per damage type
pub type DamageTotals = BTreeMap<String, i64>;

fn one() -> i64 {
    1
}

/// A rational multiplier with explicit rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScaleFields")]
pub struct Scale {
    pub numerator: i64,
    pub denominator: i64,
    pub round_up: bool,
}

/// Authored form of a [`Scale`], checked before use
#[derive(Deserialize)]
struct ScaleFields {
    numerator: i64,
    denominator: i64,
    #[serde(default)]
    round_up: bool,
}

impl TryFrom<ScaleFields> for Scale {
    type Error = String;

    fn try_from(fields: ScaleFields) -> Result<Self, Self::Error> {
        check_denominator(fields.denominator)?;
        Ok(Scale::new(fields.numerator, fields.denominator, fields.round_up))
    }
}

/// Reject fractions that cannot be applied
pub(crate) fn check_denominator(denominator: i64) -> Result<(), String> {
    if denominator == 0 {
        return Err("denominator must not be zero".to_string());
    }
    Ok(())
}

impl Scale {
    pub fn new(numerator: i64, denominator: i64, round_up: bool) -> Self {
        Self {
            numerator,
            denominator,
            round_up,
        }
    }

    /// Halve, rounding down unless `round_up`
    pub fn half(round_up: bool) -> Self {
        Self::new(1, 2, round_up)
    }

    /// Apply to an amount; a zero denominator scales to 0
    pub fn apply(&self, amount: i64) -> i64 {
        let scaled = amount * self.numerator;
        let denominator = self.denominator;
        if denominator == 0 {
            return 0;
        }
        if self.round_up {
            -((-scaled).div_euclid(denominator))
        } else {
            scaled.div_euclid(denominator)
        }
    }

    /// Combine two scales; the rounding of `other` wins
    pub fn then(&self, other: Scale) -> Scale {
        Scale::new(
            self.numerator * other.numerator,
            self.denominator * other.denominator,
            other.round_up,
        )
    }
}

/// One die (or a group of `count` identical dice before unpacking)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    pub size: i64,
    #[serde(default = "one")]
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<i64>,
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    pub determined: VecDeque<i64>,
}

impl Die {
    pub fn new(size: i64) -> Self {
        Self {
            size,
            count: 1,
            roll: None,
            determined: VecDeque::new(),
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn with_determined(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.determined = values.into_iter().collect();
        self
    }

    /// Split a group into single dice.
    ///
    /// Each die takes the next scripted value; leftovers stay with the last
    /// die so rerolls can still consume them. A preset `roll` is copied to
    /// every die, and a count of zero or less yields no dice.
    fn unpack(mut self) -> Vec<Die> {
        if self.count <= 0 {
            return Vec::new();
        }
        if self.count == 1 {
            return vec![self];
        }
        let mut dice: Vec<Die> = (0..self.count)
            .map(|_| {
                let mut die = Die::new(self.size);
                die.roll = self.roll;
                if let Some(value) = self.determined.pop_front() {
                    die.determined.push_back(value);
                }
                die
            })
            .collect();
        if let Some(last) = dice.last_mut() {
            last.determined.extend(self.determined.drain(..));
        }
        dice
    }

    fn roll_face(&mut self) -> i64 {
        let face = roll_die(self.size, &mut self.determined);
        self.roll = Some(face);
        face
    }
}

/// A typed group of dice plus a flat bonus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceEntry {
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<String>,
    #[serde(default)]
    pub dice: Vec<Die>,
    #[serde(default)]
    pub bonus: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
}

impl DiceEntry {
    pub fn new(damage_type: Option<&str>) -> Self {
        Self {
            damage_type: damage_type.map(str::to_string),
            dice: Vec::new(),
            bonus: 0,
            scale: None,
        }
    }

    pub fn with_die(mut self, die: Die) -> Self {
        self.dice.push(die);
        self
    }

    pub fn with_bonus(mut self, bonus: i64) -> Self {
        self.bonus = bonus;
        self
    }

    /// The type key used in totals
    pub fn type_key(&self) -> &str {
        self.damage_type.as_deref().unwrap_or(UNTYPED)
    }

    fn matches_type(&self, damage_type: Option<&str>) -> bool {
        damage_type.map_or(true, |t| self.type_key() == t)
    }

    /// Sum of rolled faces (unrolled dice count as 0)
    pub fn dice_total(&self) -> i64 {
        self.dice
            .iter()
            .map(|d| d.roll.unwrap_or(0) * d.count.max(0))
            .sum()
    }

    /// Scaled bonus + dice
    pub fn total(&self) -> i64 {
        let raw = self.bonus + self.dice_total();
        match self.scale {
            Some(scale) => scale.apply(raw),
            None => raw,
        }
    }
}

/// Collection stage: entries merged by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageCollection {
    entries: Vec<DiceEntry>,
}

impl DamageCollection {
    pub fn new(entries: impl IntoIterator<Item = DiceEntry>) -> Self {
        let mut collection = Self::default();
        for entry in entries {
            collection.add(entry);
        }
        collection
    }

    /// Merge an entry: an existing type gains its dice and bonus, a new type is appended
    pub fn add(&mut self, entry: DiceEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.damage_type == entry.damage_type)
        {
            Some(existing) => {
                existing.dice.extend(entry.dice);
                existing.bonus += entry.bonus;
            }
            None => self.entries.push(entry),
        }
    }

    /// Whether any entry carries the given type
    pub fn includes_type(&self, damage_type: &str) -> bool {
        self.entries.iter().any(|e| e.type_key() == damage_type)
    }

    /// Multiply every die group's count (critical hits)
    pub fn multiply_dice(&mut self, factor: i64) {
        for die in self.entries.iter_mut().flat_map(|e| e.dice.iter_mut()) {
            die.count *= factor;
        }
    }

    pub fn entries(&self) -> &[DiceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DiceEntry> {
        self.entries
    }
}

/// Roll stage: every die resolved to a face
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolledDamage {
    entries: Vec<DiceEntry>,
}

impl RolledDamage {
    /// Unpack and roll every die of a collection
    pub fn roll(collection: DamageCollection) -> Self {
        let mut entries = collection.into_entries();
        for entry in &mut entries {
            let dice = std::mem::take(&mut entry.dice);
            entry.dice = dice.into_iter().flat_map(Die::unpack).collect();
            for die in &mut entry.dice {
                if die.roll.is_none() {
                    die.roll_face();
                }
            }
        }
        Self { entries }
    }

    fn dice_mut<'a>(&'a mut self, damage_type: Option<&'a str>) -> impl Iterator<Item = &'a mut Die> + 'a {
        self.entries
            .iter_mut()
            .filter(move |e| e.matches_type(damage_type))
            .flat_map(|e| e.dice.iter_mut())
    }

    /// Set dice to their highest face, for one type or all
    pub fn maximize(&mut self, damage_type: Option<&str>) {
        for die in self.dice_mut(damage_type) {
            die.roll = Some(die.size);
        }
    }

    /// Reroll (once) every die at or below the threshold
    pub fn reroll_at_or_below(&mut self, threshold: i64, damage_type: Option<&str>) {
        for die in self.dice_mut(damage_type) {
            if die.roll.is_some_and(|r| r <= threshold) {
                die.roll_face();
            }
        }
    }

    /// Raise every die at or below the threshold to `set_to`
    pub fn clamp_at_or_below(&mut self, threshold: i64, set_to: i64, damage_type: Option<&str>) {
        for die in self.dice_mut(damage_type) {
            if die.roll.is_some_and(|r| r <= threshold) {
                die.roll = Some(set_to);
            }
        }
    }

    /// Compose an extra scale into every entry
    pub fn scale_all(&mut self, scale: Scale) {
        for entry in &mut self.entries {
            entry.scale = Some(match entry.scale {
                Some(existing) => existing.then(scale),
                None => scale,
            });
        }
    }

    pub fn entries(&self) -> &[DiceEntry] {
        &self.entries
    }

    /// Reduce to one total per type, merging same-type entries
    pub fn totals(&self) -> DamageTotals {
        let mut totals = DamageTotals::new();
        for entry in &self.entries {
            *totals.entry(entry.type_key().to_string()).or_insert(0) += entry.total();
        }
        totals
    }

    /// Sum across all types
    pub fn total(&self) -> i64 {
        self.entries.iter().map(DiceEntry::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fire(size: i64, count: i64, determined: &[i64], bonus: i64) -> DiceEntry {
        DiceEntry::new(Some("fire"))
            .with_die(
                Die::new(size)
                    .with_count(count)
                    .with_determined(determined.iter().copied()),
            )
            .with_bonus(bonus)
    }

    #[test]
    fn test_scale_rounding() {
        assert_eq!(Scale::half(false).apply(7), 3);
        assert_eq!(Scale::half(true).apply(7), 4);
        assert_eq!(Scale::half(true).apply(8), 4);
        assert_eq!(Scale::new(2, 1, false).apply(7), 14);
        assert_eq!(Scale::new(3, 0, false).apply(2), 0);
        assert_eq!(Scale::half(false).then(Scale::half(true)).apply(7), 2);
    }

    #[test]
    fn test_collection_merges_by_type() {
        let mut collection = DamageCollection::new([fire(6, 1, &[], 2)]);
        collection.add(fire(4, 2, &[], 1));
        collection.add(DiceEntry::new(Some("cold")).with_bonus(5));

        assert_eq!(collection.entries().len(), 2);
        assert_eq!(collection.entries()[0].dice.len(), 2);
        assert_eq!(collection.entries()[0].bonus, 3);
        assert!(collection.includes_type("cold"));
        assert!(!collection.includes_type("acid"));
    }

    #[test]
    fn test_roll_consumes_determined_values() {
        let collection = DamageCollection::new([fire(6, 3, &[1, 2, 3], 1)]);
        let rolled = RolledDamage::roll(collection);
        assert_eq!(rolled.entries()[0].dice.len(), 3);
        assert_eq!(rolled.total(), 7);
        assert_eq!(rolled.totals().get("fire"), Some(&7));
    }

    #[test]
    fn test_leftover_values_feed_rerolls() {
        let collection = DamageCollection::new([fire(6, 2, &[4, 1, 5], 0)]);
        let mut rolled = RolledDamage::roll(collection);
        assert_eq!(rolled.total(), 5);
        rolled.reroll_at_or_below(1, None);
        assert_eq!(rolled.total(), 9);
    }

    #[test]
    fn test_maximize_by_type() {
        let collection = DamageCollection::new([
            fire(6, 2, &[1, 1], 0),
            DiceEntry::new(Some("cold")).with_die(Die::new(8).with_determined([2])),
        ]);
        let mut rolled = RolledDamage::roll(collection);
        rolled.maximize(Some("fire"));
        let totals = rolled.totals();
        assert_eq!(totals["fire"], 12);
        assert_eq!(totals["cold"], 2);

        rolled.maximize(None);
        assert_eq!(rolled.totals()["cold"], 8);
    }

    #[test]
    fn test_clamp_low_dice() {
        let collection = DamageCollection::new([fire(6, 3, &[1, 2, 6], 0)]);
        let mut rolled = RolledDamage::roll(collection);
        rolled.clamp_at_or_below(2, 3, Some("fire"));
        assert_eq!(rolled.total(), 12);
    }

    #[test]
    fn test_scaled_entries_and_merged_totals() {
        let mut halved = fire(6, 1, &[5], 0);
        halved.scale = Some(Scale::half(true));
        let collection = DamageCollection::new([halved]);
        let mut rolled = RolledDamage::roll(collection);
        // added after the collection merge, so it stays a separate entry
        rolled.entries.push(DiceEntry::new(Some("fire")).with_bonus(2));
        assert_eq!(rolled.totals()["fire"], 3 + 2);
    }

    #[test]
    fn test_untyped_key() {
        let entry = DiceEntry::new(None).with_bonus(4);
        let rolled = RolledDamage::roll(DamageCollection::new([entry]));
        assert_eq!(rolled.totals()[UNTYPED], 4);
    }

    #[test]
    fn test_zero_count_rolls_no_dice() {
        let entry = DiceEntry::new(Some("fire"))
            .with_die(Die::new(6).with_count(0).with_determined([5]))
            .with_die(Die::new(6).with_count(-2).with_determined([4]));
        let rolled = RolledDamage::roll(DamageCollection::new([entry]));
        assert!(rolled.entries()[0].dice.is_empty());
        assert_eq!(rolled.total(), 0);

        let unrolled = DiceEntry::new(None).with_die(Die {
            roll: Some(3),
            ..Die::new(4).with_count(0)
        });
        assert_eq!(unrolled.dice_total(), 0);
    }

    #[test]
    fn test_preset_roll_survives_unpacking() {
        let preset = Die {
            roll: Some(4),
            ..Die::new(6)
        };
        let mut collection =
            DamageCollection::new([DiceEntry::new(Some("fire")).with_die(preset.clone())]);
        collection.multiply_dice(2);
        let rolled = RolledDamage::roll(collection);
        assert_eq!(rolled.entries()[0].dice.len(), 2);
        assert_eq!(rolled.total(), 8);

        let group = DiceEntry::new(None).with_die(preset.with_count(3));
        assert_eq!(RolledDamage::roll(DamageCollection::new([group])).total(), 12);
    }

    #[test]
    fn test_zero_denominator_is_rejected() {
        let bad = serde_json::from_value::<Scale>(json!({"numerator": 1, "denominator": 0}));
        assert!(bad.is_err());

        let entry = serde_json::from_value::<DiceEntry>(json!({
            "damage_type": "fire",
            "bonus": 6,
            "scale": {"numerator": 1, "denominator": 0}
        }));
        assert!(entry.is_err());

        let ok: Scale =
            serde_json::from_value(json!({"numerator": 1, "denominator": 2})).unwrap();
        assert_eq!(ok, Scale::half(false));
    }

    #[test]
    fn test_multiply_dice_for_critical() {
        let mut collection = DamageCollection::new([fire(6, 2, &[1, 2, 3, 4], 1)]);
        collection.multiply_dice(2);
        let rolled = RolledDamage::roll(collection);
        assert_eq!(rolled.entries()[0].dice.len(), 4);
        assert_eq!(rolled.total(), 11);
    }

    #[test]
    fn test_entry_type_alias() {
        let entry: DiceEntry =
            serde_json::from_value(serde_json::json!({"type": "acid", "bonus": 2})).unwrap();
        assert_eq!(entry.type_key(), "acid");
        assert!(entry.dice.is_empty());
    }
}
