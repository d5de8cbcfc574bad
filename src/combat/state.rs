//! Combatant state tracking
//!
//! Health pools and static attack/defense values for both sides of an
//! encounter, plus the result of a single attack roll.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dice::DiceSpec;
use super::formula::Difficulty;

/// Character attribute names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl FromStr for Attribute {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strength" | "str" => Ok(Attribute::Strength),
            "dexterity" | "dex" => Ok(Attribute::Dexterity),
            "constitution" | "con" => Ok(Attribute::Constitution),
            "intelligence" | "int" => Ok(Attribute::Intelligence),
            "wisdom" | "wis" => Ok(Attribute::Wisdom),
            "charisma" | "cha" => Ok(Attribute::Charisma),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Attribute::Strength => "strength",
            Attribute::Dexterity => "dexterity",
            Attribute::Constitution => "constitution",
            Attribute::Intelligence => "intelligence",
            Attribute::Wisdom => "wisdom",
            Attribute::Charisma => "charisma",
        };
        write!(f, "{}", s)
    }
}

/// Attribute scores of a combatant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<Attribute, i32>);

impl Attributes {
    /// Score used for attributes a record leaves out
    pub const NEUTRAL: i32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, attribute: Attribute, value: i32) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&mut self, attribute: Attribute, value: i32) {
        self.0.insert(attribute, value);
    }

    /// Score for an attribute, neutral if absent
    pub fn get(&self, attribute: Attribute) -> i32 {
        self.0.get(&attribute).copied().unwrap_or(Self::NEUTRAL)
    }
}

/// The player side of an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantState {
    /// Current hit points
    pub health: i32,
    /// Maximum hit points
    pub max_health: i32,
    pub base_attack: i32,
    pub base_defense: i32,
    /// Attack bonus from equipped items, fixed for the session
    pub equipment_attack: i32,
    /// Defense bonus from equipped items, fixed for the session
    pub equipment_defense: i32,
}

impl CombatantState {
    /// Static attack before buffs
    pub fn static_attack(&self) -> i32 {
        self.base_attack + self.equipment_attack
    }

    /// Static defense before buffs
    pub fn static_defense(&self) -> i32 {
        self.base_defense + self.equipment_defense
    }

    /// Check if combatant is down
    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Subtract damage, flooring health at 0. Returns the damage actually applied.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        apply_damage(&mut self.health, amount)
    }
}

/// The monster side of an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterState {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
    pub damage: DiceSpec,
    pub difficulty: Difficulty,
}

impl MonsterState {
    /// Check if monster is defeated
    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Subtract damage, flooring health at 0. Returns the damage actually applied.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        apply_damage(&mut self.health, amount)
    }
}

// Negative damage never heals.
fn apply_damage(health: &mut i32, amount: i32) -> i32 {
    let applied = amount.clamp(0, (*health).max(0));
    *health -= applied;
    applied
}

/// Result of a 1d6 attack roll against a defense value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    /// The raw die
    pub roll: u32,
    pub bonus: i32,
    /// Roll plus bonus
    pub total: i32,
    /// Defense value being attacked
    pub target: i32,
    pub hit: bool,
}

impl AttackRoll {
    /// Resolve a roll. Ties go to the attacker.
    pub fn new(roll: u32, bonus: i32, target: i32) -> Self {
        let total = roll as i32 + bonus;
        Self {
            roll,
            bonus,
            total,
            target,
            hit: total >= target,
        }
    }
}
