//! Attribute bonuses, monster difficulty scaling and damage totals

use serde::{Deserialize, Serialize};

use super::dice::{DiceSpec, RandomSource};

/// Convert an attribute score into its roll bonus
pub fn attribute_bonus(value: i32) -> i32 {
    match value {
        i32::MIN..=9 => -1,
        10..=11 => 0,
        12..=13 => 1,
        _ => 2,
    }
}

/// Monster difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Deadly,
    Legendary,
    /// Any tier name not listed above
    Unknown,
}

impl Difficulty {
    /// Parse a tier name. Unrecognized names map to [`Difficulty::Unknown`].
    pub fn from_name(name: &str) -> Difficulty {
        match name.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            "deadly" => Difficulty::Deadly,
            "legendary" => Difficulty::Legendary,
            _ => Difficulty::Unknown,
        }
    }

    /// Fixed attack offset for this tier
    pub fn attack_offset(&self) -> i32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 3,
            Difficulty::Hard => 7,
            Difficulty::Deadly => 17,
            Difficulty::Legendary => 35,
            Difficulty::Unknown => 0,
        }
    }
}

impl From<String> for Difficulty {
    fn from(name: String) -> Self {
        Difficulty::from_name(&name)
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.to_string()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Deadly => "deadly",
            Difficulty::Legendary => "legendary",
            Difficulty::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Attack bonus of a monster after difficulty scaling
pub fn monster_attack_bonus(base_attack: i32, difficulty: Difficulty) -> i32 {
    base_attack + difficulty.attack_offset()
}

/// Damage dealt by a successful hit.
///
/// Not clamped: a negative total is floored when applied to health.
pub fn total_damage(
    rng: &mut impl RandomSource,
    spec: &DiceSpec,
    attribute_value: i32,
    weapon_bonus: i32,
) -> i32 {
    spec.roll_dice(rng)
        .saturating_add(spec.modifier)
        .saturating_add(attribute_bonus(attribute_value))
        .saturating_add(weapon_bonus)
}
