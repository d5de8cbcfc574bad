//! Read-only catalog of characters, abilities and monsters
//!
//! The engine never fetches data itself: everything it needs for an
//! encounter is looked up here once, before the session starts.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::combat::{Attribute, Attributes, DiceSpec, Difficulty};
use crate::loot::{Currency, CurrencyRanges, ItemStack, LootTableEntry};

/// Catalog lookup errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown character: {0}")]
    UnknownCharacter(String),

    #[error("unknown monster: {0}")]
    UnknownMonster(String),

    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ability categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityKind {
    /// Grants a defense buff, no attack
    Defense,
    /// Grants an attack buff, no attack
    Boost,
    /// Deals damage without a to-hit roll
    Offense,
}

impl std::fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbilityKind::Defense => write!(f, "defense"),
            AbilityKind::Boost => write!(f, "boost"),
            AbilityKind::Offense => write!(f, "offense"),
        }
    }
}

/// Kind-specific ability parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityProperties {
    /// Damage dice for offense abilities
    #[serde(default)]
    pub damage: Option<DiceSpec>,
    /// Buff magnitude for defense/boost abilities
    #[serde(default)]
    pub magnitude: i32,
    /// Buff duration in rounds for defense/boost abilities
    #[serde(default)]
    pub duration: u32,
}

/// A class ability usable in combat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AbilityKind,
    pub main_attribute: Attribute,
    /// Rounds before the ability can be reused
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub properties: AbilityProperties,
}

/// Bonuses from equipped items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub defense_bonus: i32,
    /// Added to every damage roll the player makes
    #[serde(default)]
    pub damage_bonus: i32,
    /// Weapon damage dice, unarmed if absent
    #[serde(default)]
    pub weapon_damage: Option<DiceSpec>,
}

/// Static description of a playable character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub max_health: i32,
    #[serde(default)]
    pub base_attack: i32,
    #[serde(default)]
    pub base_defense: i32,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

impl CharacterRecord {
    /// Reject values the engine cannot run an encounter with
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.max_health < 1 {
            return Err(CatalogError::InvalidRecord {
                id: self.id.clone(),
                reason: format!("max_health must be at least 1, got {}", self.max_health),
            });
        }
        Ok(())
    }
}

/// Mutable character state owned by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub health: i32,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
    #[serde(default)]
    pub currency: Currency,
}

impl CharacterState {
    /// Full health, empty pockets
    pub fn fresh(record: &CharacterRecord) -> Self {
        Self {
            health: record.max_health,
            inventory: Vec::new(),
            currency: Currency::ZERO,
        }
    }
}

/// Static description of a monster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterDefinition {
    pub id: String,
    pub name: String,
    /// Rolled once when an encounter starts
    pub health: DiceSpec,
    pub attack: i32,
    pub defense: i32,
    pub damage: DiceSpec,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub loot_table: Vec<LootTableEntry>,
    #[serde(default)]
    pub currency: CurrencyRanges,
}

/// Read-only lookup of encounter inputs
pub trait Catalog: Send + Sync {
    fn character(&self, id: &str) -> Result<CharacterRecord, CatalogError>;
    fn monster(&self, id: &str) -> Result<MonsterDefinition, CatalogError>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    characters: Vec<CharacterRecord>,
    #[serde(default)]
    monsters: Vec<MonsterDefinition>,
}

/// In-memory catalog, usually loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    characters: HashMap<String, CharacterRecord>,
    monsters: HashMap<String, MonsterDefinition>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for character in file.characters {
            character.validate()?;
            catalog.insert_character(character);
        }
        for monster in file.monsters {
            catalog.insert_monster(monster);
        }
        Ok(catalog)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(
            "Loaded catalog {}: {} characters, {} monsters",
            path.display(),
            catalog.characters.len(),
            catalog.monsters.len()
        );
        Ok(catalog)
    }

    pub fn insert_character(&mut self, record: CharacterRecord) {
        self.characters.insert(record.id.clone(), record);
    }

    pub fn insert_monster(&mut self, monster: MonsterDefinition) {
        self.monsters.insert(monster.id.clone(), monster);
    }
}

impl Catalog for MemoryCatalog {
    fn character(&self, id: &str) -> Result<CharacterRecord, CatalogError> {
        self.characters
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownCharacter(id.to_string()))
    }

    fn monster(&self, id: &str) -> Result<MonsterDefinition, CatalogError> {
        self.monsters
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownMonster(id.to_string()))
    }
}
