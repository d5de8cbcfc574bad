//! Shared fixtures for encounter tests
#![allow(dead_code)]

use skirmish::catalog::{Catalog, CharacterState, MemoryCatalog};
use skirmish::combat::{CombatSession, EncounterSnapshot, LogTag, ScriptedSource, StepOutcome};

/// The demo catalog shipped with the binary
pub const CATALOG_JSON: &str = include_str!("../../demos/catalog.json");

/// Default inventory capacity used by the fixtures
pub const MAX_INVENTORY: u32 = 20;

pub fn catalog() -> MemoryCatalog {
    MemoryCatalog::from_json(CATALOG_JSON).expect("demo catalog parses")
}

/// Snapshot of the demo hero against a monster, starting from `state`
pub fn snapshot_with(monster_id: &str, state: CharacterState, max_inventory_size: u32) -> EncounterSnapshot {
    let catalog = catalog();
    EncounterSnapshot {
        character: catalog.character("hero").unwrap(),
        state,
        monster: catalog.monster(monster_id).unwrap(),
        max_inventory_size,
    }
}

/// Fresh demo hero against a monster
pub fn snapshot(monster_id: &str) -> EncounterSnapshot {
    let hero = catalog().character("hero").unwrap();
    snapshot_with(monster_id, CharacterState::fresh(&hero), MAX_INVENTORY)
}

/// Session driven by scripted rolls
pub fn session(monster_id: &str, rng: ScriptedSource) -> CombatSession<ScriptedSource> {
    CombatSession::new(snapshot(monster_id), rng)
}

/// Messages of a step with the given tag
pub fn messages(outcome: &StepOutcome, tag: LogTag) -> Vec<&str> {
    outcome
        .entries
        .iter()
        .filter(|e| e.tag == tag)
        .map(|e| e.message.as_str())
        .collect()
}
