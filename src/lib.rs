//! skirmish - turn-based encounter engine
//!
//! Resolves a fight between one character and one monster: initiative,
//! attack rolls, ability buffs and cooldowns, loot and currency rewards.
//! Catalog lookups and persistence sit behind traits so the combat core
//! stays synchronous and deterministic under a seeded random source.

pub mod catalog;
pub mod combat;
pub mod config;
pub mod loot;
pub mod service;
pub mod store;

pub use config::Config;
pub use service::{EncounterService, ServiceError};
