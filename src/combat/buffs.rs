//! Timed buffs and ability cooldowns
//!
//! Everything here is scoped to one combat session and ticks once per
//! completed round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which effective value a buff modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuffKind {
    Attack,
    Defense,
}

impl std::fmt::Display for BuffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuffKind::Attack => write!(f, "attack"),
            BuffKind::Defense => write!(f, "defense"),
        }
    }
}

/// A timed additive modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buff {
    pub kind: BuffKind,
    /// Ability that granted this buff
    pub source_ability_id: String,
    pub magnitude: i32,
    /// Round ticks left before expiry
    pub remaining_rounds: u32,
}

/// Emitted once for every buff removed by [`BuffLedger::tick_round`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuffExpired {
    pub kind: BuffKind,
    pub source_ability_id: String,
    pub magnitude: i32,
}

/// Active buffs plus ability cooldowns
#[derive(Debug, Clone, Default)]
pub struct BuffLedger {
    /// Insertion order is preserved for expiry reporting
    buffs: Vec<Buff>,
    cooldowns: BTreeMap<String, u32>,
}

impl BuffLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buff. A zero duration is ignored and returns false.
    pub fn add_buff(
        &mut self,
        kind: BuffKind,
        magnitude: i32,
        duration_rounds: u32,
        source_ability_id: &str,
    ) -> bool {
        if duration_rounds == 0 {
            return false;
        }
        self.buffs.push(Buff {
            kind,
            source_ability_id: source_ability_id.to_string(),
            magnitude,
            remaining_rounds: duration_rounds,
        });
        true
    }

    /// Sum of all active buff magnitudes of one kind
    pub fn total_bonus(&self, kind: BuffKind) -> i32 {
        self.buffs
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.magnitude)
            .sum()
    }

    /// Active buffs of one kind, oldest first
    pub fn active(&self, kind: BuffKind) -> Vec<&Buff> {
        self.buffs.iter().filter(|b| b.kind == kind).collect()
    }

    /// Advance one round: age buffs, drop expired ones, count down cooldowns
    pub fn tick_round(&mut self) -> Vec<BuffExpired> {
        let mut expired = Vec::new();

        self.buffs.retain_mut(|buff| {
            buff.remaining_rounds = buff.remaining_rounds.saturating_sub(1);
            if buff.remaining_rounds == 0 {
                expired.push(BuffExpired {
                    kind: buff.kind,
                    source_ability_id: buff.source_ability_id.clone(),
                    magnitude: buff.magnitude,
                });
                false
            } else {
                true
            }
        });

        for rounds in self.cooldowns.values_mut() {
            *rounds = rounds.saturating_sub(1);
        }

        expired
    }

    /// Start an ability's cooldown, replacing any previous value
    pub fn set_cooldown(&mut self, ability_id: &str, rounds: u32) {
        self.cooldowns.insert(ability_id.to_string(), rounds);
    }

    /// Rounds left before an ability can be used again
    pub fn cooldown(&self, ability_id: &str) -> u32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    /// Whether an ability is off cooldown
    pub fn is_ready(&self, ability_id: &str) -> bool {
        self.cooldown(ability_id) == 0
    }

    /// All tracked cooldowns, including those already at zero
    pub fn cooldowns(&self) -> &BTreeMap<String, u32> {
        &self.cooldowns
    }
}
