//! Combat system module
//!
//! Resolves a turn-based encounter between one character and one monster:
//! - Dice rolling (e.g., "2d6+3") from an injectable random source
//! - Attribute bonuses, difficulty scaling and damage totals
//! - Timed attack/defense buffs and ability cooldowns
//! - The turn state machine and the session façade callers drive

mod buffs;
mod dice;
mod formula;
mod log;
mod session;
mod state;
mod turn;

pub use buffs::{Buff, BuffExpired, BuffKind, BuffLedger};
pub use dice::{
    parse_dice, roll_dice, DiceError, DiceSpec, RandomSource, RngSource, ScriptedSource,
    MAX_DICE, VALID_FACES,
};
pub use formula::{attribute_bonus, monster_attack_bonus, total_damage, Difficulty};
pub use log::{CombatLog, LogEntry, LogTag};
pub use session::{CombatSession, Intent, SessionView, StepOutcome};
pub use state::{AttackRoll, Attribute, Attributes, CombatantState, MonsterState};
pub use turn::{EncounterSnapshot, Outcome, Phase, Rejection, TurnEngine};
