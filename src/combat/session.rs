//! Combat session façade
//!
//! The object a caller drives with intents. Each intent is one synchronous
//! step; the step's narrated log and resulting state come back as a
//! [`StepOutcome`]. Intents that do not apply in the current phase are
//! ignored, logged, and reported through [`StepOutcome::rejected`].

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::buffs::{Buff, BuffKind};
use super::dice::{RandomSource, RngSource};
use super::log::{CombatLog, LogEntry};
use super::turn::{EncounterSnapshot, Phase, Rejection, TurnEngine};
use crate::catalog::CharacterState;
use crate::loot::{PendingRewards, Settlement};

/// A player intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    RollInitiative,
    BasicAttack,
    UseAbility {
        ability_id: String,
    },
    /// Run the pending monster turn
    Advance,
    SettleRewards {
        selected_item_ids: Vec<String>,
        accept_currency: bool,
    },
    Escape,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::RollInitiative => "roll_initiative",
            Intent::BasicAttack => "basic_attack",
            Intent::UseAbility { .. } => "use_ability",
            Intent::Advance => "advance",
            Intent::SettleRewards { .. } => "settle_rewards",
            Intent::Escape => "escape",
        }
    }
}

/// Serializable snapshot of a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: Phase,
    pub round: u32,
    pub player_health: i32,
    pub player_max_health: i32,
    pub monster_name: String,
    pub monster_health: i32,
    pub monster_max_health: i32,
    pub effective_attack: i32,
    pub effective_defense: i32,
    pub attack_buffs: Vec<Buff>,
    pub defense_buffs: Vec<Buff>,
    pub cooldowns: BTreeMap<String, u32>,
    pub pending_rewards: Option<PendingRewards>,
}

/// Result of one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Narrated entries written during this step, in order
    pub entries: Vec<LogEntry>,
    /// Set when the intent was ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
    /// Set when rewards were settled in this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
    /// Player health changed during this step
    pub health_changed: bool,
    pub view: SessionView,
}

impl StepOutcome {
    /// Whether the step changed anything the persistence layer stores
    pub fn needs_persist(&self) -> bool {
        self.health_changed || self.settlement.is_some()
    }
}

/// One encounter between a character and a monster
#[derive(Debug, Clone)]
pub struct CombatSession<R = RngSource<StdRng>> {
    engine: TurnEngine,
    rng: R,
    log: CombatLog,
    auto_monster_turn: bool,
}

impl<R: RandomSource> CombatSession<R> {
    /// Start a session. The monster's health is rolled from `rng`.
    pub fn new(snapshot: EncounterSnapshot, mut rng: R) -> Self {
        let engine = TurnEngine::new(snapshot, &mut rng);
        Self {
            engine,
            rng,
            log: CombatLog::new(),
            auto_monster_turn: false,
        }
    }

    /// Run the monster's turn as part of the player's intent instead of
    /// waiting for [`CombatSession::advance`]
    pub fn with_auto_monster_turn(mut self, enabled: bool) -> Self {
        self.auto_monster_turn = enabled;
        self
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn pending_rewards(&self) -> Option<&PendingRewards> {
        self.engine.pending_rewards()
    }

    /// Terminal and nothing left to settle; the caller may tear down
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    /// Persistent part of the character as of the last step
    pub fn character_state(&self) -> CharacterState {
        self.engine.character_state()
    }

    pub fn view(&self) -> SessionView {
        let e = &self.engine;
        let ledger = e.ledger();
        SessionView {
            phase: e.phase(),
            round: e.round(),
            player_health: e.player().health,
            player_max_health: e.player().max_health,
            monster_name: e.monster().name.clone(),
            monster_health: e.monster().health,
            monster_max_health: e.monster().max_health,
            effective_attack: e.effective_attack(),
            effective_defense: e.effective_defense(),
            attack_buffs: ledger.active(BuffKind::Attack).into_iter().cloned().collect(),
            defense_buffs: ledger.active(BuffKind::Defense).into_iter().cloned().collect(),
            cooldowns: ledger.cooldowns().clone(),
            pending_rewards: e.pending_rewards().cloned(),
        }
    }

    pub fn roll_initiative(&mut self) -> StepOutcome {
        self.apply(Intent::RollInitiative)
    }

    pub fn basic_attack(&mut self) -> StepOutcome {
        self.apply(Intent::BasicAttack)
    }

    pub fn use_ability(&mut self, ability_id: &str) -> StepOutcome {
        self.apply(Intent::UseAbility {
            ability_id: ability_id.to_string(),
        })
    }

    pub fn advance(&mut self) -> StepOutcome {
        self.apply(Intent::Advance)
    }

    pub fn settle_rewards(&mut self, selected_item_ids: &[String], accept_currency: bool) -> StepOutcome {
        self.apply(Intent::SettleRewards {
            selected_item_ids: selected_item_ids.to_vec(),
            accept_currency,
        })
    }

    pub fn escape(&mut self) -> StepOutcome {
        self.apply(Intent::Escape)
    }

    /// Process one intent
    pub fn apply(&mut self, intent: Intent) -> StepOutcome {
        let health_before = self.engine.player().health;
        let mut settlement = None;

        let result = match &intent {
            Intent::RollInitiative => self.engine.roll_initiative(&mut self.rng, &mut self.log),
            Intent::BasicAttack => self.engine.basic_attack(&mut self.rng, &mut self.log),
            Intent::UseAbility { ability_id } => {
                self.engine
                    .use_ability(ability_id, &mut self.rng, &mut self.log)
            }
            Intent::Advance => self.engine.monster_turn(&mut self.rng, &mut self.log),
            Intent::SettleRewards {
                selected_item_ids,
                accept_currency,
            } => self
                .engine
                .settle_rewards(selected_item_ids, *accept_currency, &mut self.log)
                .map(|s| settlement = Some(s)),
            Intent::Escape => self.engine.escape(&mut self.log),
        };

        let rejected = match result {
            Ok(()) => {
                self.run_auto_monster_turn(&intent);
                None
            }
            Err(rejection) => Some(self.reject(&intent, rejection)),
        };

        StepOutcome {
            entries: self.log.drain(),
            rejected,
            settlement,
            health_changed: self.engine.player().health != health_before,
            view: self.view(),
        }
    }

    fn run_auto_monster_turn(&mut self, intent: &Intent) {
        let player_intent = matches!(
            intent,
            Intent::RollInitiative | Intent::BasicAttack | Intent::UseAbility { .. }
        );
        if !(self.auto_monster_turn && player_intent) {
            return;
        }
        if let Err(rejection) = self.engine.monster_turn(&mut self.rng, &mut self.log) {
            debug!("No monster turn after {}: {}", intent.name(), rejection);
        }
    }

    fn reject(&mut self, intent: &Intent, rejection: Rejection) -> String {
        let reason = rejection.to_string();
        debug!("Ignoring {}: {}", intent.name(), reason);
        self.log.info(format!("Ignored: {}", reason));
        reason
    }
}
