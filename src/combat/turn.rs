//! Turn state machine
//!
//! Drives one encounter from initiative to a terminal phase:
//!
//! ```text
//! AwaitingInitiative -> PlayerTurn | MonsterTurn
//! PlayerTurn  -> MonsterTurn | Resolved(Victory)
//! MonsterTurn -> PlayerTurn (round ends, buffs tick) | Resolved(Defeat)
//! any non-terminal phase -> Resolved(Escaped)
//! ```
//!
//! Every transition validates the current phase first and reports a
//! [`Rejection`] without touching state when the intent does not apply.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::buffs::{BuffKind, BuffLedger};
use super::dice::{DiceSpec, RandomSource};
use super::formula::{attribute_bonus, monster_attack_bonus, total_damage};
use super::log::CombatLog;
use super::state::{AttackRoll, Attribute, Attributes, CombatantState, MonsterState};
use crate::catalog::{
    Ability, AbilityKind, CharacterRecord, CharacterState, Equipment, MonsterDefinition,
};
use crate::loot::{
    roll_rewards, settle_rewards, Currency, CurrencyRanges, ItemStack, LootTableEntry,
    PendingRewards, Settlement,
};

/// Die used for initiative and attack rolls
const D6: u32 = 6;

/// How a finished encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
    Escaped,
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingInitiative,
    PlayerTurn,
    MonsterTurn,
    /// Terminal
    Resolved(Outcome),
}

impl Phase {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Phase::Resolved(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Phase::Resolved(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::AwaitingInitiative => write!(f, "awaiting initiative"),
            Phase::PlayerTurn => write!(f, "player turn"),
            Phase::MonsterTurn => write!(f, "monster turn"),
            Phase::Resolved(Outcome::Victory) => write!(f, "victory"),
            Phase::Resolved(Outcome::Defeat) => write!(f, "defeat"),
            Phase::Resolved(Outcome::Escaped) => write!(f, "escaped"),
        }
    }
}

/// Why an intent was ignored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("cannot {intent} during {phase}")]
    WrongPhase { intent: &'static str, phase: Phase },

    #[error("unknown ability: {0}")]
    UnknownAbility(String),

    #[error("{ability} is on cooldown for {remaining} more round(s)")]
    OnCooldown { ability: String, remaining: u32 },

    #[error("there are no rewards waiting to be settled")]
    NoPendingRewards,
}

/// Everything needed to start an encounter, fetched up front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSnapshot {
    pub character: CharacterRecord,
    pub state: CharacterState,
    pub monster: MonsterDefinition,
    pub max_inventory_size: u32,
}

/// Combat state for one encounter
#[derive(Debug, Clone)]
pub struct TurnEngine {
    character_name: String,
    attributes: Attributes,
    player: CombatantState,
    equipment: Equipment,
    abilities: Vec<Ability>,
    monster: MonsterState,
    loot_table: Vec<LootTableEntry>,
    currency_ranges: CurrencyRanges,
    inventory: Vec<ItemStack>,
    wallet: Currency,
    max_inventory_size: u32,
    ledger: BuffLedger,
    phase: Phase,
    round: u32,
    pending: Option<PendingRewards>,
}

impl TurnEngine {
    /// Set up an encounter. The monster's health is rolled here, floor 1.
    pub fn new(snapshot: EncounterSnapshot, rng: &mut impl RandomSource) -> Self {
        let EncounterSnapshot {
            character,
            state,
            monster,
            max_inventory_size,
        } = snapshot;

        let monster_health = monster.health.roll(rng).max(1);
        debug!("{} spawned with {} HP", monster.name, monster_health);

        let max_health = character.max_health.max(0);
        let player = CombatantState {
            health: state.health.clamp(0, max_health),
            max_health,
            base_attack: character.base_attack,
            base_defense: character.base_defense,
            equipment_attack: character.equipment.attack_bonus,
            equipment_defense: character.equipment.defense_bonus,
        };

        Self {
            character_name: character.name,
            attributes: character.attributes,
            player,
            equipment: character.equipment,
            abilities: character.abilities,
            monster: MonsterState {
                name: monster.name,
                health: monster_health,
                max_health: monster_health,
                attack: monster.attack,
                defense: monster.defense,
                damage: monster.damage,
                difficulty: monster.difficulty,
            },
            loot_table: monster.loot_table,
            currency_ranges: monster.currency,
            inventory: state.inventory,
            wallet: state.currency,
            max_inventory_size,
            ledger: BuffLedger::new(),
            phase: Phase::AwaitingInitiative,
            round: 1,
            pending: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round, starting at 1
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn player(&self) -> &CombatantState {
        &self.player
    }

    pub fn monster(&self) -> &MonsterState {
        &self.monster
    }

    pub fn ledger(&self) -> &BuffLedger {
        &self.ledger
    }

    pub fn abilities(&self) -> &[Ability] {
        &self.abilities
    }

    pub fn pending_rewards(&self) -> Option<&PendingRewards> {
        self.pending.as_ref()
    }

    /// Terminal and no reward selection outstanding
    pub fn is_finished(&self) -> bool {
        self.phase.is_resolved() && self.pending.is_none()
    }

    /// Persistent part of the character as of now
    pub fn character_state(&self) -> CharacterState {
        CharacterState {
            health: self.player.health,
            inventory: self.inventory.clone(),
            currency: self.wallet,
        }
    }

    /// Static attack plus active attack buffs
    pub fn effective_attack(&self) -> i32 {
        self.player.static_attack() + self.ledger.total_bonus(BuffKind::Attack)
    }

    /// Static defense plus active defense buffs
    pub fn effective_defense(&self) -> i32 {
        self.player.static_defense() + self.ledger.total_bonus(BuffKind::Defense)
    }

    fn require(&self, phase: Phase, intent: &'static str) -> Result<(), Rejection> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase {
                intent,
                phase: self.phase,
            })
        }
    }

    /// Contested 1d6 rolls; the player adds their dexterity bonus and wins ties
    pub fn roll_initiative(
        &mut self,
        rng: &mut impl RandomSource,
        log: &mut CombatLog,
    ) -> Result<(), Rejection> {
        self.require(Phase::AwaitingInitiative, "roll initiative")?;

        let dex_bonus = attribute_bonus(self.attributes.get(Attribute::Dexterity));
        let player_roll = rng.roll_die(D6) as i32 + dex_bonus;
        let monster_roll = rng.roll_die(D6) as i32;

        log.info(format!(
            "Initiative: {} rolls {}, {} rolls {}",
            self.character_name, player_roll, self.monster.name, monster_roll
        ));

        if player_roll >= monster_roll {
            self.phase = Phase::PlayerTurn;
            log.info(format!("{} acts first.", self.character_name));
        } else {
            self.phase = Phase::MonsterTurn;
            log.info(format!("{} acts first.", self.monster.name));
        }
        info!(
            "Initiative {} vs {}: {}",
            player_roll, monster_roll, self.phase
        );
        Ok(())
    }

    /// Weapon attack: 1d6 + effective attack against the monster's defense
    pub fn basic_attack(
        &mut self,
        rng: &mut impl RandomSource,
        log: &mut CombatLog,
    ) -> Result<(), Rejection> {
        self.require(Phase::PlayerTurn, "attack")?;

        let attack = AttackRoll::new(rng.roll_die(D6), self.effective_attack(), self.monster.defense);
        log.info(format!(
            "{} attacks {}: {} + {} = {} against defense {}",
            self.character_name,
            self.monster.name,
            attack.roll,
            attack.bonus,
            attack.total,
            attack.target
        ));

        if attack.hit {
            let weapon = self.equipment.weapon_damage.unwrap_or(DiceSpec::UNARMED);
            let damage = total_damage(
                rng,
                &weapon,
                self.attributes.get(Attribute::Strength),
                self.equipment.damage_bonus,
            );
            self.damage_monster(damage, "attack", log);
        } else {
            log.info(format!("{} misses.", self.character_name));
        }

        self.finish_player_turn(rng, log);
        Ok(())
    }

    /// Use an ability that is off cooldown. Always ends the player's turn.
    pub fn use_ability(
        &mut self,
        ability_id: &str,
        rng: &mut impl RandomSource,
        log: &mut CombatLog,
    ) -> Result<(), Rejection> {
        self.require(Phase::PlayerTurn, "use an ability")?;

        let ability = self
            .abilities
            .iter()
            .find(|a| a.id == ability_id)
            .cloned()
            .ok_or_else(|| Rejection::UnknownAbility(ability_id.to_string()))?;

        let remaining = self.ledger.cooldown(&ability.id);
        if remaining > 0 {
            return Err(Rejection::OnCooldown {
                ability: ability.name,
                remaining,
            });
        }

        debug!("Using ability {} ({})", ability.id, ability.kind);
        match ability.kind {
            AbilityKind::Defense => self.grant_buff(&ability, BuffKind::Defense, log),
            AbilityKind::Boost => self.grant_buff(&ability, BuffKind::Attack, log),
            AbilityKind::Offense => {
                let spec = ability.properties.damage.unwrap_or(DiceSpec::UNARMED);
                let damage = total_damage(
                    rng,
                    &spec,
                    self.attributes.get(ability.main_attribute),
                    self.equipment.damage_bonus,
                );
                self.damage_monster(damage, &ability.name, log);
            }
        }

        self.ledger.set_cooldown(&ability.id, ability.cooldown);
        self.finish_player_turn(rng, log);
        Ok(())
    }

    /// The monster's attack, then end of round if the player survives
    pub fn monster_turn(
        &mut self,
        rng: &mut impl RandomSource,
        log: &mut CombatLog,
    ) -> Result<(), Rejection> {
        self.require(Phase::MonsterTurn, "advance")?;

        let bonus = monster_attack_bonus(self.monster.attack, self.monster.difficulty);
        let attack = AttackRoll::new(rng.roll_die(D6), bonus, self.effective_defense());
        log.info(format!(
            "{} attacks {}: {} + {} = {} against defense {}",
            self.monster.name,
            self.character_name,
            attack.roll,
            attack.bonus,
            attack.total,
            attack.target
        ));

        if attack.hit {
            let damage = total_damage(
                rng,
                &self.monster.damage,
                self.attributes.get(Attribute::Strength),
                0,
            );
            let applied = self.player.take_damage(damage);
            log.damage(format!(
                "{} hits {} for {} damage ({}/{} HP)",
                self.monster.name,
                self.character_name,
                applied,
                self.player.health,
                self.player.max_health
            ));
        } else {
            log.info(format!("{} misses.", self.monster.name));
        }

        if self.player.is_dead() {
            self.phase = Phase::Resolved(Outcome::Defeat);
            log.info(format!("{} has been defeated.", self.character_name));
            info!("{} defeated by {}", self.character_name, self.monster.name);
            return Ok(());
        }

        self.end_round(log);
        Ok(())
    }

    /// Leave the encounter from any non-terminal phase
    pub fn escape(&mut self, log: &mut CombatLog) -> Result<(), Rejection> {
        if self.phase.is_resolved() {
            return Err(Rejection::WrongPhase {
                intent: "escape",
                phase: self.phase,
            });
        }
        self.phase = Phase::Resolved(Outcome::Escaped);
        log.info(format!("{} escapes from {}.", self.character_name, self.monster.name));
        info!("{} escaped in round {}", self.character_name, self.round);
        Ok(())
    }

    /// Accept some of the pending rewards. Only valid once, after a victory.
    pub fn settle_rewards(
        &mut self,
        selected_item_ids: &[String],
        accept_currency: bool,
        log: &mut CombatLog,
    ) -> Result<Settlement, Rejection> {
        self.require(Phase::Resolved(Outcome::Victory), "settle rewards")?;
        let pending = self.pending.take().ok_or(Rejection::NoPendingRewards)?;

        let settlement = settle_rewards(
            &pending,
            selected_item_ids,
            accept_currency,
            &self.inventory,
            self.max_inventory_size,
            self.wallet,
        );

        for stack in &settlement.items_granted {
            log.heal(format!("Received {} x{}", stack.item_id, stack.quantity));
        }
        if settlement.capacity_exceeded() {
            log.info(format!(
                "Not enough inventory space (max {}); the items were left behind.",
                self.max_inventory_size
            ));
        }
        if !settlement.currency_granted.is_zero() {
            log.heal(format!(
                "Received {} (purse: {})",
                settlement.currency_granted, settlement.currency
            ));
        }

        self.inventory = settlement.inventory.clone();
        self.wallet = settlement.currency;
        info!(
            "Rewards settled: {} stacks granted, {} rejected, {} currency",
            settlement.items_granted.len(),
            settlement.items_rejected.len(),
            settlement.currency_granted
        );
        Ok(settlement)
    }

    fn grant_buff(&mut self, ability: &Ability, kind: BuffKind, log: &mut CombatLog) {
        let props = &ability.properties;
        if self
            .ledger
            .add_buff(kind, props.magnitude, props.duration, &ability.id)
        {
            log.heal(format!(
                "{} uses {}: {:+} {} for {} round(s)",
                self.character_name, ability.name, props.magnitude, kind, props.duration
            ));
        } else {
            log.info(format!("{} uses {}, but nothing happens.", self.character_name, ability.name));
        }
    }

    fn damage_monster(&mut self, damage: i32, source: &str, log: &mut CombatLog) {
        let applied = self.monster.take_damage(damage);
        log.damage(format!(
            "{}'s {} deals {} damage to {} ({}/{} HP)",
            self.character_name,
            source,
            applied,
            self.monster.name,
            self.monster.health,
            self.monster.max_health
        ));
    }

    fn finish_player_turn(&mut self, rng: &mut impl RandomSource, log: &mut CombatLog) {
        if self.monster.is_dead() {
            self.resolve_victory(rng, log);
        } else {
            self.phase = Phase::MonsterTurn;
        }
    }

    fn resolve_victory(&mut self, rng: &mut impl RandomSource, log: &mut CombatLog) {
        self.phase = Phase::Resolved(Outcome::Victory);
        log.heal(format!("{} is defeated!", self.monster.name));
        info!("{} defeated {} in round {}", self.character_name, self.monster.name, self.round);

        let rewards = roll_rewards(rng, &self.loot_table, &self.currency_ranges);
        if rewards.is_empty() {
            log.info(format!("{} dropped nothing.", self.monster.name));
            return;
        }

        let mut found: Vec<String> = rewards
            .items
            .iter()
            .map(|s| format!("{} x{}", s.item_id, s.quantity))
            .collect();
        if !rewards.currency.is_zero() {
            found.push(rewards.currency.to_string());
        }
        log.heal(format!("{} dropped: {}", self.monster.name, found.join(", ")));
        self.pending = Some(rewards);
    }

    fn end_round(&mut self, log: &mut CombatLog) {
        for expired in self.ledger.tick_round() {
            let name = self
                .abilities
                .iter()
                .find(|a| a.id == expired.source_ability_id)
                .map(|a| a.name.as_str())
                .unwrap_or(expired.source_ability_id.as_str());
            log.info(format!("{} ({:+} {}) wears off.", name, expired.magnitude, expired.kind));
        }
        self.round += 1;
        self.phase = Phase::PlayerTurn;
        debug!("Round {} begins", self.round);
    }
}
