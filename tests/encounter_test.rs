//! Full encounters driven through the session façade

mod common;

use common::{messages, session, snapshot, snapshot_with, MAX_INVENTORY};
use skirmish::catalog::CharacterState;
use skirmish::combat::{CombatSession, Intent, LogTag, Outcome, Phase, RngSource, ScriptedSource};
use skirmish::loot::{Currency, ItemStack};

/// Rat spawns with 3 HP, hero wins initiative and kills it with one swing.
/// The tail drops, the fang does not, and 99 silver + 150 copper drop.
fn rat_victory_script() -> ScriptedSource {
    ScriptedSource::new()
        .with_dice([1, 6, 1, 5, 3])
        .with_percentiles([20.0, 10.0])
        .with_ranges([99, 150])
}

#[test]
fn test_victory_loot_and_carry() {
    let mut s = session("rat", rat_victory_script());
    assert_eq!(s.view().monster_health, 3);

    let outcome = s.roll_initiative();
    assert_eq!(outcome.view.phase, Phase::PlayerTurn);

    let outcome = s.basic_attack();
    assert_eq!(outcome.view.phase, Phase::Resolved(Outcome::Victory));
    assert_eq!(outcome.view.monster_health, 0);
    assert!(!s.is_finished());

    let pending = outcome.view.pending_rewards.unwrap();
    assert_eq!(pending.items, vec![ItemStack::new("rat_tail", 1)]);
    assert_eq!(pending.currency, Currency::new(0, 99, 150));

    let outcome = s.settle_rewards(&["rat_tail".to_string()], true);
    assert!(outcome.rejected.is_none());
    assert!(outcome.needs_persist());
    let settlement = outcome.settlement.unwrap();
    assert_eq!(settlement.items_granted, vec![ItemStack::new("rat_tail", 1)]);
    assert!(!settlement.capacity_exceeded());
    assert_eq!(settlement.currency, Currency::new(1, 0, 50));

    // Settling does not leave the victory phase
    assert_eq!(s.phase(), Phase::Resolved(Outcome::Victory));
    assert!(s.is_finished());

    let state = s.character_state();
    assert_eq!(state.health, 20);
    assert_eq!(state.inventory, vec![ItemStack::new("rat_tail", 1)]);
    assert_eq!(state.currency, Currency::new(1, 0, 50));
}

#[test]
fn test_full_inventory_rejects_items_but_keeps_currency() {
    let state = CharacterState {
        health: 20,
        inventory: vec![ItemStack::new("potion", MAX_INVENTORY)],
        currency: Currency::ZERO,
    };
    let mut s = CombatSession::new(snapshot_with("rat", state, MAX_INVENTORY), rat_victory_script());
    s.roll_initiative();
    s.basic_attack();

    let outcome = s.settle_rewards(&["rat_tail".to_string()], true);
    let settlement = outcome.settlement.clone().unwrap();
    assert!(settlement.capacity_exceeded());
    assert!(settlement.items_granted.is_empty());
    assert_eq!(settlement.items_rejected, vec![ItemStack::new("rat_tail", 1)]);
    assert_eq!(settlement.inventory, vec![ItemStack::new("potion", MAX_INVENTORY)]);
    assert_eq!(settlement.currency, Currency::new(1, 0, 50));
    assert!(!messages(&outcome, LogTag::Info).is_empty());
    assert!(s.is_finished());
}

#[test]
fn test_declining_rewards() {
    let mut s = session("rat", rat_victory_script());
    s.roll_initiative();
    s.basic_attack();

    let outcome = s.settle_rewards(&[], false);
    let settlement = outcome.settlement.unwrap();
    assert!(settlement.items_granted.is_empty());
    assert_eq!(settlement.currency, Currency::ZERO);

    let again = s.settle_rewards(&["rat_tail".to_string()], true);
    assert!(again.rejected.is_some());
    assert!(again.settlement.is_none());
    assert_eq!(s.character_state().currency, Currency::ZERO);
}

#[test]
fn test_defeat() {
    let state = CharacterState {
        health: 2,
        inventory: vec![],
        currency: Currency::ZERO,
    };
    // Ogre 12 HP, wins initiative 6 v 1, hits for 1 + 2 strength
    let rng = ScriptedSource::new().with_dice([1, 1, 1, 6, 1, 1]);
    let mut s = CombatSession::new(snapshot_with("ogre", state, MAX_INVENTORY), rng);
    assert_eq!(s.view().monster_health, 12);

    let outcome = s.roll_initiative();
    assert_eq!(outcome.view.phase, Phase::MonsterTurn);

    let outcome = s.advance();
    assert!(outcome.health_changed);
    assert_eq!(outcome.view.player_health, 0);
    assert_eq!(outcome.view.phase, Phase::Resolved(Outcome::Defeat));
    assert!(!messages(&outcome, LogTag::Damage).is_empty());
    assert!(s.is_finished());

    assert!(s.basic_attack().rejected.is_some());
    assert!(s.escape().rejected.is_some());
    assert_eq!(s.phase(), Phase::Resolved(Outcome::Defeat));
}

#[test]
fn test_defense_buff_lasts_two_monster_turns() {
    // Rat 6 HP; every later roll is a 1, so nobody ever hits
    let mut s = session("rat", ScriptedSource::new().with_dice([4, 6, 1]));
    s.roll_initiative();

    let outcome = s.use_ability("ward");
    assert!(outcome.rejected.is_none());
    assert_eq!(outcome.view.phase, Phase::MonsterTurn);
    assert_eq!(outcome.view.effective_defense, 13);
    assert_eq!(outcome.view.defense_buffs.len(), 1);
    assert_eq!(outcome.view.cooldowns.get("ward"), Some(&3));

    let outcome = s.advance();
    assert_eq!(outcome.view.round, 2);
    assert_eq!(outcome.view.effective_defense, 13);
    assert_eq!(outcome.view.defense_buffs[0].remaining_rounds, 1);
    assert_eq!(outcome.view.cooldowns.get("ward"), Some(&2));

    s.basic_attack();
    let outcome = s.advance();
    assert_eq!(outcome.view.round, 3);
    assert_eq!(outcome.view.effective_defense, 10);
    assert!(outcome.view.defense_buffs.is_empty());
    assert!(outcome
        .entries
        .iter()
        .any(|e| e.message.contains("wears off")));

    let before = s.view();
    let outcome = s.use_ability("ward");
    assert!(outcome.rejected.unwrap().contains("cooldown"));
    assert_eq!(outcome.view, before);

    s.basic_attack();
    let outcome = s.advance();
    assert_eq!(outcome.view.round, 4);
    assert_eq!(outcome.view.cooldowns.get("ward").copied().unwrap_or(0), 0);
    assert!(s.use_ability("ward").rejected.is_none());
    assert_eq!(s.view().player_health, 20);
}

#[test]
fn test_attack_buff_applies_to_rolls() {
    let mut s = session("rat", ScriptedSource::new().with_dice([4, 6, 1]));
    s.roll_initiative();

    let outcome = s.use_ability("fury");
    assert_eq!(outcome.view.effective_attack, 6);
    assert_eq!(outcome.view.attack_buffs.len(), 1);
    s.advance();

    // 1 + 6 meets defense 6; 1d8 rolls 1, +2 strength, +1 weapon
    let outcome = s.basic_attack();
    assert_eq!(outcome.view.monster_health, 2);
}

#[test]
fn test_offense_ability_skips_to_hit_roll() {
    // Smite: 2d6 (1 + 1) + 1 + 2 strength + 1 weapon = 6
    let mut s = session("rat", ScriptedSource::new().with_dice([4, 6, 1, 1, 1]));
    s.roll_initiative();

    let outcome = s.use_ability("smite");
    assert_eq!(outcome.view.monster_health, 0);
    assert_eq!(outcome.view.phase, Phase::Resolved(Outcome::Victory));
    assert_eq!(outcome.view.cooldowns.get("smite"), Some(&2));

    // Exhausted percentile queue draws 0, so everything drops
    let pending = outcome.view.pending_rewards.unwrap();
    assert_eq!(
        pending.items,
        vec![ItemStack::new("rat_tail", 1), ItemStack::new("fang", 1)]
    );
    assert_eq!(pending.currency, Currency::ZERO);
}

#[test]
fn test_unknown_ability_is_ignored() {
    let mut s = session("rat", ScriptedSource::new().with_dice([4, 6, 1]));
    s.roll_initiative();
    let before = s.view();

    let outcome = s.use_ability("fireball");
    assert!(outcome.rejected.unwrap().contains("fireball"));
    assert_eq!(outcome.view, before);
}

#[test]
fn test_victory_without_rewards_is_finished() {
    // Wisp 1 HP; 6 + 4 hits, 1d8 rolls 1
    let mut s = session("wisp", ScriptedSource::new().with_dice([1, 6, 1, 6, 1]));
    s.roll_initiative();

    let outcome = s.basic_attack();
    assert_eq!(outcome.view.phase, Phase::Resolved(Outcome::Victory));
    assert!(outcome.view.pending_rewards.is_none());
    assert!(s.is_finished());
    assert!(s.settle_rewards(&[], true).rejected.is_some());
}

#[test]
fn test_negative_damage_does_not_heal() {
    // Wisp always hits (legendary), but 1d4-5 + 2 is at most 1
    let mut s = session("wisp", ScriptedSource::new().with_dice([4, 1, 6]));
    s.roll_initiative();

    let outcome = s.advance();
    assert_eq!(outcome.view.player_health, 20);
    assert!(!outcome.health_changed);
    assert!(!outcome.needs_persist());
    assert_eq!(outcome.view.phase, Phase::PlayerTurn);
}

#[test]
fn test_intents_before_initiative_are_ignored() {
    let mut s = session("rat", ScriptedSource::new().with_dice([4]));
    let before = s.view();

    for intent in [
        Intent::BasicAttack,
        Intent::Advance,
        Intent::UseAbility {
            ability_id: "ward".into(),
        },
        Intent::SettleRewards {
            selected_item_ids: vec![],
            accept_currency: true,
        },
    ] {
        let outcome = s.apply(intent);
        assert!(outcome.rejected.is_some());
        assert_eq!(messages(&outcome, LogTag::Info).len(), 1);
        assert_eq!(outcome.view, before);
    }
}

#[test]
fn test_escape_mid_fight() {
    let mut s = session("ogre", ScriptedSource::new().with_dice([1, 1, 6, 1]));
    s.roll_initiative();

    let outcome = s.escape();
    assert_eq!(outcome.view.phase, Phase::Resolved(Outcome::Escaped));
    assert!(outcome.view.pending_rewards.is_none());
    assert!(!outcome.needs_persist());
    assert!(s.is_finished());
}

/// Play with basic attacks until something resolves
fn autoplay<R: skirmish::combat::RandomSource>(s: &mut CombatSession<R>) -> Vec<skirmish::combat::StepOutcome> {
    let mut outcomes = vec![s.roll_initiative()];
    for _ in 0..200 {
        let outcome = match s.phase() {
            Phase::PlayerTurn => s.basic_attack(),
            Phase::MonsterTurn => s.advance(),
            _ => break,
        };
        outcomes.push(outcome);
    }
    outcomes
}

#[test]
fn test_seeded_sessions_are_reproducible() {
    let mut a = CombatSession::new(snapshot("ogre"), RngSource::seeded(2024));
    let mut b = CombatSession::new(snapshot("ogre"), RngSource::seeded(2024));

    assert_eq!(autoplay(&mut a), autoplay(&mut b));
    assert_eq!(a.character_state(), b.character_state());
}

#[test]
fn test_health_stays_in_bounds() {
    for seed in 0..20 {
        let mut s = CombatSession::new(snapshot("ogre"), RngSource::seeded(seed));
        let mut round = 1;
        for outcome in autoplay(&mut s) {
            let view = outcome.view;
            assert!((0..=view.player_max_health).contains(&view.player_health));
            assert!((0..=view.monster_max_health).contains(&view.monster_health));
            assert!(view.round >= round);
            round = view.round;
        }
    }
}

#[test]
fn test_auto_monster_turn_never_waits() {
    let mut s = CombatSession::new(snapshot("ogre"), RngSource::seeded(5)).with_auto_monster_turn(true);
    let outcome = s.roll_initiative();
    assert_ne!(outcome.view.phase, Phase::MonsterTurn);

    for _ in 0..50 {
        if s.phase() != Phase::PlayerTurn {
            break;
        }
        let outcome = s.basic_attack();
        assert_ne!(outcome.view.phase, Phase::MonsterTurn);
    }
}
