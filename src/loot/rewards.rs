//! Loot generation and reward settlement
//!
//! A defeated monster rolls every loot-table entry independently and draws
//! currency from its ranges. The player then picks which item stacks to
//! keep; items are granted all-or-nothing against inventory capacity while
//! currency is applied independently.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::currency::{Currency, CurrencyRanges};
use crate::combat::RandomSource;

/// One candidate drop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTableEntry {
    pub item_id: String,
    /// Percent chance in `[0, 100]`
    pub drop_chance_percent: f64,
}

impl LootTableEntry {
    pub fn new(item_id: impl Into<String>, drop_chance_percent: f64) -> Self {
        Self {
            item_id: item_id.into(),
            drop_chance_percent,
        }
    }

    /// A draw in `[0, 100)` drops the item iff it is strictly below the chance.
    pub fn drops_on(&self, draw: f64) -> bool {
        draw < self.drop_chance_percent
    }
}

/// A quantity of one item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Total units across stacks
pub fn inventory_size(stacks: &[ItemStack]) -> u64 {
    stacks.iter().map(|s| s.quantity as u64).sum()
}

/// Add a stack into an inventory, merging with an existing stack of the same item
pub fn merge_stack(inventory: &mut Vec<ItemStack>, stack: &ItemStack) {
    match inventory.iter_mut().find(|s| s.item_id == stack.item_id) {
        Some(existing) => existing.quantity += stack.quantity,
        None => inventory.push(stack.clone()),
    }
}

/// Rewards rolled on victory, waiting for the player's selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRewards {
    /// Aggregated drops, in first-drop order
    pub items: Vec<ItemStack>,
    /// Raw rolled amount, normalized only when deposited
    pub currency: Currency,
}

impl PendingRewards {
    /// Nothing dropped at all
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.currency.is_zero()
    }
}

/// Roll a monster's loot table and currency ranges
pub fn roll_rewards(
    rng: &mut impl RandomSource,
    loot_table: &[LootTableEntry],
    ranges: &CurrencyRanges,
) -> PendingRewards {
    let mut items = Vec::new();

    for entry in loot_table {
        let draw = rng.percentile();
        if entry.drops_on(draw) {
            debug!("Loot drop: {} (draw {:.2} < {})", entry.item_id, draw, entry.drop_chance_percent);
            merge_stack(&mut items, &ItemStack::new(entry.item_id.clone(), 1));
        }
    }

    let currency = ranges.roll(rng);

    PendingRewards { items, currency }
}

/// Outcome of confirming a reward selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Stacks added to the inventory
    pub items_granted: Vec<ItemStack>,
    /// Selected stacks discarded because they did not fit
    pub items_rejected: Vec<ItemStack>,
    /// Currency added before normalization
    pub currency_granted: Currency,
    /// Inventory after settlement
    pub inventory: Vec<ItemStack>,
    /// Normalized wallet after settlement
    pub currency: Currency,
}

impl Settlement {
    /// Selected items were discarded for lack of space
    pub fn capacity_exceeded(&self) -> bool {
        !self.items_rejected.is_empty()
    }
}

/// Merge the selected rewards into an inventory and wallet.
///
/// Selected ids not present in `pending` are ignored, as are repeats.
pub fn settle_rewards(
    pending: &PendingRewards,
    selected_item_ids: &[String],
    accept_currency: bool,
    inventory: &[ItemStack],
    max_inventory_size: u32,
    wallet: Currency,
) -> Settlement {
    let selected: Vec<ItemStack> = pending
        .items
        .iter()
        .filter(|stack| selected_item_ids.contains(&stack.item_id))
        .cloned()
        .collect();

    let current = inventory_size(inventory);
    let incoming = inventory_size(&selected);
    let mut new_inventory = inventory.to_vec();

    let (items_granted, items_rejected) = if current + incoming <= max_inventory_size as u64 {
        for stack in &selected {
            merge_stack(&mut new_inventory, stack);
        }
        (selected, Vec::new())
    } else {
        warn!(
            "Reward items rejected: inventory {} + {} exceeds capacity {}",
            current, incoming, max_inventory_size
        );
        (Vec::new(), selected)
    };

    let currency_granted = if accept_currency {
        pending.currency
    } else {
        Currency::ZERO
    };

    Settlement {
        items_granted,
        items_rejected,
        currency_granted,
        inventory: new_inventory,
        currency: wallet.deposit(currency_granted),
    }
}
