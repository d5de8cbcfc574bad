//! Loot and currency module
//!
//! Rolls drops for a defeated monster and settles the accepted rewards into
//! a character's inventory and wallet.

mod currency;
mod rewards;

pub use currency::{Currency, CurrencyRange, CurrencyRanges, CARRY_RATIO};
pub use rewards::{
    inventory_size, merge_stack, roll_rewards, settle_rewards, ItemStack, LootTableEntry,
    PendingRewards, Settlement,
};
