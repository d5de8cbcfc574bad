//! Gold/silver/copper wallet with 100:1 carry

use serde::{Deserialize, Serialize};

use crate::combat::RandomSource;

/// Units of a lower denomination per unit of the next higher one
pub const CARRY_RATIO: u64 = 100;

/// A tri-denomination amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub silver: u64,
    #[serde(default)]
    pub copper: u64,
}

impl Currency {
    pub const ZERO: Currency = Currency {
        gold: 0,
        silver: 0,
        copper: 0,
    };

    pub const fn new(gold: u64, silver: u64, copper: u64) -> Self {
        Self {
            gold,
            silver,
            copper,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Both lower denominations are below the carry ratio
    pub fn is_normalized(&self) -> bool {
        self.copper < CARRY_RATIO && self.silver < CARRY_RATIO
    }

    /// Carry copper into silver, then silver into gold.
    ///
    /// Copper is carried first so its overflow can push silver over the
    /// ratio and still be carried in the same pass.
    pub fn normalize(self) -> Self {
        let mut c = self;
        if c.copper >= CARRY_RATIO {
            c.silver += c.copper / CARRY_RATIO;
            c.copper %= CARRY_RATIO;
        }
        if c.silver >= CARRY_RATIO {
            c.gold += c.silver / CARRY_RATIO;
            c.silver %= CARRY_RATIO;
        }
        debug_assert!(c.is_normalized());
        c
    }

    /// Add two amounts and normalize the result
    pub fn deposit(self, other: Currency) -> Self {
        Currency {
            gold: self.gold + other.gold,
            silver: self.silver + other.silver,
            copper: self.copper + other.copper,
        }
        .normalize()
    }

    /// Total value in copper
    pub fn total_copper(&self) -> u64 {
        (self.gold * CARRY_RATIO + self.silver) * CARRY_RATIO + self.copper
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}g {}s {}c", self.gold, self.silver, self.copper)
    }
}

/// Optional bounds for one denomination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl CurrencyRange {
    pub const fn between(min: u32, max: u32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Draw an amount. Contributes 0 unless both bounds are present.
    pub fn roll(&self, rng: &mut impl RandomSource) -> u64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => rng.range_inclusive(min, max) as u64,
            _ => 0,
        }
    }
}

/// Currency drop bounds of a monster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRanges {
    #[serde(default)]
    pub gold: CurrencyRange,
    #[serde(default)]
    pub silver: CurrencyRange,
    #[serde(default)]
    pub copper: CurrencyRange,
}

impl CurrencyRanges {
    /// Roll gold, silver and copper in that order. The result is not normalized.
    pub fn roll(&self, rng: &mut impl RandomSource) -> Currency {
        let gold = self.gold.roll(rng);
        let silver = self.silver.roll(rng);
        let copper = self.copper.roll(rng);
        Currency::new(gold, silver, copper)
    }
}
