//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d20", "4d6-2".
//! All randomness flows through [`RandomSource`] so a session can be
//! replayed from a seed or driven by a fixed script.

use std::collections::VecDeque;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Die sizes a [`DiceSpec`] may use
pub const VALID_FACES: [u32; 6] = [4, 6, 8, 10, 12, 20];

/// Largest dice count a [`DiceSpec`] may roll
pub const MAX_DICE: u32 = 100;

/// Errors produced while building a dice specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("missing 'd' in dice notation: {0}")]
    MissingSeparator(String),

    #[error("invalid dice count: {0}")]
    InvalidCount(String),

    #[error("invalid die faces: {0}")]
    InvalidFaces(String),

    #[error("invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("dice count must be at least 1")]
    ZeroCount,

    #[error("too many dice: {0} (at most 100)")]
    TooManyDice(u32),

    #[error("unsupported die d{0} (expected one of d4, d6, d8, d10, d12, d20)")]
    UnsupportedFaces(u32),
}

/// Source of uniform random draws used by every roll in the engine
pub trait RandomSource {
    /// Uniform integer in `[1, faces]`
    fn roll_die(&mut self, faces: u32) -> u32;

    /// Uniform real in `[0, 100)`
    fn percentile(&mut self) -> f64;

    /// Uniform integer in `[min, max]` inclusive
    fn range_inclusive(&mut self, min: u32, max: u32) -> u32;
}

/// Adapter turning any [`rand::Rng`] into a [`RandomSource`]
#[derive(Debug, Clone)]
pub struct RngSource<R>(R);

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngSource<StdRng> {
    /// Deterministic generator for reproducible sessions
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn roll_die(&mut self, faces: u32) -> u32 {
        self.0.random_range(1..=faces.max(1))
    }

    fn percentile(&mut self) -> f64 {
        self.0.random_range(0.0..100.0)
    }

    fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.0.random_range(lo..=hi)
    }
}

/// Replays fixed values in order.
///
/// Each kind of draw has its own queue. An exhausted queue yields the lowest
/// value of the requested range. Scripted die values are clamped into
/// `[1, faces]`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    dice: VecDeque<u32>,
    percentiles: VecDeque<f64>,
    ranges: VecDeque<u32>,
}

impl ScriptedSource {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue die results
    pub fn with_dice(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.dice.extend(values);
        self
    }

    /// Queue percentile draws
    pub fn with_percentiles(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.percentiles.extend(values);
        self
    }

    /// Queue inclusive-range draws
    pub fn with_ranges(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.ranges.extend(values);
        self
    }

    /// Number of die results not yet consumed
    pub fn dice_remaining(&self) -> usize {
        self.dice.len()
    }
}

impl RandomSource for ScriptedSource {
    fn roll_die(&mut self, faces: u32) -> u32 {
        self.dice.pop_front().unwrap_or(1).clamp(1, faces.max(1))
    }

    fn percentile(&mut self) -> f64 {
        self.percentiles.pop_front().unwrap_or(0.0)
    }

    fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.ranges.pop_front().unwrap_or(lo).clamp(lo, hi)
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceSpec {
    /// Number of dice to roll
    pub count: u32,
    /// Number of faces per die
    pub faces: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

impl DiceSpec {
    /// Default unarmed strike
    pub const UNARMED: DiceSpec = DiceSpec {
        count: 1,
        faces: 6,
        modifier: 0,
    };

    /// Create a dice spec without validation
    pub const fn new(count: u32, faces: u32, modifier: i32) -> Self {
        Self {
            count,
            faces,
            modifier,
        }
    }

    /// Create a dice spec, rejecting zero or oversized counts and unsupported dice
    pub fn new_checked(count: u32, faces: u32, modifier: i32) -> Result<Self, DiceError> {
        if count == 0 {
            return Err(DiceError::ZeroCount);
        }
        if count > MAX_DICE {
            return Err(DiceError::TooManyDice(count));
        }
        if !VALID_FACES.contains(&faces) {
            return Err(DiceError::UnsupportedFaces(faces));
        }
        Ok(Self::new(count, faces, modifier))
    }

    /// Sum of the dice without the modifier
    pub fn roll_dice(&self, rng: &mut impl RandomSource) -> i32 {
        roll_dice(rng, self.count, self.faces)
    }

    /// Roll the dice and add the modifier
    pub fn roll(&self, rng: &mut impl RandomSource) -> i32 {
        self.roll_dice(rng).saturating_add(self.modifier)
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        clamp_i32(self.count as i64 + self.modifier as i64)
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        clamp_i32(self.count as i64 * self.faces as i64 + self.modifier as i64)
    }
}

impl FromStr for DiceSpec {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl TryFrom<String> for DiceSpec {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_dice(&value)
    }
}

impl From<DiceSpec> for String {
    fn from(spec: DiceSpec) -> Self {
        spec.to_string()
    }
}

impl std::fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.faces, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.faces, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.faces)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceSpec, DiceError> {
    let notation = notation.trim().to_lowercase();

    let d_pos = notation
        .find('d')
        .ok_or_else(|| DiceError::MissingSeparator(notation.clone()))?;

    // "d6" means "1d6"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| DiceError::InvalidCount(count_str.to_string()))?
    };

    let rest = &notation[d_pos + 1..];
    let (faces_str, modifier) = match rest.find(['+', '-']) {
        Some(pos) => {
            let mod_str = rest[pos..].trim_start_matches('+');
            let modifier: i32 = mod_str
                .parse()
                .map_err(|_| DiceError::InvalidModifier(rest[pos..].to_string()))?;
            (&rest[..pos], modifier)
        }
        None => (rest, 0),
    };

    let faces: u32 = faces_str
        .parse()
        .map_err(|_| DiceError::InvalidFaces(faces_str.to_string()))?;

    DiceSpec::new_checked(count, faces, modifier)
}

/// Sum of `count` independent uniform draws over `[1, faces]`
pub fn roll_dice(rng: &mut impl RandomSource, count: u32, faces: u32) -> i32 {
    let total: i64 = (0..count).map(|_| rng.roll_die(faces) as i64).sum();
    clamp_i32(total)
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
