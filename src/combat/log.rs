//! Narrated combat log
//!
//! Entries are produced in order by the engine and drained by the caller
//! after each step.

use serde::{Deserialize, Serialize};

/// Presentation category of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTag {
    /// Someone lost health
    Damage,
    /// Something in the player's favour: buffs, victory, rewards
    Heal,
    /// Rolls, misses, phase changes, rejected intents
    Info,
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogTag::Damage => write!(f, "damage"),
            LogTag::Heal => write!(f, "heal"),
            LogTag::Info => write!(f, "info"),
        }
    }
}

/// One narrated event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tag: LogTag,
    pub message: String,
}

/// Pending log entries not yet handed to the caller
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    entries: Vec<LogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: LogTag, message: impl Into<String>) {
        self.entries.push(LogEntry {
            tag,
            message: message.into(),
        });
    }

    pub fn damage(&mut self, message: impl Into<String>) {
        self.push(LogTag::Damage, message);
    }

    pub fn heal(&mut self, message: impl Into<String>) {
        self.push(LogTag::Heal, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogTag::Info, message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all pending entries in the order they were written
    pub fn drain(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }
}
