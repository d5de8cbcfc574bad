//! Character persistence
//!
//! The engine only produces state; stores decide where it lives. Two
//! implementations are provided:
//! - `MemoryStore`: process-local, for tests and one-off runs
//! - `SqliteStore`: durable, backed by SQLite

mod sqlite;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::CharacterState;
use crate::loot::Settlement;

pub use sqlite::SqliteStore;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write contract for persisted character state
pub trait CharacterStore: Send + Sync {
    /// Current state, or None if the character has never been saved
    fn load(
        &self,
        character_id: &str,
    ) -> impl Future<Output = Result<Option<CharacterState>, StoreError>> + Send;

    /// Replace the stored state
    fn save(
        &self,
        character_id: &str,
        state: &CharacterState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append a settled reward to the character's history
    fn record_settlement(
        &self,
        character_id: &str,
        settlement: &Settlement,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, CharacterState>>,
    settlements: RwLock<HashMap<String, Vec<Settlement>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Settlements recorded for a character, oldest first
    pub async fn settlements(&self, character_id: &str) -> Vec<Settlement> {
        self.settlements
            .read()
            .await
            .get(character_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl CharacterStore for MemoryStore {
    async fn load(&self, character_id: &str) -> Result<Option<CharacterState>, StoreError> {
        Ok(self.states.read().await.get(character_id).cloned())
    }

    async fn save(&self, character_id: &str, state: &CharacterState) -> Result<(), StoreError> {
        debug!("Saving {}: {} HP, {}", character_id, state.health, state.currency);
        self.states
            .write()
            .await
            .insert(character_id.to_string(), state.clone());
        Ok(())
    }

    async fn record_settlement(
        &self,
        character_id: &str,
        settlement: &Settlement,
    ) -> Result<(), StoreError> {
        self.settlements
            .write()
            .await
            .entry(character_id.to_string())
            .or_default()
            .push(settlement.clone());
        Ok(())
    }
}
