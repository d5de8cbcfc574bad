//! Encounter service
//!
//! Owns the running sessions and sits between them and the collaborators:
//! - Looks up catalog records and stored character state at session start
//! - Serializes intents per session (a second concurrent intent is refused)
//! - Persists each step's changes before committing it to the live session

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError, CharacterState};
use crate::combat::{CombatSession, EncounterSnapshot, Intent, RngSource, SessionView, StepOutcome};
use crate::config::Config;
use crate::store::{CharacterStore, StoreError};

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown session: {0}")]
    UnknownSession(Uuid),

    #[error("session {0} is already processing an intent")]
    SessionBusy(Uuid),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct ActiveSession {
    character_id: String,
    session: CombatSession,
}

/// Registry of running encounters
pub struct EncounterService<C, S> {
    catalog: Arc<C>,
    store: Arc<S>,
    config: Config,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ActiveSession>>>>,
    /// Sessions started so far, mixed into the configured seed
    started: AtomicU64,
}

/// Seed for the `index`-th session of a service seeded with `base`.
/// The first session uses `base` unchanged.
pub fn session_seed(base: u64, index: u64) -> u64 {
    base ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl<C: Catalog, S: CharacterStore> EncounterService<C, S> {
    pub fn new(catalog: Arc<C>, store: Arc<S>, config: Config) -> Self {
        Self {
            catalog,
            store,
            config,
            sessions: RwLock::new(HashMap::new()),
            started: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start an encounter. Characters without stored state start fresh.
    pub async fn start(
        &self,
        character_id: &str,
        monster_id: &str,
    ) -> Result<(Uuid, SessionView), ServiceError> {
        let character = self.catalog.character(character_id)?;
        let monster = self.catalog.monster(monster_id)?;
        let state = match self.store.load(character_id).await? {
            Some(state) => state,
            None => CharacterState::fresh(&character),
        };

        let index = self.started.fetch_add(1, Ordering::Relaxed);
        let rng = match self.config.seed {
            Some(seed) => RngSource::seeded(session_seed(seed, index)),
            None => RngSource::from_entropy(),
        };

        let snapshot = EncounterSnapshot {
            character,
            state,
            monster,
            max_inventory_size: self.config.max_inventory_size,
        };
        let session = CombatSession::new(snapshot, rng)
            .with_auto_monster_turn(self.config.auto_monster_turn);
        let view = session.view();

        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            Arc::new(Mutex::new(ActiveSession {
                character_id: character_id.to_string(),
                session,
            })),
        );

        info!(
            "Session {} started: {} vs {} ({} HP)",
            id, character_id, monster_id, view.monster_health
        );
        Ok((id, view))
    }

    /// Apply one intent.
    ///
    /// The step runs against a copy of the session. If persisting its
    /// changes fails, the error is returned and the session stays as it
    /// was before the intent.
    pub async fn apply(&self, id: Uuid, intent: Intent) -> Result<StepOutcome, ServiceError> {
        let entry = self.session(id).await?;
        let mut active = entry
            .try_lock()
            .map_err(|_| ServiceError::SessionBusy(id))?;

        let mut next = active.session.clone();
        let outcome = next.apply(intent);

        if outcome.needs_persist() {
            let state = next.character_state();
            if let Err(e) = self.persist(&active.character_id, &state, &outcome).await {
                warn!("Session {}: persisting step failed: {}", id, e);
                return Err(e.into());
            }
        }

        active.session = next;
        Ok(outcome)
    }

    async fn persist(
        &self,
        character_id: &str,
        state: &CharacterState,
        outcome: &StepOutcome,
    ) -> Result<(), StoreError> {
        self.store.save(character_id, state).await?;
        if let Some(settlement) = &outcome.settlement {
            self.store.record_settlement(character_id, settlement).await?;
        }
        Ok(())
    }

    /// Current view of a session
    pub async fn view(&self, id: Uuid) -> Result<SessionView, ServiceError> {
        let entry = self.session(id).await?;
        let active = entry.lock().await;
        Ok(active.session.view())
    }

    /// Tear down a session, discarding its buffs and cooldowns
    pub async fn end_session(&self, id: Uuid) -> Result<SessionView, ServiceError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(ServiceError::UnknownSession(id))?;
        let active = entry.lock().await;
        let view = active.session.view();
        info!("Session {} ended in phase {}", id, view.phase);
        Ok(view)
    }

    /// Number of running sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<ActiveSession>>, ServiceError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ServiceError::UnknownSession(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use crate::catalog::{CharacterRecord, Equipment, MemoryCatalog, MonsterDefinition};
    use crate::combat::{Attributes, DiceSpec, Difficulty, Phase};
    use crate::loot::{CurrencyRanges, Settlement};
    use crate::store::MemoryStore;

    fn catalog() -> Arc<MemoryCatalog> {
        let mut catalog = MemoryCatalog::new();
        catalog.insert_character(CharacterRecord {
            id: "hero".into(),
            name: "Aria".into(),
            attributes: Attributes::new(),
            max_health: 500,
            base_attack: 0,
            base_defense: 5,
            equipment: Equipment::default(),
            abilities: vec![],
        });
        // Never misses, never dies quickly
        catalog.insert_monster(MonsterDefinition {
            id: "golem".into(),
            name: "Golem".into(),
            health: DiceSpec::new(1, 4, 100),
            attack: 100,
            defense: 50,
            damage: DiceSpec::new(1, 4, 0),
            difficulty: Difficulty::Easy,
            loot_table: vec![],
            currency: CurrencyRanges::default(),
        });
        Arc::new(catalog)
    }

    fn config() -> Config {
        Config {
            seed: Some(7),
            ..Config::default()
        }
    }

    /// Store whose writes can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    impl CharacterStore for FlakyStore {
        async fn load(&self, character_id: &str) -> Result<Option<CharacterState>, StoreError> {
            self.inner.load(character_id).await
        }

        async fn save(&self, character_id: &str, state: &CharacterState) -> Result<(), StoreError> {
            self.check()?;
            self.inner.save(character_id, state).await
        }

        async fn record_settlement(
            &self,
            character_id: &str,
            settlement: &Settlement,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner.record_settlement(character_id, settlement).await
        }
    }

    /// Drive a session until the monster is about to act
    async fn reach_monster_turn<S: CharacterStore>(service: &EncounterService<MemoryCatalog, S>, id: Uuid) {
        let outcome = service.apply(id, Intent::RollInitiative).await.unwrap();
        if outcome.view.phase == Phase::PlayerTurn {
            service.apply(id, Intent::BasicAttack).await.unwrap();
        }
        assert_eq!(service.view(id).await.unwrap().phase, Phase::MonsterTurn);
    }

    #[tokio::test]
    async fn test_start_unknown_records() {
        let service = EncounterService::new(catalog(), MemoryStore::shared(), config());
        assert!(matches!(
            service.start("nobody", "golem").await,
            Err(ServiceError::Catalog(CatalogError::UnknownCharacter(_)))
        ));
        assert!(matches!(
            service.start("hero", "nothing").await,
            Err(ServiceError::Catalog(CatalogError::UnknownMonster(_)))
        ));
        assert_eq!(service.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_start_uses_stored_state() {
        let store = MemoryStore::shared();
        let mut state = CharacterState::fresh(&catalog().character("hero").unwrap());
        state.health = 42;
        store.save("hero", &state).await.unwrap();

        let service = EncounterService::new(catalog(), store, config());
        let (_, view) = service.start("hero", "golem").await.unwrap();
        assert_eq!(view.player_health, 42);
        assert_eq!(view.phase, Phase::AwaitingInitiative);
        assert!(view.monster_health >= 101);
    }

    #[tokio::test]
    async fn test_health_change_is_persisted() {
        let store = MemoryStore::shared();
        let service = EncounterService::new(catalog(), store.clone(), config());
        let (id, _) = service.start("hero", "golem").await.unwrap();

        reach_monster_turn(&service, id).await;
        let outcome = service.apply(id, Intent::Advance).await.unwrap();
        assert!(outcome.health_changed);

        let saved = store.load("hero").await.unwrap().unwrap();
        assert_eq!(saved.health, outcome.view.player_health);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_session_untouched() {
        let store = Arc::new(FlakyStore::default());
        let service = EncounterService::new(catalog(), store.clone(), config());
        let (id, _) = service.start("hero", "golem").await.unwrap();
        reach_monster_turn(&service, id).await;
        let before = service.view(id).await.unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let result = service.apply(id, Intent::Advance).await;
        assert!(matches!(result, Err(ServiceError::Store(_))));
        assert_eq!(service.view(id).await.unwrap(), before);

        store.failing.store(false, Ordering::SeqCst);
        let outcome = service.apply(id, Intent::Advance).await.unwrap();
        assert!(outcome.view.player_health < before.player_health);
        assert_eq!(outcome.view.phase, Phase::PlayerTurn);
    }

    #[tokio::test]
    async fn test_concurrent_intent_is_refused() {
        let service = EncounterService::new(catalog(), MemoryStore::shared(), config());
        let (id, _) = service.start("hero", "golem").await.unwrap();

        let entry = service.session(id).await.unwrap();
        let _guard = entry.lock().await;
        assert!(matches!(
            service.apply(id, Intent::RollInitiative).await,
            Err(ServiceError::SessionBusy(busy)) if busy == id
        ));
    }

    #[test]
    fn test_session_seeds_differ() {
        assert_eq!(session_seed(7, 0), 7);
        let seeds: std::collections::HashSet<u64> = (0..100).map(|i| session_seed(7, i)).collect();
        assert_eq!(seeds.len(), 100);
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_roll_streams() {
        let mut catalog = (*catalog()).clone();
        let mut monster = catalog.monster("golem").unwrap();
        monster.health = DiceSpec::new(100, 20, 0);
        catalog.insert_monster(monster);
        let catalog = Arc::new(catalog);
        let service = EncounterService::new(catalog.clone(), MemoryStore::shared(), config());

        let mut healths = Vec::new();
        for _ in 0..3 {
            let (_, view) = service.start("hero", "golem").await.unwrap();
            healths.push(view.monster_health);
        }
        assert!(healths.windows(2).any(|w| w[0] != w[1]), "{:?}", healths);

        // The same configuration replays the same sequence
        let replay = EncounterService::new(catalog, MemoryStore::shared(), config());
        for expected in healths {
            let (_, view) = replay.start("hero", "golem").await.unwrap();
            assert_eq!(view.monster_health, expected);
        }
    }

    #[tokio::test]
    async fn test_end_session() {
        let service = EncounterService::new(catalog(), MemoryStore::shared(), config());
        let (id, _) = service.start("hero", "golem").await.unwrap();

        let outcome = service.apply(id, Intent::Escape).await.unwrap();
        assert!(outcome.view.phase.is_resolved());

        service.end_session(id).await.unwrap();
        assert_eq!(service.session_count().await, 0);
        assert!(matches!(
            service.apply(id, Intent::BasicAttack).await,
            Err(ServiceError::UnknownSession(_))
        ));
        assert!(matches!(
            service.end_session(id).await,
            Err(ServiceError::UnknownSession(_))
        ));
    }
}
