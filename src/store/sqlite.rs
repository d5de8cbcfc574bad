//! SQLite-backed character store

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::{CharacterStore, StoreError};
use crate::catalog::CharacterState;
use crate::loot::{Currency, ItemStack, Settlement};

/// Character store wrapping a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and migrate) a database.
    /// If path is None, uses an in-memory database (for testing).
    pub async fn open(path: Option<&str>) -> Result<Self, StoreError> {
        let conn_str = match path {
            Some(p) => format!("sqlite:{}?mode=rwc", p),
            None => "sqlite::memory:".to_string(),
        };

        let options = SqliteConnectOptions::from_str(&conn_str)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        // Every in-memory connection is its own database, so keep exactly one alive
        let pool_options = match path {
            Some(_) => SqlitePoolOptions::new().max_connections(10),
            None => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id TEXT PRIMARY KEY,
                health INTEGER NOT NULL,
                gold INTEGER NOT NULL DEFAULT 0,
                silver INTEGER NOT NULL DEFAULT 0,
                copper INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                character_id TEXT NOT NULL REFERENCES characters(id),
                slot INTEGER NOT NULL,
                item_id TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                PRIMARY KEY (character_id, slot)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Reward history, for auditing
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reward_log (
                id TEXT PRIMARY KEY,
                character_id TEXT NOT NULL,
                items_granted TEXT NOT NULL,
                items_rejected TEXT NOT NULL,
                gold INTEGER NOT NULL,
                silver INTEGER NOT NULL,
                copper INTEGER NOT NULL,
                settled_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reward_log_character ON reward_log(character_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of settlements recorded for a character
    pub async fn settlement_count(&self, character_id: &str) -> Result<i64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reward_log WHERE character_id = ?")
                .bind(character_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn to_db(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

fn from_db(amount: i64) -> u64 {
    amount.max(0) as u64
}

impl CharacterStore for SqliteStore {
    async fn load(&self, character_id: &str) -> Result<Option<CharacterState>, StoreError> {
        let row: Option<(i32, i64, i64, i64)> =
            sqlx::query_as("SELECT health, gold, silver, copper FROM characters WHERE id = ?")
                .bind(character_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((health, gold, silver, copper)) = row else {
            return Ok(None);
        };

        let items: Vec<(String, i64)> = sqlx::query_as(
            "SELECT item_id, quantity FROM inventory WHERE character_id = ? ORDER BY slot",
        )
        .bind(character_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CharacterState {
            health,
            inventory: items
                .into_iter()
                .map(|(item_id, quantity)| ItemStack::new(item_id, quantity.max(0) as u32))
                .collect(),
            currency: Currency::new(from_db(gold), from_db(silver), from_db(copper)),
        }))
    }

    async fn save(&self, character_id: &str, state: &CharacterState) -> Result<(), StoreError> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO characters (id, health, gold, silver, copper, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                health = excluded.health,
                gold = excluded.gold,
                silver = excluded.silver,
                copper = excluded.copper,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(character_id)
        .bind(state.health)
        .bind(to_db(state.currency.gold))
        .bind(to_db(state.currency.silver))
        .bind(to_db(state.currency.copper))
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM inventory WHERE character_id = ?")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;

        for (slot, stack) in state.inventory.iter().enumerate() {
            sqlx::query(
                "INSERT INTO inventory (character_id, slot, item_id, quantity) VALUES (?, ?, ?, ?)",
            )
            .bind(character_id)
            .bind(slot as i64)
            .bind(&stack.item_id)
            .bind(stack.quantity as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_settlement(
        &self,
        character_id: &str,
        settlement: &Settlement,
    ) -> Result<(), StoreError> {
        let granted = serde_json::to_string(&settlement.items_granted)?;
        let rejected = serde_json::to_string(&settlement.items_rejected)?;
        let currency = settlement.currency_granted;

        sqlx::query(
            r#"
            INSERT INTO reward_log
            (id, character_id, items_granted, items_rejected, gold, silver, copper, settled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(character_id)
        .bind(&granted)
        .bind(&rejected)
        .bind(to_db(currency.gold))
        .bind(to_db(currency.silver))
        .bind(to_db(currency.copper))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
