//! Wager Storage
//! Durable wager records keyed by bet id, with SQLite underneath.

use crate::error::StoreError;
use crate::wager::{Settlement, Wager, WagerStatus};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait WagerStore: Send + Sync {
    /// Persist a new wager in one atomic write.
    async fn insert(&self, wager: &Wager) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<Vec<Wager>, StoreError>;

    /// Consistent snapshot of every wager still `PENDING`.
    async fn list_pending(&self) -> Result<Vec<Wager>, StoreError>;

    /// Commit a batch of settlements all-or-nothing.
    ///
    /// Only rows that are still `PENDING` are touched, so a wager can never
    /// transition twice. Returns the number of rows that changed.
    async fn apply_settlements(&self, batch: &[Settlement]) -> Result<usize, StoreError>;
}

const SELECT_COLUMNS: &str = "SELECT bet_id, event_id, amount, status, coefficient FROM bets";

#[derive(Clone)]
pub struct SqliteWagerStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWagerStore {
    /// Open (or create) the database file. `:memory:` gives a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bets (
                bet_id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                amount TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                coefficient TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_bets_event_id ON bets(event_id);
            CREATE INDEX IF NOT EXISTS idx_bets_status ON bets(status);",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool. The lock is held
    /// for the whole call, so one call is one unit of work.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn select_wagers<P: rusqlite::Params>(conn: &Connection, sql: &str, args: P) -> Result<Vec<Wager>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(args, WagerRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(WagerRow::into_wager).collect()
}

#[async_trait]
impl WagerStore for SqliteWagerStore {
    async fn insert(&self, wager: &Wager) -> Result<(), StoreError> {
        let wager = wager.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO bets (bet_id, event_id, amount, status, coefficient)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    wager.bet_id.to_string(),
                    wager.event_id,
                    wager.amount.to_string(),
                    wager.status.as_str(),
                    wager.coefficient.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Wager>, StoreError> {
        self.with_conn(|conn| select_wagers(conn, &format!("{SELECT_COLUMNS} ORDER BY rowid"), []))
            .await
    }

    async fn list_pending(&self) -> Result<Vec<Wager>, StoreError> {
        self.with_conn(|conn| {
            select_wagers(
                conn,
                &format!("{SELECT_COLUMNS} WHERE status = ?1 ORDER BY rowid"),
                params![WagerStatus::Pending.as_str()],
            )
        })
        .await
    }

    async fn apply_settlements(&self, batch: &[Settlement]) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let batch = batch.to_vec();
        let total = batch.len();
        let changed = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut changed = 0;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE bets SET status = ?1 WHERE bet_id = ?2 AND status = 'PENDING'",
                    )?;
                    for settlement in &batch {
                        changed += stmt.execute(params![
                            settlement.status.as_str(),
                            settlement.bet_id.to_string()
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(changed)
            })
            .await?;

        info!("💾 Committed {} of {} settlements", changed, total);
        Ok(changed)
    }
}

// Raw column values; decoding happens outside the rusqlite closure so a bad
// row reports which bet it was.
struct WagerRow {
    bet_id: String,
    event_id: String,
    amount: String,
    status: String,
    coefficient: String,
}

impl WagerRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bet_id: row.get(0)?,
            event_id: row.get(1)?,
            amount: row.get(2)?,
            status: row.get(3)?,
            coefficient: row.get(4)?,
        })
    }

    fn into_wager(self) -> Result<Wager, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            bet_id: self.bet_id.clone(),
            reason,
        };

        let bet_id = Uuid::parse_str(&self.bet_id).map_err(|e| corrupt(e.to_string()))?;
        let amount = Decimal::from_str(&self.amount).map_err(|e| corrupt(e.to_string()))?;
        let coefficient = Decimal::from_str(&self.coefficient).map_err(|e| corrupt(e.to_string()))?;
        let status = WagerStatus::from_str(&self.status).map_err(|e| corrupt(e.to_string()))?;

        Ok(Wager {
            bet_id,
            event_id: self.event_id,
            amount,
            status,
            coefficient,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn wager(event_id: &str) -> Wager {
        let event = Event::new(event_id, dec!(1.20), Utc::now() + Duration::seconds(600));
        Wager::place(&event, dec!(100))
    }

    #[tokio::test]
    async fn insert_and_list() {
        let store = SqliteWagerStore::in_memory().unwrap();
        let first = wager("1");
        let second = wager("2");
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all, vec![first, second]);
        assert_eq!(all[0].amount.to_string(), "100.00");
        assert_eq!(all[0].coefficient.to_string(), "1.20");
    }

    #[tokio::test]
    async fn duplicate_bet_id_is_rejected() {
        let store = SqliteWagerStore::in_memory().unwrap();
        let w = wager("1");
        store.insert(&w).await.unwrap();
        assert!(store.insert(&w).await.is_err());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settlements_only_touch_pending_rows() {
        let store = SqliteWagerStore::in_memory().unwrap();
        let won = wager("1");
        let lost = wager("2");
        let open = wager("3");
        for w in [&won, &lost, &open] {
            store.insert(w).await.unwrap();
        }

        let batch = [
            Settlement { bet_id: won.bet_id, status: WagerStatus::Won },
            Settlement { bet_id: lost.bet_id, status: WagerStatus::Lost },
        ];
        assert_eq!(store.apply_settlements(&batch).await.unwrap(), 2);

        // Replaying, even with a different outcome, changes nothing.
        let replay = [Settlement { bet_id: won.bet_id, status: WagerStatus::Lost }];
        assert_eq!(store.apply_settlements(&replay).await.unwrap(), 0);

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending, vec![open]);

        let all = store.list_all().await.unwrap();
        assert_eq!(all[0].status, WagerStatus::Won);
        assert_eq!(all[1].status, WagerStatus::Lost);
    }

    #[tokio::test]
    async fn corrupt_row_is_reported() {
        let store = SqliteWagerStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO bets (bet_id, event_id, amount, status, coefficient)
                 VALUES ('not-a-uuid', '1', '1.00', 'PENDING', '1.20')",
                [],
            )
            .unwrap();
        }

        match store.list_all().await {
            Err(StoreError::Corrupt { bet_id, .. }) => assert_eq!(bet_id, "not-a-uuid"),
            other => panic!("expected corrupt row, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bets.db");

        let w = wager("1");
        SqliteWagerStore::open(&path).unwrap().insert(&w).await.unwrap();

        let reopened = SqliteWagerStore::open(&path).unwrap();
        assert_eq!(reopened.list_all().await.unwrap(), vec![w]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn inserts_interleave_with_a_settlement_batch() {
        let store = SqliteWagerStore::in_memory().unwrap();
        let settled = wager("1");
        store.insert(&settled).await.unwrap();

        let fresh: Vec<Wager> = (0..20).map(|_| wager("1")).collect();
        let inserts = futures::future::join_all(fresh.iter().map(|w| store.insert(w)));
        let batch = [Settlement { bet_id: settled.bet_id, status: WagerStatus::Won }];
        let (inserted, changed) = tokio::join!(inserts, store.apply_settlements(&batch));

        assert!(inserted.into_iter().all(|r| r.is_ok()));
        assert_eq!(changed.unwrap(), 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 21);
        assert_eq!(all[0].status, WagerStatus::Won);
        assert!(all[1..].iter().all(|w| w.status == WagerStatus::Pending));
    }
}
