use crate::clients::EventOracle;
use crate::error::{OracleError, StoreError};
use crate::event::Event;
use crate::wager::Wager;
use crate::wager_store::WagerStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read-only views over wagers and bettable events.
pub struct QueryService {
    oracle: Arc<dyn EventOracle>,
    store: Arc<dyn WagerStore>,
}

impl QueryService {
    pub fn new(oracle: Arc<dyn EventOracle>, store: Arc<dyn WagerStore>) -> Self {
        Self { oracle, store }
    }

    /// Every wager, unfiltered.
    pub async fn list_wagers(&self) -> Result<Vec<Wager>, StoreError> {
        self.store.list_all().await
    }

    /// Events still accepting bets at `now`.
    pub async fn available_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, OracleError> {
        let events = self.oracle.fetch_all_events().await?;
        Ok(events.into_iter().filter(|e| e.is_open_at(now)).collect())
    }
}
