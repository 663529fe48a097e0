//! In-process event provider.
//!
//! Holds events the way the line provider does, behind the same
//! [`EventOracle`] contract as the HTTP client. Tests use it to stand in for
//! the provider: it can be switched offline and counts single-event lookups.

use crate::clients::EventOracle;
use crate::error::OracleError;
use crate::event::{Event, EventStatus};
use crate::money;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct EventBook {
    events: RwLock<HashMap<String, Event>>,
    offline: AtomicBool,
    lookups: AtomicUsize,
}

impl EventBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut book = Self::new();
        {
            let map = book.events.get_mut();
            for event in events {
                map.insert(event.event_id.clone(), event);
            }
        }
        book
    }

    /// Insert or replace an event.
    pub async fn upsert(&self, event: Event) {
        self.events.write().await.insert(event.event_id.clone(), event);
    }

    /// Returns false if the event is unknown.
    pub async fn set_status(&self, event_id: &str, status: EventStatus) -> bool {
        match self.events.write().await.get_mut(event_id) {
            Some(event) => {
                event.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn set_coefficient(&self, event_id: &str, coefficient: Decimal) -> bool {
        match self.events.write().await.get_mut(event_id) {
            Some(event) => {
                event.coefficient = money::fixed(coefficient);
                true
            }
            None => false,
        }
    }

    /// While offline every read fails with [`OracleError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Number of single-event lookups served or refused so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), OracleError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(OracleError::Unavailable("event book offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventOracle for EventBook {
    async fn fetch_event(&self, event_id: &str) -> Result<Option<Event>, OracleError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        Ok(self.events.read().await.get(event_id).cloned())
    }

    async fn fetch_all_events(&self) -> Result<Vec<Event>, OracleError> {
        self.ensure_online()?;
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn lookup_and_update() {
        let book = EventBook::with_events([Event::new("1", dec!(1.20), Utc::now() + Duration::seconds(600))]);

        assert!(book.fetch_event("missing").await.unwrap().is_none());
        assert!(book.set_status("1", EventStatus::FinishedWin).await);
        assert!(!book.set_status("missing", EventStatus::FinishedWin).await);

        let event = book.fetch_event("1").await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::FinishedWin);
        assert_eq!(book.lookups(), 2);
    }

    #[tokio::test]
    async fn offline_is_distinct_from_missing() {
        let book = EventBook::new();
        book.set_available(false);

        assert!(matches!(book.fetch_event("1").await, Err(OracleError::Unavailable(_))));
        assert!(book.fetch_all_events().await.is_err());

        book.set_available(true);
        assert!(book.fetch_event("1").await.unwrap().is_none());
    }
}
