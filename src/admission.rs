use crate::clients::EventOracle;
use crate::error::PlacementError;
use crate::event::EventStatus;
use crate::money;
use crate::wager::Wager;
use crate::wager_store::WagerStore;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Admits new wagers after checking the event's live state.
///
/// The event read and the insert are not one transaction: an event that
/// closes between the two still gets the wager, and the settlement loop
/// resolves it on its next sweep.
pub struct AdmissionController {
    oracle: Arc<dyn EventOracle>,
    store: Arc<dyn WagerStore>,
}

impl AdmissionController {
    pub fn new(oracle: Arc<dyn EventOracle>, store: Arc<dyn WagerStore>) -> Self {
        Self { oracle, store }
    }

    /// Place a bet and return its id. Nothing is written unless every check
    /// passes.
    pub async fn place_bet(&self, event_id: &str, amount: Decimal) -> Result<Uuid, PlacementError> {
        if !money::is_valid_amount(amount) {
            return Err(PlacementError::InvalidAmount);
        }

        let event = match self.oracle.fetch_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => return Err(PlacementError::EventNotFound(event_id.to_string())),
            Err(e) => {
                warn!("Cannot place bet on {}: {}", event_id, e);
                return Err(e.into());
            }
        };

        if event.deadline <= Utc::now() {
            return Err(PlacementError::DeadlineExpired(event.event_id));
        }
        if event.status != EventStatus::New {
            return Err(PlacementError::EventClosed(event.event_id));
        }

        let wager = Wager::place(&event, amount);
        self.store.insert(&wager).await?;

        info!(
            "📝 Bet {} placed on event {}: {} @ {}",
            wager.bet_id, wager.event_id, wager.amount, wager.coefficient
        );
        Ok(wager.bet_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::event_book::EventBook;
    use crate::wager::WagerStatus;
    use crate::wager_store::SqliteWagerStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn setup(events: Vec<Event>) -> (Arc<EventBook>, Arc<SqliteWagerStore>, AdmissionController) {
        let book = Arc::new(EventBook::with_events(events));
        let store = Arc::new(SqliteWagerStore::in_memory().unwrap());
        let admission = AdmissionController::new(book.clone(), store.clone());
        (book, store, admission)
    }

    fn open_event(id: &str) -> Event {
        Event::new(id, dec!(1.20), Utc::now() + Duration::seconds(600))
    }

    #[tokio::test]
    async fn accepts_open_event() {
        let (book, store, admission) = setup(vec![open_event("1")]);

        let bet_id = admission.place_bet("1", dec!(100.00)).await.unwrap();

        let wagers = store.list_all().await.unwrap();
        assert_eq!(wagers.len(), 1);
        assert_eq!(wagers[0].bet_id, bet_id);
        assert_eq!(wagers[0].status, WagerStatus::Pending);
        assert_eq!(wagers[0].coefficient, dec!(1.20));
        assert_eq!(book.lookups(), 1);
    }

    #[tokio::test]
    async fn rejects_expired_deadline() {
        let expired = open_event("1").with_deadline(Utc::now() - Duration::seconds(1));
        let (_, store, admission) = setup(vec![expired]);

        let err = admission.place_bet("1", dec!(10)).await.unwrap_err();
        assert!(matches!(err, PlacementError::DeadlineExpired(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_finished_event() {
        let finished = open_event("1").with_status(EventStatus::FinishedWin);
        let (_, store, admission) = setup(vec![finished]);

        let err = admission.place_bet("1", dec!(10)).await.unwrap_err();
        assert!(matches!(err, PlacementError::EventClosed(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_event_and_outage_are_distinct() {
        let (book, store, admission) = setup(vec![]);

        let err = admission.place_bet("404", dec!(10)).await.unwrap_err();
        assert!(matches!(err, PlacementError::EventNotFound(_)));

        book.set_available(false);
        let err = admission.place_bet("404", dec!(10)).await.unwrap_err();
        assert!(matches!(err, PlacementError::UpstreamError(_)));

        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_amount_skips_oracle() {
        let (book, _, admission) = setup(vec![open_event("1")]);

        for amount in [dec!(0), dec!(-1), dec!(1.001)] {
            let err = admission.place_bet("1", amount).await.unwrap_err();
            assert!(matches!(err, PlacementError::InvalidAmount));
        }
        assert_eq!(book.lookups(), 0);
    }
}
