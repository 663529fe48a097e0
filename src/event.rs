use crate::money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle of an event as reported by the line provider.
///
/// Once an event leaves `New` it never returns to it. Status strings this
/// service does not know are read as `Closed`, a non-winning terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    New,
    FinishedWin,
    FinishedLose,
    #[serde(other)]
    Closed,
}

impl EventStatus {
    pub fn is_final(self) -> bool {
        self != EventStatus::New
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_id: String,
    #[serde(deserialize_with = "fixed_decimal")]
    pub coefficient: Decimal,
    /// Unix seconds on the wire.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub deadline: DateTime<Utc>,
    pub status: EventStatus,
}

impl Event {
    pub fn new(event_id: impl Into<String>, coefficient: Decimal, deadline: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            coefficient: money::fixed(coefficient),
            deadline,
            status: EventStatus::New,
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Still accepting bets at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::New && self.deadline > now
    }
}

// The provider sends coefficients as JSON numbers; rust_decimal parses them
// through their shortest decimal text, so `1.2` stays exactly 1.20.
fn fixed_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    <Decimal as Deserialize>::deserialize(deserializer).map(money::fixed)
}
