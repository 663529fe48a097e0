use crate::event::{Event, EventStatus};
use crate::money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WagerStatus {
    Pending, // Placed, waiting for the event to finish
    Won,
    Lost,
}

impl WagerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WagerStatus::Pending => "PENDING",
            WagerStatus::Won => "WON",
            WagerStatus::Lost => "LOST",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != WagerStatus::Pending
    }
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown wager status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for WagerStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(WagerStatus::Pending),
            "WON" => Ok(WagerStatus::Won),
            "LOST" => Ok(WagerStatus::Lost),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wager {
    pub bet_id: Uuid,
    pub event_id: String,
    pub amount: Decimal,
    pub status: WagerStatus,
    pub coefficient: Decimal, // Snapshot taken at placement
}

impl Wager {
    /// New pending wager against `event`, freezing its current coefficient.
    pub fn place(event: &Event, amount: Decimal) -> Self {
        Self {
            bet_id: Uuid::new_v4(),
            event_id: event.event_id.clone(),
            amount: money::fixed(amount),
            status: WagerStatus::Pending,
            coefficient: event.coefficient,
        }
    }

    /// Transition this wager would take given the event's current state.
    ///
    /// `None` while the event is still open, and always `None` once the wager
    /// is terminal, so replaying a settlement can never move it again.
    pub fn settlement_against(&self, event: &Event) -> Option<Settlement> {
        if self.status.is_terminal() {
            return None;
        }
        outcome_for(event.status).map(|status| Settlement {
            bet_id: self.bet_id,
            status,
        })
    }
}

/// Wager status implied by a finished event. `None` while the event is open.
pub fn outcome_for(status: EventStatus) -> Option<WagerStatus> {
    match status {
        EventStatus::New => None,
        EventStatus::FinishedWin => Some(WagerStatus::Won),
        EventStatus::FinishedLose | EventStatus::Closed => Some(WagerStatus::Lost),
    }
}

/// A single `PENDING -> WON | LOST` transition to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub bet_id: Uuid,
    pub status: WagerStatus,
}
