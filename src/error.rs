use thiserror::Error;

/// Failure talking to the event provider.
///
/// A missing event is not an error: lookups return `Ok(None)` for that case so
/// callers can tell a permanent "no such event" apart from a transient outage.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("event provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wager store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt wager record {bet_id}: {reason}")]
    Corrupt { bet_id: String, reason: String },
    #[error("wager store task failed: {0}")]
    Task(String),
}

/// Reasons a bet placement is rejected. No wager is written for any of them.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("amount must be positive with at most 2 decimal places and 10 digits")]
    InvalidAmount,
    #[error("event {0} not found")]
    EventNotFound(String),
    #[error("betting deadline for event {0} has passed")]
    DeadlineExpired(String),
    #[error("event {0} is already finished")]
    EventClosed(String),
    #[error(transparent)]
    UpstreamError(#[from] OracleError),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl PlacementError {
    /// Stable machine-readable code for API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementError::InvalidAmount => "INVALID_AMOUNT",
            PlacementError::EventNotFound(_) => "EVENT_NOT_FOUND",
            PlacementError::DeadlineExpired(_) => "DEADLINE_EXPIRED",
            PlacementError::EventClosed(_) => "EVENT_CLOSED",
            PlacementError::UpstreamError(_) => "UPSTREAM_ERROR",
            PlacementError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}
