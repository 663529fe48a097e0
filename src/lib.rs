// Core modules
pub mod admission;
pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod event;
pub mod event_book;
pub mod money;
pub mod query;
pub mod settlement_checker;
pub mod wager;
pub mod wager_store;

// Re-exports
pub use admission::AdmissionController;
pub use api::{create_router, AppState};
pub use clients::{EventOracle, LineProviderClient};
pub use crate::config::Settings;
pub use error::{OracleError, PlacementError, StoreError};
pub use event::{Event, EventStatus};
pub use event_book::EventBook;
pub use query::QueryService;
pub use settlement_checker::{SettlementChecker, SweepReport};
pub use wager::{Settlement, Wager, WagerStatus};
pub use wager_store::{SqliteWagerStore, WagerStore};
