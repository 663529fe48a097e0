use crate::clients::EventOracle;
use crate::error::StoreError;
use crate::event::Event;
use crate::wager::WagerStatus;
use crate::wager_store::WagerStore;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Outcome of one sweep over the pending wagers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pending: usize,
    pub won: usize,
    pub lost: usize,
    /// Event still open
    pub open: usize,
    /// Provider unreachable for the wager's event
    pub unavailable: usize,
    /// Provider no longer knows the event
    pub missing: usize,
    /// Rows actually changed by the batch
    pub committed: usize,
}

enum Lookup {
    Found(Event),
    Missing,
    Unavailable,
}

/// Settles pending wagers once their events finish.
///
/// Each sweep reads a snapshot of `PENDING` wagers, asks the provider about
/// every referenced event once, and commits all resulting transitions in a
/// single batch. It is the only writer of wager status.
pub struct SettlementChecker {
    oracle: Arc<dyn EventOracle>,
    store: Arc<dyn WagerStore>,
    interval: Duration,
    max_concurrent_lookups: usize,
}

impl SettlementChecker {
    pub fn new(oracle: Arc<dyn EventOracle>, store: Arc<dyn WagerStore>) -> Self {
        Self {
            oracle,
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = limit.max(1);
        self
    }

    /// Run one sweep.
    ///
    /// Provider failures only skip the affected wagers. A store failure aborts
    /// the sweep with nothing committed.
    pub async fn check_settlements(&self) -> Result<SweepReport, StoreError> {
        let pending = self.store.list_pending().await?;
        let mut report = SweepReport {
            pending: pending.len(),
            ..SweepReport::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        let event_ids: HashSet<String> = pending.iter().map(|w| w.event_id.clone()).collect();
        let lookups: HashMap<String, Lookup> = stream::iter(event_ids)
            .map(move |event_id| async move {
                let lookup = self.lookup(&event_id).await;
                (event_id, lookup)
            })
            .buffer_unordered(self.max_concurrent_lookups)
            .collect()
            .await;

        let mut batch = Vec::new();
        for wager in &pending {
            match lookups.get(&wager.event_id) {
                Some(Lookup::Found(event)) => match wager.settlement_against(event) {
                    Some(settlement) => {
                        match settlement.status {
                            WagerStatus::Won => report.won += 1,
                            _ => report.lost += 1,
                        }
                        batch.push(settlement);
                    }
                    None => report.open += 1,
                },
                Some(Lookup::Missing) => {
                    debug!("Skipping bet {}: event {} not found", wager.bet_id, wager.event_id);
                    report.missing += 1;
                }
                Some(Lookup::Unavailable) | None => report.unavailable += 1,
            }
        }

        report.committed = self.store.apply_settlements(&batch).await?;
        Ok(report)
    }

    async fn lookup(&self, event_id: &str) -> Lookup {
        match self.oracle.fetch_event(event_id).await {
            Ok(Some(event)) => Lookup::Found(event),
            Ok(None) => {
                warn!("Event {} referenced by pending bets no longer exists", event_id);
                Lookup::Missing
            }
            Err(e) => {
                warn!("Error checking settlement for {}: {}", event_id, e);
                Lookup::Unavailable
            }
        }
    }

    /// Sweep every interval until `shutdown` flips to true or its sender is
    /// dropped. A sweep already in progress is allowed to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Settlement checking (every {:?})", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => self.sweep().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Settlement checker stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn sweep(&self) {
        match self.check_settlements().await {
            Ok(report) if report.committed > 0 => {
                info!(
                    "✅ {} bets settled (won: {}, lost: {}) - still pending: {}",
                    report.committed,
                    report.won,
                    report.lost,
                    report.pending.saturating_sub(report.committed)
                );
            }
            Ok(report) => {
                debug!(
                    "No new settlements ({} pending, {} skipped on provider errors)",
                    report.pending, report.unavailable
                );
            }
            Err(e) => error!("Settlement sweep aborted: {}", e),
        }
    }
}
