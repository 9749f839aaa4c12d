//! The poll loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use cpapwatch_adapters::{collect, SnapshotClient};

use crate::error::CycleError;
use crate::projector::MetricsProjector;
use crate::reconcile::{Reconciled, Reconciler};
use crate::store::Store;

/// Drives fetch, reconcile and project for every account, once per interval.
///
/// Accounts are processed one after another. Shutdown is observed while
/// sleeping and before each account's fetch; a cycle already in flight runs
/// to completion.
pub struct Poller {
    accounts: Vec<Box<dyn SnapshotClient>>,
    store: Arc<dyn Store>,
    reconciler: Reconciler,
    projector: MetricsProjector,
    interval: Duration,
    history_months: u32,
    include_zero_scores: bool,
    shutdown: watch::Receiver<bool>,
}

impl Poller {
    /// Create a new builder for configuring the poller.
    pub fn builder() -> PollerBuilder {
        PollerBuilder::default()
    }

    /// Poll until shutdown is requested.
    pub async fn run(&mut self) {
        info!(
            "Polling {} account(s) every {:?}",
            self.accounts.len(),
            self.interval
        );

        loop {
            self.run_once().await;
            if self.is_shutdown() {
                break;
            }

            debug!("Sleeping for {:?}", self.interval);
            let interval = self.interval;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = self.shutdown.changed() => {
                    // A dropped handle also stops the loop
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poller stopped");
    }

    /// Run one cycle for every account. Returns how many cycles failed.
    pub async fn run_once(&mut self) -> usize {
        let mut failed = 0;

        for client in self.accounts.iter_mut() {
            if *self.shutdown.borrow() {
                debug!("Shutdown requested, skipping remaining accounts");
                break;
            }

            debug!("Begin cycle for {}", client.description());
            let result = run_cycle(
                client.as_mut(),
                &self.reconciler,
                &self.projector,
                self.store.as_ref(),
                self.history_months,
                self.include_zero_scores,
            )
            .await;

            match result {
                Ok(reconciled) => debug!(
                    "End cycle for {}: {} nights persisted, {} failed",
                    client.description(),
                    reconciled.records.len(),
                    reconciled.failed_dates.len()
                ),
                Err(e) => {
                    failed += 1;
                    error!("Cycle failed for {}: {}", client.description(), e.chain());
                }
            }
        }

        failed
    }

    /// Number of configured accounts.
    pub fn accounts(&self) -> usize {
        self.accounts.len()
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// One account's fetch, reconcile and project.
pub async fn run_cycle(
    client: &mut dyn SnapshotClient,
    reconciler: &Reconciler,
    projector: &MetricsProjector,
    store: &dyn Store,
    history_months: u32,
    include_zero_scores: bool,
) -> Result<Reconciled, CycleError> {
    let snapshot = collect(client, history_months).await?;
    let reconciled = reconciler.reconcile(&snapshot)?;
    projector.project(&snapshot, &reconciled, store, include_zero_scores, Utc::now())?;
    Ok(reconciled)
}

/// Builder for Poller.
#[derive(Default)]
pub struct PollerBuilder {
    accounts: Vec<Box<dyn SnapshotClient>>,
    interval: Option<Duration>,
    history_months: Option<u32>,
    include_zero_scores: bool,
}

impl PollerBuilder {
    /// Add an account's client. Accounts are polled in insertion order.
    pub fn account(mut self, client: Box<dyn SnapshotClient>) -> Self {
        self.accounts.push(client);
        self
    }

    /// Set the polling interval (default: 60 seconds).
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the history window in months (default: 3).
    pub fn history_months(mut self, months: u32) -> Self {
        self.history_months = Some(months);
        self
    }

    /// Publish per-night gauges for zero-score nights.
    pub fn include_zero_scores(mut self, include: bool) -> Self {
        self.include_zero_scores = include;
        self
    }

    /// Build the poller and the handle that stops it.
    pub fn build(
        self,
        store: Arc<dyn Store>,
        projector: MetricsProjector,
    ) -> (Poller, ShutdownHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = Poller {
            accounts: self.accounts,
            reconciler: Reconciler::new(store.clone()),
            store,
            projector,
            interval: self.interval.unwrap_or(Duration::from_secs(60)),
            history_months: self.history_months.unwrap_or(3),
            include_zero_scores: self.include_zero_scores,
            shutdown: stop_rx,
        };
        (poller, ShutdownHandle { stop_tx })
    }
}

/// Handle for stopping a [`Poller`].
///
/// Dropping the handle also stops the poller at its next sleep.
#[derive(Debug)]
pub struct ShutdownHandle {
    stop_tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
