// src/poll.rs

//! The poll loop: fetch, compare, notify, persist, sleep, repeat.
//!
//! The loop owns all cycle-level failure isolation. A cycle that fails in
//! any stage is logged and abandoned; the next cycle runs on schedule. The
//! interval is re-armed after each cycle completes, so a slow cycle delays
//! subsequent ones rather than overlapping them. Only a configuration
//! error at startup or a shutdown signal ever ends the process.

use std::time::Duration;

use tokio::sync::watch;

use crate::detect::{Change, RelevanceFilter, classify};
use crate::error::Result;
use crate::fetch::FetchLatest;
use crate::notify::{Message, Notifier};
use crate::state::StateStore;

/// What one cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Classification result; `None` when both channels failed
    pub change: Option<Change>,
    /// Whether a notification was delivered
    pub notified: bool,
    /// Whether the baseline was advanced on disk
    pub persisted: bool,
}

impl CycleOutcome {
    fn skipped() -> Self {
        Self {
            change: None,
            notified: false,
            persisted: false,
        }
    }
}

/// The process-wide scheduler. Dependencies are passed in explicitly so
/// the loop can be exercised with stub fetchers and notifiers.
pub struct PollLoop {
    interval: Duration,
    fetcher: Box<dyn FetchLatest>,
    store: StateStore,
    notifier: Box<dyn Notifier>,
    filter: RelevanceFilter,
    subject_prefix: String,
}

impl PollLoop {
    pub fn new(
        interval: Duration,
        fetcher: Box<dyn FetchLatest>,
        store: StateStore,
        notifier: Box<dyn Notifier>,
        filter: RelevanceFilter,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            interval,
            fetcher,
            store,
            notifier,
            filter,
            subject_prefix: subject_prefix.into(),
        }
    }

    /// Run one complete fetch → compare → notify → persist pass.
    ///
    /// Recoverable failures (fetch exhaustion, delivery, persistence) are
    /// handled and logged here; an `Err` only escapes for conditions none
    /// of the stages claimed, and the caller treats it as cycle-fatal, not
    /// process-fatal.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(current) = self.fetcher.fetch_latest().await else {
            log::warn!("Cycle produced no item: both channels failed");
            return Ok(CycleOutcome::skipped());
        };

        let previous = self.store.load().await;
        let change = classify(&current, previous.as_ref());

        let mut outcome = CycleOutcome {
            change: Some(change),
            notified: false,
            persisted: false,
        };

        if !change.is_new() {
            log::debug!("Latest item unchanged: {}", current.title);
            return Ok(outcome);
        }

        log::info!("New item observed ({change:?}): {}", current.title);

        if self.filter.is_notifiable(&current) {
            let message = Message::from_item(&current, &self.subject_prefix);
            match self.notifier.notify(&message).await {
                Ok(()) => outcome.notified = true,
                Err(e) => log::error!("Notification delivery failed: {e}"),
            }
        } else {
            log::info!(
                "New item matched no keyword, notification suppressed: {}",
                current.title
            );
        }

        // The baseline advances regardless of whether the notification was
        // suppressed or failed; delivery and state are independent.
        match self.store.save(&current).await {
            Ok(()) => outcome.persisted = true,
            Err(e) => log::error!("Failed to persist state: {e}"),
        }

        Ok(outcome)
    }

    /// Run until shutdown is signalled.
    ///
    /// The first cycle runs immediately; each following cycle starts one
    /// interval after the previous cycle completed. The shutdown channel
    /// is checked between cycles, never mid-cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Poll loop starting, interval {}s",
            self.interval.as_secs()
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                log::error!("Cycle failed: {e}");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    log::info!("Shutdown requested, stopping poll loop");
                    return;
                }
            }
        }
    }
}
