//! Debounced saving. Every dataset has its own background task that waits for edits to go quiet
//! before writing the newest snapshot to the `Store`.

use crate::error::LedgerError;
use crate::store::{Dataset, Store};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, trace, warn};

/// Payloads larger than this are saved, with a warning.
const SIZE_WARNING_BYTES: usize = 5 * 1024 * 1024;

/// Reported when a save did not go through. The data is still in memory and the next edit of the
/// same dataset will try again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailure {
    pub key: String,
    pub reason: String,
}

enum Message {
    Schedule(serde_json::Value),
    Flush(oneshot::Sender<Result<()>>),
}

/// A cancellable, restartable save timer for one key.
///
/// `schedule` replaces the pending snapshot and restarts the quiet period, so a burst of edits
/// produces one save of the last snapshot. `flush` saves whatever is pending right away. Saves of
/// one key run one at a time, in order.
#[derive(Debug)]
pub struct Debouncer {
    key: &'static str,
    tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Starts the save task for `key`. Must be called inside a tokio runtime.
    pub fn spawn(
        key: &'static str,
        store: Arc<dyn Store>,
        quiet: Duration,
        failures: mpsc::UnboundedSender<SaveFailure>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            key,
            store,
            quiet,
            failures,
        };
        let task = tokio::spawn(worker.run(rx));
        Self { key, tx, task }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Replaces the pending snapshot with `value` and restarts the quiet period.
    pub fn schedule(&self, value: serde_json::Value) {
        if self.tx.send(Message::Schedule(value)).is_err() {
            error!("The save task for '{}' has stopped, the edit was not saved", self.key);
        }
    }

    /// Saves the pending snapshot now and waits for the outcome. Succeeds immediately when nothing
    /// is pending.
    pub async fn flush(&self) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        if self.tx.send(Message::Flush(reply)).is_err() {
            return Err(self.stopped());
        }
        match outcome.await {
            Ok(result) => result,
            Err(_) => Err(self.stopped()),
        }
    }

    /// Flushes and then stops the task.
    pub async fn shutdown(self) -> Result<()> {
        let flushed = self.flush().await;
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!("The save task for '{}' did not shut down cleanly: {e}", self.key);
        }
        flushed
    }

    fn stopped(&self) -> crate::Error {
        LedgerError::Save {
            key: self.key.to_string(),
            reason: "the save task has stopped".to_string(),
        }
        .into()
    }
}

struct Worker {
    key: &'static str,
    store: Arc<dyn Store>,
    quiet: Duration,
    failures: mpsc::UnboundedSender<SaveFailure>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Message>) {
        // `pending` is the newest unsaved snapshot. It stays pending without a timer after a failed
        // save so that a flush can retry it.
        let mut pending: Option<serde_json::Value> = None;
        let mut armed = false;
        let mut deadline = Instant::now();

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(Message::Schedule(value)) => {
                        trace!("Scheduling a save of '{}'", self.key);
                        pending = Some(value);
                        armed = true;
                        deadline = Instant::now() + self.quiet;
                    }
                    Some(Message::Flush(reply)) => {
                        armed = false;
                        let result = match pending.take() {
                            Some(value) => self.save(value, &mut pending).await,
                            None => Ok(()),
                        };
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Some(value) = pending.take() {
                            let _ = self.save(value, &mut pending).await;
                        }
                        debug!("The save task for '{}' is done", self.key);
                        break;
                    }
                },
                _ = sleep_until(deadline), if armed => {
                    armed = false;
                    if let Some(value) = pending.take() {
                        let _ = self.save(value, &mut pending).await;
                    }
                }
            }
        }
    }

    /// Saves `value`. On failure the value is put back into `pending` and the failure is reported.
    async fn save(
        &self,
        value: serde_json::Value,
        pending: &mut Option<serde_json::Value>,
    ) -> Result<()> {
        let size = serde_json::to_string(&value)
            .map(|s| s.len())
            .unwrap_or_default();
        if size > SIZE_WARNING_BYTES {
            warn!(
                "'{}' is {size} bytes, which is more than some stores will hold",
                self.key
            );
        }
        let saved = self.store.save(self.key, &value).await;
        match saved {
            Ok(()) => {
                debug!("Saved '{}'", self.key);
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!("Unable to save '{}': {reason}", self.key);
                let _ = self.failures.send(SaveFailure {
                    key: self.key.to_string(),
                    reason: reason.clone(),
                });
                *pending = Some(value);
                Err(LedgerError::Save {
                    key: self.key.to_string(),
                    reason,
                }
                .into())
            }
        }
    }
}

/// One `Debouncer` per dataset plus the channel their failures are reported on.
#[derive(Debug)]
pub struct Persistence {
    debouncers: BTreeMap<Dataset, Debouncer>,
    failures: mpsc::UnboundedReceiver<SaveFailure>,
}

impl Persistence {
    /// Starts a save task for every dataset. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn Store>, quiet: Duration) -> Self {
        let (failure_tx, failures) = mpsc::unbounded_channel();
        let debouncers = Dataset::ALL
            .iter()
            .map(|dataset| {
                let debouncer =
                    Debouncer::spawn(dataset.key(), store.clone(), quiet, failure_tx.clone());
                (*dataset, debouncer)
            })
            .collect();
        Self {
            debouncers,
            failures,
        }
    }

    pub fn schedule(&self, dataset: Dataset, value: serde_json::Value) {
        if let Some(debouncer) = self.debouncers.get(&dataset) {
            debouncer.schedule(value);
        }
    }

    pub async fn flush(&self, dataset: Dataset) -> Result<()> {
        match self.debouncers.get(&dataset) {
            Some(debouncer) => debouncer.flush().await,
            None => Ok(()),
        }
    }

    /// Flushes every dataset, even when an earlier one fails. Returns the first failure.
    pub async fn flush_all(&self) -> Result<()> {
        let mut first_error = None;
        for debouncer in self.debouncers.values() {
            if let Err(e) = debouncer.flush().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Drains the save failures reported since the last call.
    pub fn failures(&mut self) -> Vec<SaveFailure> {
        let mut failures = Vec::new();
        while let Ok(failure) = self.failures.try_recv() {
            failures.push(failure);
        }
        failures
    }

    /// Flushes every dataset and stops the save tasks.
    pub async fn shutdown(self) -> Result<()> {
        let mut first_error = None;
        for (_, debouncer) in self.debouncers {
            if let Err(e) = debouncer.shutdown().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
