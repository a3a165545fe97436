//! Background click recording for the redirect path.
//!
//! The redirect handler only enqueues an event; a worker task owned by the
//! recorder applies each one as an atomic increment against the store. The
//! queue is unbounded so a healthy store sees every click, while the worker
//! caps how many updates run at once. A failed update is logged and otherwise
//! ignored, so clicks may be undercounted when the store misbehaves but
//! redirects never wait on it.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub short_code: String,
    pub clicked_at: i64,
}

#[derive(Debug, Clone)]
pub struct ClickRecorderConfig {
    /// Maximum number of store updates running at once
    pub max_in_flight: usize,
}

impl Default for ClickRecorderConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

pub struct ClickRecorder {
    sender: mpsc::UnboundedSender<ClickEvent>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ClickRecorder {
    /// Spawn the worker on the current tokio runtime
    pub fn new(storage: Arc<dyn Storage>, config: ClickRecorderConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = ClickWorker {
            storage,
            receiver,
            shutdown_rx,
            in_flight: JoinSet::new(),
            max_in_flight: config.max_in_flight.max(1),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            sender,
            shutdown_tx,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queue a click for `short_code`. Never blocks; the event is only
    /// dropped once the worker has stopped.
    pub fn record(&self, short_code: &str) {
        let event = ClickEvent {
            short_code: short_code.to_string(),
            clicked_at: chrono::Utc::now().timestamp(),
        };

        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            warn!(short_code = %event.short_code, "click recorder stopped, dropping click");
        }
    }

    /// Stop accepting work, apply everything already queued and wait for
    /// in-flight updates to settle. Safe to call more than once.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "click recorder worker panicked");
            }
        }
    }
}

struct ClickWorker {
    storage: Arc<dyn Storage>,
    receiver: mpsc::UnboundedReceiver<ClickEvent>,
    shutdown_rx: watch::Receiver<bool>,
    in_flight: JoinSet<()>,
    max_in_flight: usize,
}

impl ClickWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                maybe_event = self.receiver.recv() => {
                    match maybe_event {
                        Some(event) => self.dispatch(event).await,
                        // every sender dropped
                        None => break,
                    }
                }
                Some(result) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    log_join_result(result);
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("click recorder shutting down, draining queued clicks");
        self.receiver.close();
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(event).await;
        }
        while let Some(result) = self.in_flight.join_next().await {
            log_join_result(result);
        }
        info!("click recorder drained");
    }

    async fn dispatch(&mut self, event: ClickEvent) {
        while self.in_flight.len() >= self.max_in_flight {
            match self.in_flight.join_next().await {
                Some(result) => log_join_result(result),
                None => break,
            }
        }

        let storage = Arc::clone(&self.storage);
        self.in_flight.spawn(async move {
            match storage
                .increment_and_touch(&event.short_code, event.clicked_at)
                .await
            {
                Ok(()) => debug!(short_code = %event.short_code, "click recorded"),
                Err(err) => warn!(
                    short_code = %event.short_code,
                    error = %err,
                    "failed to record click"
                ),
            }
        });
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        error!(error = %err, "click update task panicked");
    }
}
