use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::context::Identity;
use crate::controller::ResultSink;
use crate::error::StoreError;
use crate::store::{LeaderboardEntry, PendingResult, ResultRecord, ResultsStore};

enum Request {
    Register(Identity),
    Record(PendingResult),
    TopResults {
        limit: usize,
        reply: Sender<Result<Vec<LeaderboardEntry>, StoreError>>,
    },
    ResultsFor {
        identity: Identity,
        reply: Sender<Result<Vec<ResultRecord>, StoreError>>,
    },
}

/// Completion notice for a fire-and-forget write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved { wpm: u32 },
    Failed { error: String },
}

/// Cheap, cloneable way to hand results to the worker without waiting
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: Sender<Request>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Register(identity) => write!(f, "Register({})", identity.id),
            Request::Record(pending) => write!(f, "Record({})", pending.identity.id),
            Request::TopResults { limit, .. } => write!(f, "TopResults({limit})"),
            Request::ResultsFor { identity, .. } => write!(f, "ResultsFor({})", identity.id),
        }
    }
}

impl ResultSink for StoreHandle {
    fn submit(&self, pending: PendingResult) {
        if self.tx.send(Request::Record(pending)).is_err() {
            log::error!("results store worker is gone, result dropped");
        }
    }
}

/// Owns a results store on a background thread so writes never stall the
/// tick/input loop. Queries block the caller until the worker answers.
pub struct StoreWorker {
    tx: Option<Sender<Request>>,
    outcomes: Receiver<PersistOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl StoreWorker {
    pub fn spawn<S: ResultsStore + Send + 'static>(mut store: S) -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        let (outcome_tx, outcomes) = mpsc::channel();

        let thread = thread::spawn(move || {
            for request in rx {
                log::debug!("store request {request:?}");
                match request {
                    Request::Register(identity) => {
                        if let Err(e) = store.register_identity(&identity) {
                            log::warn!("failed to register {}: {e}", identity.id);
                        }
                    }
                    Request::Record(pending) => {
                        let outcome = match store.record_result(
                            &pending.identity,
                            &pending.result,
                            &pending.config,
                        ) {
                            Ok(()) => {
                                log::info!("saved result for {}", pending.identity.id);
                                PersistOutcome::Saved {
                                    wpm: pending.result.wpm,
                                }
                            }
                            Err(e) => {
                                log::error!("error saving results: {e}");
                                PersistOutcome::Failed {
                                    error: e.to_string(),
                                }
                            }
                        };
                        let _ = outcome_tx.send(outcome);
                    }
                    Request::TopResults { limit, reply } => {
                        let _ = reply.send(store.top_results(limit));
                    }
                    Request::ResultsFor { identity, reply } => {
                        let _ = reply.send(store.results_for_identity(&identity));
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            outcomes,
            thread: Some(thread),
        }
    }

    fn send(&self, request: Request) -> Result<(), StoreError> {
        self.tx
            .as_ref()
            .ok_or(StoreError::WorkerGone)?
            .send(request)
            .map_err(|_| StoreError::WorkerGone)
    }

    pub fn handle(&self) -> Option<StoreHandle> {
        self.tx.as_ref().map(|tx| StoreHandle { tx: tx.clone() })
    }

    pub fn register(&self, identity: Identity) -> Result<(), StoreError> {
        self.send(Request::Register(identity))
    }

    pub fn top_results(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let (reply, rx) = mpsc::channel();
        self.send(Request::TopResults { limit, reply })?;
        rx.recv().map_err(|_| StoreError::WorkerGone)?
    }

    pub fn results_for_identity(&self, identity: &Identity) -> Result<Vec<ResultRecord>, StoreError> {
        let (reply, rx) = mpsc::channel();
        self.send(Request::ResultsFor {
            identity: identity.clone(),
            reply,
        })?;
        rx.recv().map_err(|_| StoreError::WorkerGone)?
    }

    /// Outcomes of writes completed since the last call
    pub fn poll_outcomes(&self) -> Vec<PersistOutcome> {
        self.outcomes.try_iter().collect()
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        // the worker drains queued writes once every sender is gone, so any
        // StoreHandle must be dropped before the worker or this join waits forever
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
