// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Background Jobs
//!
//! Best-effort side work that must never delay a client response: nonce
//! high-water-mark updates and audit records.
//!
//! ## Delivery
//!
//! The queue is bounded. When it is full, new jobs are dropped with a
//! warning; the client response is never blocked. On shutdown the worker
//! drains whatever is already queued and exits.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::storage::RouterState;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    SetMaxNonce { sender: Address, nonce: u64 },
    Audit(AuditEvent),
}

/// Producer handle; cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns false if the job was dropped.
    pub fn submit(&self, job: Job) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(job = ?job_kind(&job), "Background queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(job = ?job_kind(&job), "Background queue closed, dropping job");
                false
            }
        }
    }

    pub fn audit(&self, event: AuditEvent) -> bool {
        self.submit(Job::Audit(event))
    }
}

fn job_kind(job: &Job) -> &'static str {
    match job {
        Job::SetMaxNonce { .. } => "set_max_nonce",
        Job::Audit(_) => "audit",
    }
}

pub struct JobWorker {
    rx: mpsc::Receiver<Job>,
    state: RouterState,
    audit: Arc<dyn AuditSink>,
}

impl JobWorker {
    pub fn new(rx: mpsc::Receiver<Job>, state: RouterState, audit: Arc<dyn AuditSink>) -> Self {
        Self { rx, state, audit }
    }

    /// Run until cancelled or until every producer is gone.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Background job worker starting");

        loop {
            tokio::select! {
                job = self.rx.recv() => match job {
                    Some(job) => self.handle(job).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    self.rx.close();
                    while let Some(job) = self.rx.recv().await {
                        self.handle(job).await;
                    }
                    break;
                }
            }
        }

        info!("Background job worker shutting down");
    }

    async fn handle(&self, job: Job) {
        match job {
            Job::SetMaxNonce { sender, nonce } => {
                match self.state.raise_sender_max_nonce(&sender, nonce).await {
                    Ok(()) => debug!(sender = %sender, nonce, "Updated sender max nonce"),
                    Err(e) => {
                        warn!(sender = %sender, nonce, error = %e, "Failed to update sender max nonce")
                    }
                }
            }
            Job::Audit(event) => self.audit.record(&event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventType;
    use crate::storage::MemoryStore;
    use crate::testing::RecordingAuditSink;

    fn state() -> RouterState {
        RouterState::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn full_queue_drops_jobs() {
        let (queue, _rx) = JobQueue::new(1);
        let job = Job::SetMaxNonce {
            sender: Address::with_last_byte(1),
            nonce: 1,
        };
        assert!(queue.submit(job.clone()));
        assert!(!queue.submit(job));
    }

    #[tokio::test]
    async fn closed_queue_drops_jobs() {
        let (queue, rx) = JobQueue::new(4);
        drop(rx);
        assert!(!queue.audit(AuditEvent::new(AuditEventType::RelaySubmitted)));
    }

    #[tokio::test]
    async fn worker_applies_jobs_and_drains_on_shutdown() {
        let state = state();
        let sink = Arc::new(RecordingAuditSink::default());
        let (queue, rx) = JobQueue::new(16);
        let sender = Address::with_last_byte(3);

        queue.submit(Job::SetMaxNonce { sender, nonce: 4 });
        queue.audit(AuditEvent::new(AuditEventType::MempoolForwarded));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        JobWorker::new(rx, state.clone(), sink.clone())
            .run(shutdown)
            .await;

        assert_eq!(state.sender_max_nonce(&sender).await.unwrap(), Some(4));
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn worker_exits_when_producers_drop() {
        let (queue, rx) = JobQueue::new(4);
        let sink = Arc::new(RecordingAuditSink::default());
        queue.audit(AuditEvent::new(AuditEventType::RelaySubmitted));
        drop(queue);

        JobWorker::new(rx, state(), sink.clone())
            .run(CancellationToken::new())
            .await;
        assert_eq!(sink.events().len(), 1);
    }
}
