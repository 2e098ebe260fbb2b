//! Background scheduling of hard-deletion passes.
//!
//! Passes are enqueued only after the mutation that scheduled them
//! commits. A pass may run more than once; a stale or repeated pass is a
//! no-op.
//!
//! - [`QueueScheduler`] - in-process queue drained by the host
//! - [`TokioScheduler`] - runs passes on a tokio runtime

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use entgraph_common::utils::error::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::database::EntDb;
use crate::deletion::ScheduledDeletion;

/// Accepts hard-deletion passes to run later.
pub trait Scheduler: Send + Sync {
    /// Runs `task` against the database after `delay`.
    fn schedule(&self, task: ScheduledDeletion, delay: Duration);
}

struct Queued {
    task: ScheduledDeletion,
    due: Instant,
}

/// A scheduler that only queues. The host runs due passes with
/// [`run_due`](Self::run_due), or everything with [`run_all`](Self::run_all).
#[derive(Default)]
pub struct QueueScheduler {
    queue: Mutex<VecDeque<Queued>>,
}

impl QueueScheduler {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued passes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Queued passes in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledDeletion> {
        self.queue.lock().iter().map(|q| q.task.clone()).collect()
    }

    /// Removes and returns every queued pass.
    pub fn drain(&self) -> Vec<ScheduledDeletion> {
        self.queue.lock().drain(..).map(|q| q.task).collect()
    }

    /// Runs every pass that is due, including passes re-enqueued while
    /// running. Returns the number of passes run.
    pub fn run_due(&self, db: &EntDb) -> Result<usize> {
        self.run(db, |q| q.due <= Instant::now())
    }

    /// Runs every pass regardless of its delay, until the queue is empty.
    pub fn run_all(&self, db: &EntDb) -> Result<usize> {
        self.run(db, |_| true)
    }

    fn run(&self, db: &EntDb, ready: impl Fn(&Queued) -> bool) -> Result<usize> {
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                queue
                    .iter()
                    .position(&ready)
                    .and_then(|pos| queue.remove(pos))
            };
            let Some(queued) = next else {
                return Ok(ran);
            };
            if let Err(err) = db.run_scheduled(&queued.task) {
                self.queue.lock().push_front(queued);
                return Err(err);
            }
            ran += 1;
        }
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, task: ScheduledDeletion, delay: Duration) {
        let due = Instant::now() + delay;
        self.queue.lock().push_back(Queued { task, due });
    }
}

impl std::fmt::Debug for QueueScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueScheduler")
            .field("len", &self.len())
            .finish()
    }
}

type Message = (ScheduledDeletion, Duration);

/// A scheduler backed by a tokio runtime.
///
/// Created together with a [`TokioWorker`]; spawn the worker once the
/// database exists:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use entgraph_engine::{EntDb, TokioScheduler};
/// # use entgraph_core::EntSchema;
/// # async fn demo(schema: EntSchema) -> entgraph_common::Result<()> {
/// let (scheduler, worker) = TokioScheduler::new();
/// let db = Arc::new(EntDb::builder(schema).scheduler(Arc::new(scheduler)).build()?);
/// worker.spawn(&db);
/// # Ok(())
/// # }
/// ```
///
/// Each pass sleeps its delay, then runs on the blocking pool. Failed
/// passes are retried with exponential backoff up to the configured limit.
/// The worker holds the database weakly and stops when it is dropped.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<Message>,
}

/// Receiving half of a [`TokioScheduler`].
#[derive(Debug)]
pub struct TokioWorker {
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl TokioScheduler {
    /// Creates a scheduler and its worker.
    #[must_use]
    pub fn new() -> (Self, TokioWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, TokioWorker { receiver })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: ScheduledDeletion, delay: Duration) {
        if let Err(mpsc::error::SendError((task, _))) = self.sender.send((task, delay)) {
            tracing::warn!(
                table = %task.table,
                id = %task.id,
                "scheduler worker is gone, dropping hard-deletion pass"
            );
        }
    }
}

impl TokioWorker {
    /// Spawns the worker on the current runtime.
    pub fn spawn(self, db: &Arc<EntDb>) -> JoinHandle<()> {
        tokio::spawn(self.run(Arc::downgrade(db)))
    }

    async fn run(mut self, db: Weak<EntDb>) {
        while let Some((task, delay)) = self.receiver.recv().await {
            tokio::spawn(run_task(db.clone(), task, delay));
        }
        tracing::debug!("scheduler worker stopped");
    }
}

async fn run_task(db: Weak<EntDb>, task: ScheduledDeletion, delay: Duration) {
    tokio::time::sleep(delay).await;
    let mut attempt: u32 = 0;
    loop {
        let Some(strong) = db.upgrade() else {
            return;
        };
        let max_retries = strong.config().task_max_retries;
        let backoff = strong.config().task_retry_backoff;

        let pass = task.clone();
        match tokio::task::spawn_blocking(move || strong.run_scheduled(&pass)).await {
            Ok(Ok(outcome)) => {
                tracing::debug!(table = %task.table, id = %task.id, ?outcome, "pass finished");
                return;
            }
            Ok(Err(err)) if attempt < max_retries => {
                tracing::warn!(
                    table = %task.table,
                    id = %task.id,
                    attempt,
                    error = %err,
                    "hard-deletion pass failed, retrying"
                );
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    table = %task.table,
                    id = %task.id,
                    error = %err,
                    "hard-deletion pass failed, giving up"
                );
                return;
            }
            Err(join) => {
                tracing::warn!(table = %task.table, id = %task.id, error = %join, "hard-deletion pass panicked");
                return;
            }
        }
        tokio::time::sleep(backoff.saturating_mul(1 << attempt.min(16))).await;
        attempt += 1;
    }
}
