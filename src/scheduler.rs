//! Strictly-ordered, single-concurrency pipeline scheduler.
//!
//! One dedicated worker loop consumes tasks from a channel in arrival order.
//! The single loop is the serialization guarantee: no two pipelines ever run
//! at the same time, which is all that protects the shared working directory
//! tree from concurrent writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::pipeline::{Orchestrator, PipelineOutcome, PipelineTask};

/// Number of concurrent pipeline workers. The whole design assumes this is 1;
/// see the worker loop below.
pub const PIPELINE_WORKERS: usize = 1;

/// Handle for enqueueing pipeline tasks.
///
/// Enqueue never blocks the HTTP-handling context; the webhook response is
/// sent before the task is even dequeued.
#[derive(Clone)]
pub struct TaskScheduler {
    tx: mpsc::UnboundedSender<PipelineTask>,
    pending: Arc<AtomicUsize>,
}

impl TaskScheduler {
    /// Spawns the worker loop and returns the enqueue handle.
    pub fn start(orchestrator: Orchestrator) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PipelineTask>();
        let pending = Arc::new(AtomicUsize::new(0));

        let orchestrator = Arc::new(orchestrator);
        let worker_pending = Arc::clone(&pending);

        // The single recv loop below is what makes PIPELINE_WORKERS == 1 a
        // fact rather than a comment: each task is awaited to its terminal
        // state before the next one is dequeued.
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let task_id = task.id;
                let orchestrator = Arc::clone(&orchestrator);

                // Run the task in its own spawned task so a panic inside one
                // pipeline surfaces as a JoinError here instead of killing
                // the worker loop.
                let result = tokio::spawn(async move { orchestrator.execute(task).await }).await;

                match result {
                    Ok(Ok(PipelineOutcome::Completed(result))) => {
                        debug!("Task {} finished: {:?}", task_id, result);
                    }
                    Ok(Ok(PipelineOutcome::Rejected(reason))) => {
                        // Already logged where it was decided; the response
                        // went out long ago, so this is dropped silently.
                        debug!("Task {} rejected: {:?}", task_id, reason);
                    }
                    Ok(Err(e)) => {
                        error!("Task {} aborted: {}", task_id, e);
                    }
                    Err(e) => {
                        error!("Task {} panicked: {}", task_id, e);
                    }
                }

                worker_pending.fetch_sub(1, Ordering::SeqCst);
            }
        });

        TaskScheduler { tx, pending }
    }

    /// Appends a task to the queue. Returns `false` if the worker is gone.
    pub fn enqueue(&self, task: PipelineTask) -> bool {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("Pipeline worker is gone; task dropped");
            return false;
        }
        true
    }

    /// Tasks enqueued but not yet finished (the running one included).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
