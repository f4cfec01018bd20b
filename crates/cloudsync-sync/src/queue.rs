//! Task submission queue drained by a bounded worker pool.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::SyncResult;
use crate::error::SyncError;
use crate::executor::TaskExecutor;

/// Submission side: hands task ids to the worker pool.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<i64>,
}

/// Handle to the running worker pool.
#[derive(Debug)]
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
}

impl TaskQueue {
    /// Spawns the dispatcher. At most `workers` tasks execute at once.
    pub fn start(executor: Arc<TaskExecutor>, workers: usize, capacity: usize) -> (Self, WorkerPool) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = tokio::spawn(dispatch(executor, receiver, shutdown_rx, workers.max(1)));
        tracing::info!(workers, capacity, "Sync worker pool started");
        (
            Self { sender },
            WorkerPool {
                shutdown,
                dispatcher,
            },
        )
    }

    /// Queues a task for execution and returns once it is accepted.
    pub async fn submit(&self, task_id: i64) -> SyncResult<()> {
        self.sender
            .send(task_id)
            .await
            .map_err(|_| SyncError::QueueClosed)?;
        tracing::debug!(task_id, "Queued sync task");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl WorkerPool {
    /// Stops accepting work and waits for in-flight tasks to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "Sync worker pool dispatcher panicked");
        }
        tracing::info!("Sync worker pool stopped");
    }
}

async fn dispatch(
    executor: Arc<TaskExecutor>,
    mut receiver: mpsc::Receiver<i64>,
    mut shutdown: watch::Receiver<bool>,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers));
    let mut in_flight = JoinSet::new();

    loop {
        let task_id = tokio::select! {
            received = receiver.recv() => match received {
                Some(id) => id,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let executor = executor.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            match executor.execute(task_id).await {
                Ok(task) => {
                    tracing::debug!(task_id, status = %task.status, "Queued sync task finished")
                }
                Err(e) if e.is_already_running() => {
                    tracing::debug!(task_id, "Queued sync task already running, skipped")
                }
                Err(e) => tracing::warn!(task_id, error = %e, "Queued sync task not executed"),
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    receiver.close();
    while in_flight.join_next().await.is_some() {}
}
