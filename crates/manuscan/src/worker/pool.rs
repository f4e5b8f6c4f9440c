use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};

use crate::asset::Asset;
use crate::error::WorkerError;
use crate::pipeline::context::AssetContext;
use crate::pipeline::error::{AssetFailure, PipelineError};
use crate::pipeline::runner::{AssetResult, CancelToken, Pipeline};

/// One asset tagged with its position in the input list.
#[derive(Debug, Clone)]
pub struct AssetTask {
    pub index: usize,
    pub asset: Asset,
}

#[derive(Debug)]
pub struct TaskResult {
    pub index: usize,
    pub result: AssetResult,
}

/// Fixed set of threads running assets through a shared [`Pipeline`].
///
/// Results come back in completion order; callers restore input order
/// with [`TaskResult::index`].
pub struct WorkerPool {
    task_sender: Sender<AssetTask>,
    result_receiver: Receiver<TaskResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(
        pipeline: Pipeline,
        worker_count: usize,
        cancel: CancelToken,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }

        let capacity = worker_count * 2;
        let (task_sender, task_receiver) = bounded::<AssetTask>(capacity);
        let (result_sender, result_receiver) = bounded::<TaskResult>(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = pipeline.clone();
            let worker_cancel = cancel.clone();

            let handle = thread::Builder::new()
                .name(format!("manuscan-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        task_rx,
                        result_tx,
                        shutdown_flag,
                        worker_pipeline,
                        worker_cancel,
                    );
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()));

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // stop the ones already running before giving up
                    shutdown.store(true, Ordering::Relaxed);
                    drop(task_sender);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(e);
                }
            }
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            task_sender,
            result_receiver,
            workers,
            shutdown,
            capacity,
        })
    }

    /// Tasks that may be outstanding without `submit` blocking.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn submit(&self, task: AssetTask) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.task_sender
            .send(task)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Blocks for the next result; `None` once every worker has exited.
    pub fn recv_result(&self) -> Option<TaskResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.task_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        debug!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    task_receiver: Receiver<AssetTask>,
    result_sender: Sender<TaskResult>,
    shutdown: Arc<AtomicBool>,
    pipeline: Pipeline,
    cancel: CancelToken,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match task_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(task) => {
                debug!("Worker {} processing asset #{}", worker_id, task.index);

                let index = task.index;
                let asset = task.asset.clone();
                // a panicking client must still produce a result, or the batch never drains
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline.run_asset(AssetContext::new(index, task.asset), &cancel)
                }))
                .unwrap_or_else(|_| {
                    error!("Worker {} panicked on asset #{}", worker_id, index);
                    Err(AssetFailure::from_error(
                        index,
                        asset,
                        &PipelineError::WorkerLost,
                    ))
                });

                if let Err(e) = result_sender.send(TaskResult { index, result }) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
