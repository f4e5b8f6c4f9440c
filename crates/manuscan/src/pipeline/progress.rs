use crossbeam_channel::Sender;
use tracing::info;

use super::error::FailureKind;

/// Events emitted while a batch runs. `fraction` is attempted / total.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    AssetCompleted {
        index: usize,
        fraction: f64,
    },
    AssetFailed {
        index: usize,
        kind: FailureKind,
        message: String,
        fraction: f64,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

impl ProgressEvent {
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ProgressEvent::AssetCompleted { fraction, .. }
            | ProgressEvent::AssetFailed { fraction, .. } => Some(*fraction),
            _ => None,
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the log; used by the command line.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => info!(total, "batch started"),
            ProgressEvent::AssetCompleted { index, fraction } => {
                info!(index, progress = %format!("{:.0}%", fraction * 100.0), "asset analyzed")
            }
            // the pipeline already logged the cause
            ProgressEvent::AssetFailed {
                index,
                kind,
                fraction,
                ..
            } => info!(
                index,
                kind = %kind,
                progress = %format!("{:.0}%", fraction * 100.0),
                "asset skipped"
            ),
            ProgressEvent::Finished { succeeded, failed } => {
                info!(succeeded, failed, "batch finished")
            }
        }
    }
}

/// Forwards events to a channel, for callers that drain progress on another thread.
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // a closed receiver only means nobody is watching any more
        let _ = self.sender.send(event);
    }
}
