pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::AssetContext;
pub use error::{AssetFailure, FailureKind, PipelineError};
pub use progress::{ChannelProgress, LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{AssetResult, BatchOutcome, CancelToken, Pipeline};
