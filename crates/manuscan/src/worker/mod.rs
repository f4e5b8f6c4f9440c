pub mod pool;

pub use pool::{AssetTask, TaskResult, WorkerPool};
