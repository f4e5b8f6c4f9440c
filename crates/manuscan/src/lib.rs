pub mod analysis;
pub mod asset;
pub mod config;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod materializer;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod sanitize;
pub mod secrets;
pub mod worker;

pub use analysis::{client_from_config, AnalysisClient, AnalysisError, AnalysisRequest, ModelParameters};
pub use asset::{Asset, DocumentId, PageNumber, Upload, UploadKind};
pub use config::{load_config, Config, Provider};
pub use error::{ConfigError, ManuscanError, MaterializeError, ReportError, Result, WorkerError};
pub use inputs::{load_uploads, InputScanner};
pub use materializer::{AssetMaterializer, MaterializeReport, Workspace};
pub use normalize::{parse_response, ExtractionStrategy, ResponseSchema};
pub use pipeline::{BatchOutcome, CancelToken, Pipeline, PipelineConfig, ProgressReporter};
pub use results::{ParsedRecord, ResultSet};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
