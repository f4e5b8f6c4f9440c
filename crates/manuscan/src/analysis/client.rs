use super::{AnalysisError, AnalysisRequest};

/// Sends one image and instruction to a model and returns its raw text reply.
///
/// Implementations must be callable from several worker threads at once.
/// Retries, if any, are the implementation's business.
pub trait AnalysisClient: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "analysis"
    }
}

impl<C: AnalysisClient + ?Sized> AnalysisClient for Box<C> {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError> {
        (**self).analyze(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<C: AnalysisClient + ?Sized> AnalysisClient for std::sync::Arc<C> {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalysisError> {
        (**self).analyze(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
