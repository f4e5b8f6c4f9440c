use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, error, info, info_span, warn};

use crate::analysis::{client_from_config, AnalysisClient, AnalysisRequest};
use crate::asset::Asset;
use crate::config::Config;
use crate::normalize::parse_response;
use crate::results::{ParsedRecord, ResultSet};
use crate::sanitize;
use crate::worker::{AssetTask, WorkerPool};

use super::config::PipelineConfig;
use super::context::AssetContext;
use super::error::{AssetFailure, FailureKind, PipelineError};
use super::progress::{ProgressEvent, ProgressReporter};

pub type AssetResult = Result<ParsedRecord, AssetFailure>;

/// Shared stop flag. Once set, no new analysis calls start; calls already
/// running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything a batch produced. `results.len() + failures.len() == total`.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: ResultSet,
    /// In input order.
    pub failures: Vec<AssetFailure>,
    pub total: usize,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &AssetFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// Runs assets through analyze, normalize, validate and merge.
///
/// Cheap to clone; worker threads each hold a copy.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    client: Arc<dyn AnalysisClient>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, client: Arc<dyn AnalysisClient>) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    /// Production constructor: resolves the prompt and builds the provider client.
    pub fn from_config(
        config: &Config,
        api_key_override: Option<SecretString>,
    ) -> crate::error::Result<Self> {
        let pipeline_config = PipelineConfig::from_config(config, api_key_override)?;
        let client: Arc<dyn AnalysisClient> = Arc::from(client_from_config(config)?);
        Ok(Self::new(pipeline_config, client))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, assets: &[Asset], progress: &dyn ProgressReporter) -> BatchOutcome {
        self.run_with_cancel(assets, progress, &CancelToken::new())
    }

    /// Analyzes every asset. Per-asset failures are recorded, never propagated.
    pub fn run_with_cancel(
        &self,
        assets: &[Asset],
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> BatchOutcome {
        let total = assets.len();
        let workers = self.config.effective_workers().min(total.max(1));
        let _pipeline_span = info_span!("pipeline",
            total,
            workers,
            model = %self.config.parameters.model,
            client = self.client.name(),
        )
        .entered();

        progress.report(ProgressEvent::Started { total });

        let mut tracker = ProgressTracker::new(progress, total);
        let mut slots: Vec<Option<AssetResult>> = (0..total).map(|_| None).collect();

        if workers <= 1 {
            self.run_sequential(assets, cancel, &mut tracker, &mut slots);
        } else {
            self.run_pooled(assets, workers, cancel, &mut tracker, &mut slots);
        }

        let mut outcome = BatchOutcome {
            total,
            ..BatchOutcome::default()
        };
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(record)) => outcome.results.push(record),
                Some(Err(failure)) => outcome.failures.push(failure),
                None => {
                    let error = if cancel.is_cancelled() {
                        PipelineError::Cancelled
                    } else {
                        PipelineError::WorkerLost
                    };
                    let failure = AssetFailure::from_error(index, assets[index].clone(), &error);
                    tracker.record(index, &Err(failure.clone()));
                    outcome.failures.push(failure);
                }
            }
        }

        info!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            "Batch complete"
        );
        progress.report(ProgressEvent::Finished {
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
        });

        outcome
    }

    fn run_sequential(
        &self,
        assets: &[Asset],
        cancel: &CancelToken,
        tracker: &mut ProgressTracker<'_>,
        slots: &mut [Option<AssetResult>],
    ) {
        for (index, asset) in assets.iter().enumerate() {
            let result = self.run_asset(AssetContext::new(index, asset.clone()), cancel);
            tracker.record(index, &result);
            slots[index] = Some(result);
        }
    }

    fn run_pooled(
        &self,
        assets: &[Asset],
        workers: usize,
        cancel: &CancelToken,
        tracker: &mut ProgressTracker<'_>,
        slots: &mut [Option<AssetResult>],
    ) {
        let pool = match WorkerPool::new(self.clone(), workers, cancel.clone()) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Worker pool unavailable, running sequentially: {}", e);
                return self.run_sequential(assets, cancel, tracker, slots);
            }
        };

        let mut pending = assets.iter().enumerate();
        let mut in_flight = 0usize;
        let mut accepting = true;

        loop {
            while accepting && in_flight < pool.capacity() {
                let Some((index, asset)) = pending.next() else {
                    break;
                };
                match pool.submit(AssetTask {
                    index,
                    asset: asset.clone(),
                }) {
                    Ok(()) => in_flight += 1,
                    Err(e) => {
                        error!("Failed to submit asset #{}: {}", index, e);
                        accepting = false;
                    }
                }
            }

            if in_flight == 0 {
                break;
            }

            match pool.recv_result() {
                Some(task_result) => {
                    in_flight -= 1;
                    tracker.record(task_result.index, &task_result.result);
                    slots[task_result.index] = Some(task_result.result);
                }
                None => {
                    error!("Worker pool closed with {} assets in flight", in_flight);
                    break;
                }
            }
        }

        pool.wait();
    }

    /// Runs one asset through every step.
    pub(crate) fn run_asset(&self, mut ctx: AssetContext, cancel: &CancelToken) -> AssetResult {
        let filename = ctx.asset.file_name();
        let _asset_span = info_span!("asset",
            index = ctx.index,
            filename = %filename,
            document = %ctx.asset.document_id,
            page = %ctx.asset.page_number,
        )
        .entered();

        if cancel.is_cancelled() {
            return Err(self.fail(ctx, PipelineError::Cancelled));
        }

        // Step 1: request + analyze
        {
            let _step = info_span!("analyze").entered();
            if let Err(e) = self.step_analyze(&mut ctx) {
                return Err(self.fail(ctx, e));
            }
        }

        // Step 2: locate and parse the JSON object
        {
            let _step = info_span!("normalize").entered();
            if let Err(e) = self.step_normalize(&mut ctx) {
                return Err(self.fail(ctx, e));
            }
        }

        // Step 3: coerce and check declared fields
        {
            let _step = info_span!("validate").entered();
            if let Err(e) = self.step_validate(&mut ctx) {
                return Err(self.fail(ctx, e));
            }
        }

        // Step 4: attach metadata
        let _step = info_span!("merge").entered();
        Ok(self.step_merge(ctx))
    }

    fn step_analyze(&self, ctx: &mut AssetContext) -> Result<(), PipelineError> {
        let request = {
            let _step = info_span!("request").entered();
            AnalysisRequest::new(&ctx.asset.path, &self.config.prompt, &self.config.parameters)
        };

        let raw = self.client.analyze(&request)?;
        debug!(
            "Reply for {}: {}",
            ctx.asset.file_name(),
            sanitize::truncate_for_log(&raw, sanitize::MAX_LOGGED_RESPONSE)
        );
        ctx.raw_response = Some(raw);
        Ok(())
    }

    fn step_normalize(&self, ctx: &mut AssetContext) -> Result<(), PipelineError> {
        let raw = ctx.raw_response.as_deref().unwrap_or_default();
        let fields = parse_response(raw, self.config.extraction)?;
        ctx.fields = Some(fields);
        Ok(())
    }

    fn step_validate(&self, ctx: &mut AssetContext) -> Result<(), PipelineError> {
        let Some(fields) = ctx.fields.as_mut() else {
            return Ok(());
        };

        self.config.schema.coerce(fields);
        match self.config.schema.validate(fields) {
            Ok(warnings) => {
                for warning in &warnings {
                    warn!(
                        field = %warning.field,
                        value = %warning.value,
                        "Value outside the expected vocabulary"
                    );
                }
                ctx.warnings = warnings;
                Ok(())
            }
            Err(source) => Err(PipelineError::Schema {
                source,
                raw: ctx.raw_response.clone().unwrap_or_default(),
            }),
        }
    }

    fn step_merge(&self, ctx: AssetContext) -> ParsedRecord {
        let fields = ctx.fields.unwrap_or_default();
        debug!("Merged {} fields for {}", fields.len(), ctx.asset.file_name());
        ParsedRecord::new(ctx.asset, fields)
    }

    fn fail(&self, ctx: AssetContext, error: PipelineError) -> AssetFailure {
        match (&error, error.raw_response()) {
            (PipelineError::Cancelled, _) => debug!("Skipped, batch cancelled"),
            (_, Some(raw)) => error!(
                raw = %sanitize::truncate_for_log(raw, sanitize::MAX_LOGGED_RESPONSE),
                "Asset failed: {}",
                error
            ),
            (_, None) => error!("Asset failed: {}", error),
        }
        AssetFailure::from_error(ctx.index, ctx.asset, &error)
    }
}

/// Turns resolved assets into progress events.
struct ProgressTracker<'a> {
    progress: &'a dyn ProgressReporter,
    total: usize,
    attempted: usize,
}

impl<'a> ProgressTracker<'a> {
    fn new(progress: &'a dyn ProgressReporter, total: usize) -> Self {
        Self {
            progress,
            total,
            attempted: 0,
        }
    }

    fn record(&mut self, index: usize, result: &AssetResult) {
        self.attempted += 1;
        let fraction = if self.total == 0 {
            1.0
        } else {
            self.attempted as f64 / self.total as f64
        };

        let event = match result {
            Ok(_) => ProgressEvent::AssetCompleted { index, fraction },
            Err(failure) => ProgressEvent::AssetFailed {
                index,
                kind: failure.kind,
                message: failure.message.clone(),
                fraction,
            },
        };
        self.progress.report(event);
    }
}
