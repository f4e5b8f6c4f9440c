//! Test harness for isolated test execution.
//!
//! `TestHarness` owns a temp directory with an input folder for uploads, a
//! work folder the materializer writes into, and an output folder for reports.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use manuscan::analysis::AnalysisClient;
use manuscan::asset::Upload;
use manuscan::config::Config;
use manuscan::materializer::{AssetMaterializer, MaterializeReport, Workspace};
use manuscan::pipeline::{BatchOutcome, NoopProgress, Pipeline, PipelineConfig, ProgressReporter};

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let input_dir = base.join("input");
        let work_dir = base.join("work");
        let output_dir = base.join("output");
        let config_dir = base.join("config");

        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            input_dir,
            work_dir,
            output_dir,
            config_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write an upload into the input directory.
    pub fn write_input(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn write_config_text(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write config file");
        path
    }

    pub fn write_config(&self, filename: &str, config: &Config) -> PathBuf {
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        self.write_config_text(filename, &json)
    }

    /// Reads back an input file as an upload.
    pub fn upload(&self, filename: &str) -> Upload {
        Upload::from_path(&self.input_dir.join(filename)).expect("Failed to read upload")
    }

    /// Materializes uploads into the work directory, returning the workspace
    /// so callers can clean up.
    pub fn materialize(&self, uploads: &[Upload]) -> (MaterializeReport, Workspace) {
        let mut workspace = Workspace::create(&self.work_dir).expect("Failed to create workspace");
        let report = AssetMaterializer::new(70).materialize(uploads, &mut workspace);
        (report, workspace)
    }

    pub fn pipeline<C>(&self, config: PipelineConfig, client: Arc<C>) -> Pipeline
    where
        C: AnalysisClient + 'static,
    {
        Pipeline::new(config, client)
    }

    /// Materializes and analyzes in one go.
    pub fn run<C>(
        &self,
        uploads: &[Upload],
        config: PipelineConfig,
        client: Arc<C>,
        progress: &dyn ProgressReporter,
    ) -> BatchOutcome
    where
        C: AnalysisClient + 'static,
    {
        let (report, _workspace) = self.materialize(uploads);
        assert!(
            report.errors.is_empty(),
            "unexpected materialization errors: {:?}",
            report.errors
        );
        self.pipeline(config, client).run(&report.assets, progress)
    }

    pub fn run_quiet<C>(&self, uploads: &[Upload], config: PipelineConfig, client: Arc<C>) -> BatchOutcome
    where
        C: AnalysisClient + 'static,
    {
        self.run(uploads, config, client, &NoopProgress)
    }

    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }
}
