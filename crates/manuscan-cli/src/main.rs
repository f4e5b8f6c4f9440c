use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use manuscan::config::{
    default_config_path, effective_prompt, load_config, save_config, validate_config, Config,
};
use manuscan::logging::{self, LogFormat};
use manuscan::normalize::ExtractionStrategy;
use manuscan::pipeline::{BatchOutcome, CancelToken, LogProgress, Pipeline};
use manuscan::report;
use manuscan::secrets::SecretString;
use manuscan::{load_uploads, AssetMaterializer, InputScanner, Workspace};

#[derive(Parser, Debug)]
#[command(name = "manuscan", version, about = "Analyze manuscript page images with a multimodal model")]
struct Cli {
    /// Configuration file (JSON or YAML); defaults to the user config directory
    #[arg(short, long, global = true, env = "MANUSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging for manuscan
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Per-run values that take precedence over the configuration file.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long, global = true)]
    model: Option<String>,

    #[arg(long, global = true)]
    temperature: Option<f32>,

    #[arg(long, global = true)]
    jpeg_quality: Option<u8>,

    #[arg(long, global = true)]
    prompt_file: Option<PathBuf>,

    /// Key for this run only; never written to the configuration
    #[arg(long, global = true, env = "MANUSCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    workers: Option<usize>,

    /// balanced-object or line-trim
    #[arg(long, global = true)]
    extraction: Option<ExtractionStrategy>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }
        if let Some(path) = &self.prompt_file {
            config.prompt_file = Some(path.clone());
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(extraction) = self.extraction {
            config.pipeline.extraction = extraction;
        }
    }

    fn api_key(&self) -> Option<SecretString> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string()))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Materialize images and zip archives, analyze every page, write reports
    Analyze {
        /// Image files, zip archives, directories or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Write the results workbook here
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Write the HTML report here
        #[arg(long)]
        html: Option<PathBuf>,

        /// Materialization root; overrides pipeline.work_dir
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Remove materialized images once the reports are written
        #[arg(long)]
        cleanup: bool,
    },

    /// Print the prompt that would be sent with every image
    Prompt,

    /// Write the default configuration
    InitConfig {
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file against the schema and value rules
    ValidateConfig { path: Option<PathBuf> },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Analyze {
            inputs,
            xlsx,
            html,
            work_dir,
            cleanup,
        } => {
            let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;
            let work_dir = work_dir
                .clone()
                .unwrap_or_else(|| config.pipeline.work_dir.clone());
            analyze(
                &config,
                cli.overrides.api_key(),
                inputs,
                &work_dir,
                xlsx.as_deref(),
                html.as_deref(),
                *cleanup,
            )
        }
        Command::Prompt => {
            let config = resolve_config(cli.config.as_deref(), &cli.overrides)?;
            println!("{}", effective_prompt(&config)?);
            Ok(())
        }
        Command::InitConfig { path, force } => {
            let path = match path.clone().or_else(default_config_path) {
                Some(path) => path,
                None => bail!("No configuration directory on this platform; pass a path"),
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            save_config(&Config::default(), &path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        Command::ValidateConfig { path } => {
            let path = match path.clone().or_else(|| cli.config.clone()).or_else(default_config_path) {
                Some(path) => path,
                None => bail!("No configuration file given"),
            };
            let config = load_config(&path)
                .with_context(|| format!("Invalid configuration {}", path.display()))?;
            effective_prompt(&config)?;
            println!("{} is valid (provider {:?}, model {})", path.display(), config.provider, config.model);
            Ok(())
        }
    }
}

/// File (explicit, or the default path when it exists), then flag overrides,
/// then the value rules once more.
fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                info!("Using configuration {}", path.display());
                load_config(&path)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))?
            }
            None => Config::default(),
        },
    };

    overrides.apply(&mut config);
    validate_config(&config).context("Invalid value on the command line")?;
    Ok(config)
}

fn analyze(
    config: &Config,
    api_key: Option<SecretString>,
    inputs: &[String],
    work_dir: &Path,
    xlsx: Option<&Path>,
    html: Option<&Path>,
    cleanup: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config, api_key)?;

    let paths = InputScanner::new(inputs.iter().cloned()).scan()?;
    let (uploads, unreadable) = load_uploads(&paths);
    if uploads.is_empty() {
        bail!("No usable uploads among {} inputs", inputs.len());
    }

    let mut workspace = Workspace::create(work_dir)?;
    let materialized = AssetMaterializer::new(config.jpeg_quality).materialize(&uploads, &mut workspace);
    for error in &materialized.errors {
        warn!("Upload skipped: {}", error);
    }
    info!(
        "Materialized {} images from {} uploads ({} unreadable)",
        materialized.assets.len(),
        uploads.len(),
        unreadable.len()
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Interrupted; finishing in-flight requests");
        handler_token.cancel();
    })
    .context("Failed to install the Ctrl-C handler")?;

    let outcome = pipeline.run_with_cancel(&materialized.assets, &LogProgress, &cancel);
    print_summary(&outcome);

    if let Some(path) = xlsx {
        report::write_workbook(&outcome, path)?;
        println!("Workbook written to {}", path.display());
    }
    if let Some(path) = html {
        let image_base = work_dir.to_string_lossy();
        report::write_html(&outcome, &image_base, path)?;
        println!("HTML report written to {}", path.display());
    }

    if cleanup {
        let summary = workspace.cleanup();
        info!(
            "Removed {} materialized files and {} directories",
            summary.files_removed, summary.dirs_removed
        );
    }

    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    println!(
        "{} of {} images analyzed, {} skipped",
        outcome.succeeded(),
        outcome.total,
        outcome.failed()
    );
    for failure in &outcome.failures {
        println!(
            "  {} [{}] {}",
            failure.asset.relative_path.display(),
            failure.kind,
            failure.message
        );
    }
}
