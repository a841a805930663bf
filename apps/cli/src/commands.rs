//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use placeseo_core::{
    Pipeline, ProgressReporter, RunReport, SchemaGate, StageContext, archive, describe_external,
    report,
};
use placeseo_shared::{
    AppConfig, ArtifactKind, BrandPaths, PlaceSeoError, ProjectPaths, StageName, check_brand,
    init_config, load_config, load_config_from,
};

/// Exit status for a failed gate or a missing brand directory.
const EXIT_REJECTED: u8 = 2;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// placeseo: keyword mapping, content proposals and schema gating for
/// local-business listings.
#[derive(Parser)]
#[command(
    name = "placeseo",
    version,
    about = "Run the listing SEO pipeline for a brand and gate its artifacts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Project root holding placeseo.toml, clients/ and shared/.
    #[arg(long, global = true, env = "PLACESEO_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file to use instead of the project or user config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run every stage for a brand: normalize-taxonomy, collect, analyze,
    /// improve, generate, validate.
    RunAll {
        #[arg(value_parser = parse_brand)]
        brand: String,

        /// Collect without network access (also MOCK_COLLECTOR=1).
        #[arg(long, env = "MOCK_COLLECTOR", value_parser = FalseyValueParser::new())]
        mock: bool,
    },

    /// Run a single stage for a brand.
    Run {
        stage: StageName,

        #[arg(value_parser = parse_brand)]
        brand: String,

        /// Collect without network access (also MOCK_COLLECTOR=1).
        #[arg(long, env = "MOCK_COLLECTOR", value_parser = FalseyValueParser::new())]
        mock: bool,
    },

    /// Snapshot a brand's artifacts, outputs and inputs.
    Archive {
        #[arg(value_parser = parse_brand)]
        brand: String,

        /// Archive root (defaults to <brand>/archives).
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Summarize the findings in a brand's improved.json.
    Report {
        #[arg(value_parser = parse_brand)]
        brand: String,
    },

    /// Validate a brand's artifacts against the JSON Schema.
    Validate {
        #[arg(value_parser = parse_brand)]
        brand: String,

        /// Schema file (defaults to the configured or built-in schema).
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// List brands and the artifacts they have.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn parse_brand(value: &str) -> std::result::Result<String, String> {
    check_brand(value)
        .map(|()| value.to_string())
        .map_err(|e| e.to_string())
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default placeseo.toml into the project root.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "placeseo=info",
        1 => "placeseo=debug",
        _ => "placeseo=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Loaded configuration plus the paths it resolves to.
struct Project {
    root: PathBuf,
    config: AppConfig,
    paths: ProjectPaths,
}

impl Project {
    fn load(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()
                .map_err(|e| eyre!("cannot determine working directory: {e}"))?,
        };
        let config = match &cli.config {
            Some(path) => load_config_from(path)?,
            None => load_config(&root)?,
        };
        let paths = ProjectPaths::resolve(&root, &config);
        Ok(Self {
            root,
            config,
            paths,
        })
    }

    fn brand(&self, brand: &str) -> BrandPaths {
        BrandPaths::for_brand(&self.paths.clients_dir, brand)
    }
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let project = Project::load(&cli)?;

    match cli.command {
        Command::RunAll { brand, mock } => cmd_run_all(&project, &brand, mock).await,
        Command::Run { stage, brand, mock } => cmd_run(&project, stage, &brand, mock).await,
        Command::Archive { brand, dest } => cmd_archive(&project, &brand, dest.as_deref()),
        Command::Report { brand } => cmd_report(&project, &brand),
        Command::Validate { brand, schema } => cmd_validate(&project, &brand, schema.as_deref()),
        Command::List => cmd_list(&project),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&project),
            ConfigAction::Show => cmd_config_show(&project),
        },
    }
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_run_all(project: &Project, brand: &str, mock: bool) -> Result<ExitCode> {
    let pipeline = Pipeline::standard(&project.config, &project.root)?;
    let ctx = StageContext::new(&project.paths.clients_dir, brand, mock);
    info!(brand, mock, run_id = %ctx.run_id, "running pipeline");

    let progress = CliProgress::new();
    match pipeline.run(&ctx, &progress).await {
        Ok(report) => {
            println!();
            println!("  Pipeline completed for {brand}");
            println!("  Run:    {}", report.run_id);
            for timing in &report.stages {
                println!(
                    "  {:<20} {:.2}s",
                    timing.stage.as_str(),
                    timing.elapsed.as_secs_f64()
                );
            }
            println!("  Total:  {:.1}s", report.elapsed.as_secs_f64());
            println!();
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_run(project: &Project, stage: StageName, brand: &str, mock: bool) -> Result<ExitCode> {
    let pipeline = Pipeline::standard(&project.config, &project.root)?;
    let ctx = StageContext::new(&project.paths.clients_dir, brand, mock);

    match pipeline.run_single(stage, &ctx).await {
        Ok(timing) => {
            println!("{stage} finished in {:.2}s", timing.elapsed.as_secs_f64());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The failing stage, its error, and every violation it carries.
fn print_failure(err: &PlaceSeoError) {
    eprintln!("error: {err}");
    for violation in err.violations() {
        eprintln!("  - {}: {}", display_path(&violation.path), violation.message);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: StageName, index: usize, total: usize) {
        self.spinner.set_message(format!("[{index}/{total}] {stage}"));
    }

    fn stage_finished(&self, stage: StageName, elapsed: Duration) {
        self.spinner
            .println(format!("  ✓ {stage} ({:.2}s)", elapsed.as_secs_f64()));
    }

    fn stage_failed(&self, stage: StageName, _error: &PlaceSeoError) {
        self.spinner.println(format!("  ✗ {stage}"));
        self.spinner.finish_and_clear();
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Brand directory commands
// ---------------------------------------------------------------------------

fn cmd_archive(project: &Project, brand: &str, dest: Option<&Path>) -> Result<ExitCode> {
    let paths = project.brand(brand);
    match archive(paths.root(), dest) {
        Ok(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(PlaceSeoError::NotFound { path, .. }) => {
            eprintln!("brand directory not found: {}", path.display());
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_report(project: &Project, brand: &str) -> Result<ExitCode> {
    let improved = report::load(&project.brand(brand))?;
    print!("{}", report::render(&improved));
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(project: &Project, brand: &str, schema: Option<&Path>) -> Result<ExitCode> {
    let gate = SchemaGate::load(schema.or(project.paths.schema.as_deref()))?;
    info!(brand, schema = gate.source(), "validating artifacts");

    let report = gate.validate_brand(&project.brand(brand));
    for file in &report.files {
        let name = file.kind.file_name();
        if file.passed() {
            println!("OK {name}");
            continue;
        }
        println!("FAIL {name}");
        for violation in file.violations() {
            println!("  - {}: {}", display_path(&violation.path), violation.message);
        }
    }

    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_REJECTED))
    }
}

/// Empty pointers refer to the document root.
fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

fn cmd_list(project: &Project) -> Result<ExitCode> {
    let clients = &project.paths.clients_dir;
    let entries = match std::fs::read_dir(clients) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("no clients directory at {}", clients.display());
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(PlaceSeoError::io(clients, e).into()),
    };

    let mut brands: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    brands.sort();

    for brand in brands {
        let paths = project.brand(&brand);
        let present: Vec<&str> = ArtifactKind::ALL
            .into_iter()
            .filter(|kind| paths.artifact(*kind).is_file())
            .map(|kind| kind.stage_tag())
            .collect();
        println!("{brand:<24} {}", present.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init(project: &Project) -> Result<ExitCode> {
    let path = init_config(&project.root)?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(project: &Project) -> Result<ExitCode> {
    let toml_str = toml::to_string_pretty(&project.config)?;
    println!("{toml_str}");

    let external = describe_external(&project.config)?;
    for (stage, command) in external {
        println!("# {stage} runs `{command}`");
    }
    Ok(ExitCode::SUCCESS)
}
