//! Per-brand stage orchestration.
//!
//! Stages run strictly in sequence because each one consumes the artifact the
//! previous one wrote. The first failure aborts the run; nothing after it is
//! invoked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{error, info, instrument};

use placeseo_shared::{
    AppConfig, BrandPaths, PlaceSeoError, ProjectPaths, Result, RunId, StageCommandConfig,
    StageName,
};

use crate::stages;

// ---------------------------------------------------------------------------
// Stage trait and context
// ---------------------------------------------------------------------------

/// Everything a stage needs to know about the run it belongs to.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: RunId,
    pub brand: String,
    pub paths: BrandPaths,
    /// Collect from a local fixture instead of the network.
    pub mock: bool,
}

impl StageContext {
    pub fn new(clients_dir: &Path, brand: &str, mock: bool) -> Self {
        Self {
            run_id: RunId::new(),
            brand: brand.to_string(),
            paths: BrandPaths::for_brand(clients_dir, brand),
            mock,
        }
    }
}

/// One unit of work in a brand run.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn run(&self, ctx: &StageContext) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Callbacks for rendering run progress.
pub trait ProgressReporter: Send + Sync {
    /// `index` is 1-based.
    fn stage_started(&self, stage: StageName, index: usize, total: usize);
    fn stage_finished(&self, stage: StageName, elapsed: Duration);
    fn stage_failed(&self, stage: StageName, error: &PlaceSeoError);
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: StageName, _index: usize, _total: usize) {}
    fn stage_finished(&self, _stage: StageName, _elapsed: Duration) {}
    fn stage_failed(&self, _stage: StageName, _error: &PlaceSeoError) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: StageName,
    pub elapsed: Duration,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub brand: String,
    pub stages: Vec<StageTiming>,
    pub elapsed: Duration,
}

/// An ordered list of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The standard six-stage pipeline. `[stages.<name>]` commands in the
    /// config replace the built-in stage of the same name.
    pub fn standard(config: &AppConfig, root: &Path) -> Result<Self> {
        let project = ProjectPaths::resolve(root, config);
        let mut external = config.external_stages()?;

        let mut list: Vec<Box<dyn Stage>> = Vec::with_capacity(StageName::ALL.len());
        for name in StageName::ALL {
            let stage: Box<dyn Stage> = match external.remove(&name) {
                Some(cmd) => Box::new(ExternalStage::new(name, &cmd, root)),
                None => stages::builtin(name, config, &project)?,
            };
            list.push(stage);
        }
        Ok(Self::new(list))
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure.
    #[instrument(skip_all, fields(brand = %ctx.brand, run_id = %ctx.run_id, mock = ctx.mock))]
    pub async fn run(&self, ctx: &StageContext, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        let total = self.stages.len();
        let mut timings = Vec::with_capacity(total);

        info!(stages = total, "starting brand run");

        for (i, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            progress.stage_started(name, i + 1, total);

            let timing = match run_stage(stage.as_ref(), ctx).await {
                Ok(timing) => timing,
                Err(err) => {
                    progress.stage_failed(name, &err);
                    return Err(err);
                }
            };
            progress.stage_finished(name, timing.elapsed);
            timings.push(timing);
        }

        let report = RunReport {
            run_id: ctx.run_id,
            brand: ctx.brand.clone(),
            stages: timings,
            elapsed: start.elapsed(),
        };
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "brand run complete");
        progress.done(&report);
        Ok(report)
    }

    /// Run one stage by name.
    pub async fn run_single(&self, name: StageName, ctx: &StageContext) -> Result<StageTiming> {
        let stage = self
            .stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| PlaceSeoError::config(format!("stage `{name}` is not in this pipeline")))?;
        run_stage(stage.as_ref(), ctx).await
    }
}

async fn run_stage(stage: &dyn Stage, ctx: &StageContext) -> Result<StageTiming> {
    let name = stage.name();
    let start = Instant::now();
    info!(stage = %name, "stage started");

    match stage.run(ctx).await {
        Ok(()) => {
            let elapsed = start.elapsed();
            info!(stage = %name, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
            Ok(StageTiming {
                stage: name,
                elapsed,
            })
        }
        Err(err) => {
            error!(stage = %name, error = %err, "stage failed, aborting run");
            Err(err.in_stage(name))
        }
    }
}

// ---------------------------------------------------------------------------
// External stages
// ---------------------------------------------------------------------------

/// A stage implemented by another program.
///
/// The brand is passed as the last argument and in `BRAND`; `MOCK_COLLECTOR`
/// is `1` or `0`; `PLACESEO_BRAND_DIR` points at the brand directory. The
/// child's stdout is sent to our stderr so command output stays clean.
#[derive(Debug, Clone)]
pub struct ExternalStage {
    name: StageName,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ExternalStage {
    pub fn new(name: StageName, config: &StageCommandConfig, working_dir: &Path) -> Self {
        let (program, args) = config
            .command
            .split_first()
            .map(|(p, a)| (p.clone(), a.to_vec()))
            .unwrap_or_default();
        Self {
            name,
            program,
            args,
            working_dir: working_dir.to_path_buf(),
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Stage for ExternalStage {
    fn name(&self) -> StageName {
        self.name
    }

    #[instrument(skip_all, fields(stage = %self.name, command = %self.command_line()))]
    async fn run(&self, ctx: &StageContext) -> Result<()> {
        if self.program.is_empty() {
            return Err(PlaceSeoError::config(format!(
                "[stages.{}] command must not be empty",
                self.name
            )));
        }

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&ctx.brand)
            .current_dir(&self.working_dir)
            .env("BRAND", &ctx.brand)
            .env("MOCK_COLLECTOR", if ctx.mock { "1" } else { "0" })
            .env("PLACESEO_BRAND_DIR", ctx.paths.root())
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| PlaceSeoError::io(&self.program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(PlaceSeoError::External {
                command: self.command_line(),
                status: status.to_string(),
            })
        }
    }
}

/// Stage names mapped to their configured command lines, for display.
pub fn describe_external(config: &AppConfig) -> Result<BTreeMap<StageName, String>> {
    Ok(config
        .external_stages()?
        .into_iter()
        .map(|(name, cmd)| (name, cmd.command.join(" ")))
        .collect())
}
