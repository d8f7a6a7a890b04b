use std::collections::BTreeMap;
use std::fs::{OpenOptions, create_dir_all};
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlgate_eval::EvaluateOptions;

use super::{RegistryResult, write_json_atomic};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub run_dir: PathBuf,
    /// Command arguments as given, for reproducibility.
    pub args: BTreeMap<String, String>,
    pub options: EvaluateOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig<'a> {
    pub run_id: &'a str,
    pub started_at: String,
    pub command: &'a str,
    pub args: &'a BTreeMap<String, String>,
    pub options: &'a EvaluateOptions,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Outcome recorded in `summary.json` when a command completes.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub command: String,
    pub status: &'static str,
    pub duration_ms: u128,
    /// Command-specific counters (rows written, rejects, matches).
    pub counters: BTreeMap<String, u64>,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an empty
/// `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ");
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        command: &ctx.command,
        args: &ctx.args,
        options: &ctx.options,
        git: collect_git_info(),
    };
    write_json_atomic(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        summary_path: root.join("summary.json"),
        logs_path,
        root,
    })
}

pub fn finish_run(paths: &RunPaths, summary: &RunSummary) -> RegistryResult<()> {
    write_json_atomic(&paths.summary_path, summary)
}

pub fn collect_git_info() -> GitInfo {
    let commit = git(&["rev-parse", "HEAD"])
        .map(|stdout| String::from_utf8_lossy(&stdout).trim().to_string())
        .filter(|value| !value.is_empty());
    let dirty = git(&["status", "--porcelain"]).map(|stdout| !stdout.is_empty());

    GitInfo { commit, dirty }
}

/// Stdout of a successful git invocation; `None` outside a repository or
/// without git installed.
fn git(args: &[&str]) -> Option<Vec<u8>> {
    let output = Command::new("git").args(args).output().ok()?;
    output.status.success().then_some(output.stdout)
}
