mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{
    RunContext, RunSummary, finish_run, init_run_logging, start_run, write_json_atomic,
};
use sqlgate_core::{Error as CoreError, SchemaIndex, flatten_schema};
use sqlgate_decode::{ConstraintChecker, HeuristicChecker, clean, normalize};
use sqlgate_eval::{
    EvalError, EvaluateOptions, PredictionRow, build_rows, load_examples, read_predictions_tsv,
    read_scored_json, rescore, sample_matches, to_scored, write_dataset_tsv,
    write_predictions_tsv, write_scored_json,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("schema error: {0}")]
    Core(#[from] CoreError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "sqlgate", version, about = "Schema-aware text-to-SQL tooling")]
struct Cli {
    /// Output directory for runs.
    #[arg(long, global = true, default_value = "runs")]
    run_dir: PathBuf,
    /// TOML file with evaluation and decoding options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the flattened schema of one database.
    Flatten(FlattenArgs),
    /// Write the model-input TSV for a list of benchmark examples.
    BuildDataset(BuildDatasetArgs),
    /// Check a (partial) SQL string against a database schema.
    Check(CheckArgs),
    /// Clean predicted SQL and check it against each example's schema.
    Clean(CleanArgs),
    /// Convert a prediction TSV into the scored JSON array.
    Convert(ConvertArgs),
    /// Recompute exact matches of a scored JSON array.
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct FlattenArgs {
    /// Path to tables.json.
    #[arg(long)]
    tables: PathBuf,
    #[arg(long)]
    db_id: String,
}

#[derive(Args, Debug)]
struct BuildDatasetArgs {
    #[arg(long)]
    tables: PathBuf,
    /// Benchmark examples (JSON array with question, db_id, query).
    #[arg(long)]
    examples: PathBuf,
    /// Output TSV; defaults to `<out_dir>/dataset.tsv`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long)]
    tables: PathBuf,
    #[arg(long)]
    db_id: String,
    #[arg(long)]
    sql: String,
}

#[derive(Args, Debug)]
struct CleanArgs {
    #[arg(long)]
    tables: PathBuf,
    /// Prediction TSV (predicted_sql, ground_truth_sql).
    #[arg(long)]
    predictions: PathBuf,
    /// Benchmark examples supplying each row's db_id by position.
    #[arg(long)]
    examples: PathBuf,
    /// Output TSV; defaults to `<out_dir>/cleaned_predictions.tsv`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[arg(long)]
    predictions: PathBuf,
    #[arg(long)]
    examples: PathBuf,
    /// Output JSON; defaults to `<out_dir>/scored.json`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Scored JSON array to rescore.
    #[arg(long)]
    scored: PathBuf,
    /// Rewrite the file with updated exact_match flags.
    #[arg(long, default_value_t = false)]
    write: bool,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => EvaluateOptions::from_toml_path(path)?,
        None => EvaluateOptions::default(),
    };

    let (name, args) = describe(&cli.command);
    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: name.to_string(),
        run_dir: cli.run_dir.clone(),
        args,
        options,
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        command = name,
        run_path = %run_paths.root.display()
    );
    let timer = Instant::now();

    let options = &run_ctx.options;
    let outcome = match cli.command {
        Command::Flatten(args) => run_flatten(args),
        Command::BuildDataset(args) => run_build_dataset(args, options),
        Command::Check(args) => run_check(args),
        Command::Clean(args) => run_clean(args, options),
        Command::Convert(args) => run_convert(args, options),
        Command::Score(args) => run_score(args, options),
    };

    let duration_ms = timer.elapsed().as_millis();
    let (status, counters) = match &outcome {
        Ok(counters) => ("success", counters.clone()),
        Err(err) => {
            tracing::error!(event = "run_failed", error = %err);
            ("failed", Counters::new())
        }
    };
    tracing::info!(event = "run_finished", status = status, duration_ms = duration_ms);

    finish_run(
        &run_paths,
        &RunSummary {
            run_id,
            command: name.to_string(),
            status,
            duration_ms,
            counters,
        },
    )?;

    outcome.map(|_| ())
}

/// Per-command counters recorded in the run summary.
type Counters = BTreeMap<String, u64>;

fn counters<const N: usize>(entries: [(&str, usize); N]) -> Counters {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value as u64))
        .collect()
}

fn load_index(path: &Path) -> Result<SchemaIndex, CliError> {
    let index = SchemaIndex::from_path(path)?;
    tracing::info!(
        event = "schema_index_built",
        path = %path.display(),
        databases = index.len(),
        skipped = index.skipped().len()
    );
    Ok(index)
}

fn run_flatten(args: FlattenArgs) -> Result<Counters, CliError> {
    let index = load_index(&args.tables)?;
    let schema = index
        .lookup(&args.db_id)
        .ok_or_else(|| CliError::InvalidConfig(format!("unknown database: {}", args.db_id)))?;

    println!("{}", flatten_schema(schema));
    Ok(counters([("tables", schema.tables.len()), ("columns", schema.columns.len())]))
}

fn run_build_dataset(
    args: BuildDatasetArgs,
    options: &EvaluateOptions,
) -> Result<Counters, CliError> {
    let index = load_index(&args.tables)?;
    let examples = load_examples(&args.examples)?;
    let rows = build_rows(&examples, &index)?;

    let out = output_path(args.out, options, "dataset.tsv");
    write_dataset_tsv(&out, &rows)?;

    if let Some(first) = rows.first() {
        tracing::info!(event = "dataset_sample", input = %first.input, target = %first.target);
    }
    tracing::info!(event = "dataset_written", rows = rows.len(), path = %out.display());
    println!("rows={} path={}", rows.len(), out.display());
    Ok(counters([("rows", rows.len())]))
}

fn run_check(args: CheckArgs) -> Result<Counters, CliError> {
    let index = load_index(&args.tables)?;
    if !index.contains(&args.db_id) {
        tracing::warn!(event = "schema_lookup_miss", db_id = %args.db_id);
    }

    let verdict = HeuristicChecker::new().check(&args.sql, &args.db_id, &index);
    tracing::info!(event = "sql_checked", db_id = %args.db_id, verdict = ?verdict);

    println!("verdict={verdict:?}");
    println!("cleaned={}", clean(&args.sql));
    println!("normalized={}", normalize(&args.sql));
    Ok(counters([("rejected", usize::from(verdict.is_reject()))]))
}

fn run_clean(args: CleanArgs, options: &EvaluateOptions) -> Result<Counters, CliError> {
    let index = load_index(&args.tables)?;
    let predictions = read_predictions_tsv(&args.predictions)?;
    let db_ids = example_db_ids(&args.examples)?;
    let scored = to_scored(&predictions, &db_ids)?;

    let checker = HeuristicChecker::new();
    let mut rejected = 0usize;
    let mut cleaned_rows = Vec::with_capacity(scored.len());
    for (idx, entry) in scored.iter().enumerate() {
        let cleaned = clean(&entry.query);
        let verdict = checker.check(&cleaned, &entry.db_id, &index);
        if verdict.is_reject() {
            rejected += 1;
            tracing::warn!(
                event = "prediction_rejected",
                index = idx,
                db_id = %entry.db_id,
                sql = %cleaned
            );
        }
        if idx < options.preview_examples {
            tracing::info!(
                event = "prediction_preview",
                index = idx,
                raw = %entry.query,
                cleaned = %cleaned,
                gold = %entry.gold
            );
        }
        cleaned_rows.push(PredictionRow {
            predicted_sql: cleaned,
            ground_truth_sql: entry.gold.clone(),
        });
    }

    let out = output_path(args.out, options, "cleaned_predictions.tsv");
    write_predictions_tsv(&out, &cleaned_rows)?;

    tracing::info!(
        event = "predictions_cleaned",
        rows = cleaned_rows.len(),
        rejected = rejected,
        path = %out.display()
    );
    println!(
        "rows={} rejected={} path={}",
        cleaned_rows.len(),
        rejected,
        out.display()
    );
    Ok(counters([("rows", cleaned_rows.len()), ("rejected", rejected)]))
}

fn run_convert(args: ConvertArgs, options: &EvaluateOptions) -> Result<Counters, CliError> {
    let predictions = read_predictions_tsv(&args.predictions)?;
    let db_ids = example_db_ids(&args.examples)?;
    let scored = to_scored(&predictions, &db_ids)?;

    let out = output_path(args.out, options, "scored.json");
    write_scored_json(&out, &scored)?;

    tracing::info!(event = "scored_json_written", rows = scored.len(), path = %out.display());
    println!("rows={} path={}", scored.len(), out.display());
    Ok(counters([("rows", scored.len())]))
}

fn run_score(args: ScoreArgs, options: &EvaluateOptions) -> Result<Counters, CliError> {
    let mut scored = read_scored_json(&args.scored)?;
    let summary = rescore(&mut scored);

    tracing::info!(
        event = "exact_match_scored",
        total = summary.total,
        exact_matches = summary.exact_matches,
        updated = summary.updated,
        accuracy_pct = summary.accuracy_pct
    );

    if args.write {
        write_json_atomic(&args.scored, &scored)?;
        tracing::info!(event = "scored_json_updated", path = %args.scored.display());
    }

    println!(
        "exact_match={:.2}% ({}/{}) updated={}",
        summary.accuracy_pct, summary.exact_matches, summary.total, summary.updated
    );
    for entry in sample_matches(&scored, options.preview_examples) {
        println!("  [{}] {}", entry.db_id, entry.query);
    }
    Ok(counters([
        ("total", summary.total),
        ("exact_matches", summary.exact_matches),
        ("updated", summary.updated),
    ]))
}

fn example_db_ids(path: &Path) -> Result<Vec<String>, CliError> {
    Ok(load_examples(path)?
        .into_iter()
        .map(|example| example.db_id)
        .collect())
}

fn output_path(out: Option<PathBuf>, options: &EvaluateOptions, file_name: &str) -> PathBuf {
    out.unwrap_or_else(|| options.out_dir.join(file_name))
}

fn describe(command: &Command) -> (&'static str, BTreeMap<String, String>) {
    let mut args = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        args.insert(key.to_string(), value);
    };

    let name = match command {
        Command::Flatten(a) => {
            put("tables", a.tables.display().to_string());
            put("db_id", a.db_id.clone());
            "flatten"
        }
        Command::BuildDataset(a) => {
            put("tables", a.tables.display().to_string());
            put("examples", a.examples.display().to_string());
            if let Some(out) = &a.out {
                put("out", out.display().to_string());
            }
            "build-dataset"
        }
        Command::Check(a) => {
            put("tables", a.tables.display().to_string());
            put("db_id", a.db_id.clone());
            put("sql", a.sql.clone());
            "check"
        }
        Command::Clean(a) => {
            put("tables", a.tables.display().to_string());
            put("predictions", a.predictions.display().to_string());
            put("examples", a.examples.display().to_string());
            if let Some(out) = &a.out {
                put("out", out.display().to_string());
            }
            "clean"
        }
        Command::Convert(a) => {
            put("predictions", a.predictions.display().to_string());
            put("examples", a.examples.display().to_string());
            if let Some(out) = &a.out {
                put("out", out.display().to_string());
            }
            "convert"
        }
        Command::Score(a) => {
            put("scored", a.scored.display().to_string());
            put("write", a.write.to_string());
            "score"
        }
    };

    (name, args)
}
