//! memprobe - memorization vs. reasoning probe for language models
//!
//! ## Commands
//!
//! - `run`: query every model over the task suite and write reports
//! - `check`: availability probe only, no cases are run
//! - `models`: list the preset model catalog
//! - `suite`: dump the generated task cases as JSON

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use memprobe_backends::{build_clients, BackendSettings, PRESETS};
use memprobe_core::{
    check_availability, evaluate_gate, init_tracing, FamilySummary, FileSink, Harness, LogFormat,
    ModelClient, ModelStatus, RunReport, TaskCase, TaskFamily, TaskSuite,
};
use serde::Serialize;
use tracing::{info, warn, Level};

use crate::config::{Overrides, ProbeConfig};

#[derive(Parser)]
#[command(name = "memprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe whether language models recall or reason", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "MEMPROBE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the task suite against one or more models
    Run(RunArgs),

    /// Check that models answer at all, without running the suite
    Check {
        /// Model specs (provider:model or a preset key)
        #[arg(short, long, value_delimiter = ',', env = "MEMPROBE_MODELS")]
        models: Vec<String>,

        /// Seconds to wait for each probe
        #[arg(long, env = "MEMPROBE_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
    },

    /// List preset models
    Models,

    /// Dump generated task cases as JSON
    Suite {
        /// Families to include (default: all)
        #[arg(short, long, value_delimiter = ',', env = "MEMPROBE_FAMILIES")]
        families: Vec<TaskFamily>,

        #[arg(long, env = "MEMPROBE_SEED")]
        seed: Option<u64>,

        /// Extra arithmetic problems to generate
        #[arg(long, env = "MEMPROBE_GENERATED")]
        generated: Option<usize>,

        /// Extra logic puzzles to generate
        #[arg(long, env = "MEMPROBE_GENERATED_PUZZLES")]
        generated_puzzles: Option<usize>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Model specs: openai:<model>, ollama:<model>, local:<preset>, sim:<name>
    #[arg(short, long, value_delimiter = ',', env = "MEMPROBE_MODELS")]
    models: Vec<String>,

    /// Task families (arithmetic, logic_puzzle, memory_reasoning)
    #[arg(short, long, value_delimiter = ',', env = "MEMPROBE_FAMILIES")]
    families: Vec<TaskFamily>,

    /// Directory for report files
    #[arg(short, long, env = "MEMPROBE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[arg(long, env = "MEMPROBE_SEED")]
    seed: Option<u64>,

    /// Maximum in-flight queries per model
    #[arg(long, env = "MEMPROBE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-query timeout in seconds
    #[arg(long, env = "MEMPROBE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Relative accuracy drop flagged as significant
    #[arg(long, env = "MEMPROBE_THRESHOLD")]
    threshold: Option<f64>,

    /// Extra arithmetic problems to generate
    #[arg(long, env = "MEMPROBE_GENERATED")]
    generated: Option<usize>,

    /// Extra logic puzzles to generate
    #[arg(long, env = "MEMPROBE_GENERATED_PUZZLES")]
    generated_puzzles: Option<usize>,

    /// Skip the availability probe
    #[arg(long)]
    skip_check: bool,

    /// Exit non-zero when the regression gate fails
    #[arg(long)]
    fail_on_regression: bool,
}

impl From<RunArgs> for Overrides {
    fn from(args: RunArgs) -> Self {
        Overrides {
            models: args.models,
            families: args.families,
            output_dir: args.output_dir,
            seed: args.seed,
            concurrency: args.concurrency,
            timeout_secs: args.timeout_secs,
            threshold: args.threshold,
            generated: args.generated,
            generated_puzzles: args.generated_puzzles,
            skip_availability_check: args.skip_check,
            fail_on_regression: args.fail_on_regression,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Text };
    init_tracing(format, level);

    let config = ProbeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => cmd_run(config.apply(args.into())).await,
        Commands::Check {
            models,
            timeout_secs,
        } => {
            let config = config.apply(Overrides {
                models,
                timeout_secs,
                ..Overrides::default()
            });
            cmd_check(&config).await
        }
        Commands::Models => cmd_models(),
        Commands::Suite {
            families,
            seed,
            generated,
            generated_puzzles,
            output,
        } => {
            let config = config.apply(Overrides {
                families,
                seed,
                generated,
                generated_puzzles,
                ..Overrides::default()
            });
            cmd_suite(&config, output.as_deref())
        }
    }
}

async fn cmd_run(config: ProbeConfig) -> Result<()> {
    config.validate()?;

    let suite = TaskSuite::build(&config.suite_config());
    let settings = BackendSettings::from_env(config.seed);
    let models = build_clients(&config.models, &settings, &suite)
        .context("Failed to configure model backends")?;
    let sink = FileSink::new(&config.output_dir)?;

    println!(
        "Running {} cases against {} model(s), seed {}",
        suite.len(),
        models.len(),
        config.seed
    );

    let harness = Harness::new(suite, config.harness_config());
    let cancel = harness.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight cases");
            cancel.cancel();
        }
    });

    let report = harness
        .run(&models, &sink)
        .await
        .context("Probe run failed")?;

    print_summary(&report);
    println!("\nReports written to {:?}", sink.output_dir());

    let verdict = evaluate_gate(&config.gate_rules(), &report);
    if verdict.passed() {
        println!("Gate: PASSED");
    } else {
        println!("Gate: FAILED");
        for violation in &verdict.violations {
            println!("  - {}: {}", violation.model, violation.reason);
        }
    }

    if report.cancelled {
        anyhow::bail!("Run cancelled; reports contain partial results");
    }
    if config.fail_on_regression && !verdict.passed() {
        anyhow::bail!("Regression gate failed with {} violation(s)", verdict.violations.len());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("\nRun {} ({} ms)", report.run_id, report.elapsed_ms);
    for model in &report.models {
        println!("\n{} [{}]", model.model, model.status.as_str());
        if model.status == ModelStatus::Unavailable {
            println!("  {}", model.error.as_deref().unwrap_or("unavailable"));
            continue;
        }
        for family in &model.families {
            match &family.summary {
                FamilySummary::Accuracy(summary) => {
                    let cells: Vec<String> = summary
                        .metrics
                        .iter()
                        .map(|m| format!("{} {:.1}%", m.perturbation, m.accuracy * 100.0))
                        .collect();
                    println!("  {}: {}", family.family, cells.join(", "));
                    if let Some(perturbation) = &summary.perturbation {
                        for variant in perturbation.significant() {
                            println!(
                                "    significant drop under {}: {:.1}%",
                                variant.perturbation,
                                variant.drop * 100.0
                            );
                        }
                    }
                }
                FamilySummary::Style(summary) => {
                    println!(
                        "  {}: memory ratio {:.3}, alignment {:.3} ({})",
                        family.family,
                        summary.mean_memory_ratio,
                        summary.mean_alignment,
                        summary.verdict.as_str()
                    );
                }
            }
        }
    }
}

async fn cmd_check(config: &ProbeConfig) -> Result<()> {
    if config.models.is_empty() {
        anyhow::bail!("No models given; pass --models or set `models` in the config file");
    }
    let suite = TaskSuite::build(&config.suite_config());
    let settings = BackendSettings::from_env(config.seed);
    let models: Vec<Arc<dyn ModelClient>> = build_clients(&config.models, &settings, &suite)
        .context("Failed to configure model backends")?;
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    let mut unavailable = 0;
    for model in &models {
        match check_availability(model.as_ref(), timeout).await {
            Ok(()) => println!("  ✓ {}", model.model_name()),
            Err(e) => {
                unavailable += 1;
                println!("  ✗ {}", e);
            }
        }
    }
    info!(models = models.len(), unavailable, "availability check finished");

    if unavailable > 0 {
        anyhow::bail!("{} of {} model(s) unavailable", unavailable, models.len());
    }
    println!("All {} model(s) available", models.len());
    Ok(())
}

fn cmd_models() -> Result<()> {
    println!("{:<12} {:<36} {:<6} {}", "KEY", "UPSTREAM", "4BIT", "MAX_LEN");
    for preset in PRESETS {
        println!(
            "{:<12} {:<36} {:<6} {}",
            preset.key,
            preset.upstream,
            if preset.load_in_4bit { "yes" } else { "no" },
            preset.max_length
        );
    }
    println!("\nAlso accepted: openai:<model>, ollama:<model>, sim:<name>");
    Ok(())
}

#[derive(Serialize)]
struct SuiteDump<'a> {
    seed: u64,
    digest: String,
    families: Vec<TaskFamily>,
    cases: &'a [TaskCase],
}

fn cmd_suite(config: &ProbeConfig, output: Option<&Path>) -> Result<()> {
    let suite = TaskSuite::build(&config.suite_config());
    let dump = SuiteDump {
        seed: config.seed,
        digest: suite.digest().context("Failed to hash suite")?,
        families: suite.families(),
        cases: suite.cases(),
    };
    let json = serde_json::to_string_pretty(&dump)?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            println!("Wrote {} cases to {:?}", suite.len(), path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
