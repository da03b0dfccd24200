//! Report files written into an output directory.
//!
//! - `{model}_results.json`: one per model, written as soon as it finishes
//! - `comprehensive_results.json`: the whole [`RunReport`]
//! - `flat_results.json`: `(model, family, perturbation, metric, value)` rows
//! - `analysis_report.md`: human-readable summary

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::aggregate::{CounterfactualVerdict, FamilySummary};
use crate::harness::ReportSink;
use crate::report::{ModelReport, ModelStatus, RunReport};

pub const COMPREHENSIVE_FILE: &str = "comprehensive_results.json";
pub const FLAT_FILE: &str = "flat_results.json";
pub const ANALYSIS_FILE: &str = "analysis_report.md";

/// Model name made safe for a file name: `/`, `:` and whitespace become `_`.
pub fn sanitize_model_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == ':' || c.is_whitespace() { '_' } else { c })
        .collect()
}

pub fn model_results_path(output_dir: &Path, model: &str) -> PathBuf {
    output_dir.join(format!("{}_results.json", sanitize_model_name(model)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_model_results(output_dir: &Path, report: &ModelReport) -> Result<PathBuf> {
    let path = model_results_path(output_dir, &report.model);
    write_json(&path, report)?;
    Ok(path)
}

pub fn write_comprehensive_results(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = output_dir.join(COMPREHENSIVE_FILE);
    write_json(&path, report)?;
    Ok(path)
}

pub fn write_flat_results(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = output_dir.join(FLAT_FILE);
    write_json(&path, &report.flat_records())?;
    Ok(path)
}

pub fn write_analysis_md(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = output_dir.join(ANALYSIS_FILE);
    std::fs::write(&path, render_analysis_md(report))
        .with_context(|| format!("write {:?}", path))?;
    Ok(path)
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn render_model(out: &mut String, model: &ModelReport) {
    let _ = writeln!(out, "## {}\n", model.model);

    match model.status {
        ModelStatus::Unavailable => {
            let _ = writeln!(
                out,
                "Status: **unavailable** ({})\n",
                model.error.as_deref().unwrap_or("no reason recorded")
            );
            return;
        }
        ModelStatus::Cancelled => {
            let _ = writeln!(
                out,
                "Status: **cancelled** after {}/{} cases\n",
                model.completed_cases(),
                model.total_cases
            );
        }
        ModelStatus::Completed => {
            let _ = writeln!(
                out,
                "Status: completed, {} cases in {} ms\n",
                model.completed_cases(),
                model.elapsed_ms
            );
        }
    }

    for family in &model.families {
        let _ = writeln!(out, "### {}\n", family.family);
        match &family.summary {
            FamilySummary::Accuracy(summary) => {
                if summary.metrics.is_empty() {
                    out.push_str("No completed cases.\n\n");
                    continue;
                }
                out.push_str("| perturbation | correct | total | errors | accuracy | drop | significant |\n");
                out.push_str("|---|---|---|---|---|---|---|\n");
                for metric in &summary.metrics {
                    let variant = summary
                        .perturbation
                        .as_ref()
                        .and_then(|p| p.variant(metric.perturbation));
                    let (drop, significant) = match variant {
                        Some(v) => (pct(v.drop), if v.significant { "yes" } else { "no" }),
                        None => ("-".to_string(), "-"),
                    };
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} | {} | {} | {} | {} |",
                        metric.perturbation,
                        metric.correct_count,
                        metric.total_count,
                        metric.error_count,
                        pct(metric.accuracy),
                        drop,
                        significant
                    );
                }
                out.push('\n');
                if let Some(verdict) = summary.counterfactual {
                    let _ = writeln!(
                        out,
                        "Counterfactual verdict: {}\n",
                        match verdict {
                            CounterfactualVerdict::MemorizationDependent => "memorization dependent",
                            CounterfactualVerdict::Stable => "stable",
                        }
                    );
                }
            }
            FamilySummary::Style(summary) => {
                let _ = writeln!(
                    out,
                    "- cases: {} (errors {}, unclassifiable {})",
                    summary.case_count, summary.error_count, summary.neutral_count
                );
                let _ = writeln!(out, "- mean memory ratio: {:.3}", summary.mean_memory_ratio);
                let _ = writeln!(
                    out,
                    "- mean alignment: {:.3} ({})\n",
                    summary.mean_alignment,
                    summary.verdict.as_str()
                );
            }
        }
    }
}

fn render_conclusions(out: &mut String, report: &RunReport) {
    out.push_str("## Conclusions\n\n");
    let mut any = false;

    for model in report.models.iter().filter(|m| m.status != ModelStatus::Unavailable) {
        for family in &model.families {
            match &family.summary {
                FamilySummary::Accuracy(summary) => {
                    let Some(perturbation) = &summary.perturbation else {
                        continue;
                    };
                    let flagged: Vec<String> =
                        perturbation.significant().map(|v| v.perturbation.tag()).collect();
                    any = true;
                    if flagged.is_empty() {
                        let _ = writeln!(
                            out,
                            "- {} / {}: no significant drop from {}",
                            model.model, family.family, perturbation.baseline
                        );
                    } else {
                        let _ = writeln!(
                            out,
                            "- {} / {}: significant drop under {} (threshold {})",
                            model.model,
                            family.family,
                            flagged.join(", "),
                            pct(perturbation.threshold)
                        );
                    }
                }
                FamilySummary::Style(summary) if summary.case_count > 0 => {
                    any = true;
                    let _ = writeln!(
                        out,
                        "- {} / {}: {} alignment with expected memory ratios",
                        model.model,
                        family.family,
                        summary.verdict.as_str()
                    );
                }
                FamilySummary::Style(_) => {}
            }
        }
    }

    if !any {
        out.push_str("- no model produced results\n");
    }
}

/// Render `analysis_report.md`.
pub fn render_analysis_md(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("# Memorization vs. Reasoning Analysis\n\n");
    let _ = writeln!(out, "- run: `{}`", report.run_id);
    let _ = writeln!(out, "- generated: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "- suite digest: `{}`", report.suite_digest);
    let _ = writeln!(out, "- seed: {}", report.seed);
    let families: Vec<&str> = report.families.iter().map(|f| f.as_str()).collect();
    let _ = writeln!(out, "- families: {}", families.join(", "));
    if report.cancelled {
        out.push_str("- **run cancelled**: results are partial\n");
    }
    out.push('\n');

    for model in &report.models {
        render_model(&mut out, model);
    }
    render_conclusions(&mut out, report);
    out
}

/// [`ReportSink`] that writes every report file into one directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    /// Create `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("create output dir {:?}", output_dir))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportSink for FileSink {
    fn model_finished(&self, report: &ModelReport) -> Result<()> {
        let path = write_model_results(&self.output_dir, report)?;
        tracing::debug!(path = %path.display(), "model results written");
        Ok(())
    }

    fn run_finished(&self, report: &RunReport) -> Result<()> {
        write_comprehensive_results(&self.output_dir, report)?;
        write_flat_results(&self.output_dir, report)?;
        let path = write_analysis_md(&self.output_dir, report)?;
        tracing::info!(path = %path.display(), "analysis report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_model_name() {
        assert_eq!(sanitize_model_name("ollama:qwen2.5/0.5b"), "ollama_qwen2.5_0.5b");
        assert_eq!(sanitize_model_name("mock large"), "mock_large");
        assert_eq!(sanitize_model_name("openai-gpt-4o"), "openai-gpt-4o");
    }

    #[test]
    fn test_model_results_path() {
        let path = model_results_path(Path::new("/tmp/out"), "local:qwen-0.5b");
        assert_eq!(path, Path::new("/tmp/out/local_qwen-0.5b_results.json"));
    }
}
