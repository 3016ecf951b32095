//! Classify and batch commands.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::analytics::{AnalyticsLogger, ProcessingRecord};
use crate::config::Settings;
use crate::filing::FilingMode;
use crate::models::{ProcessingOutcome, ProcessingStatus};
use crate::pipeline::Pipeline;

/// Classify a single document and file it.
pub async fn cmd_classify(
    settings: &Settings,
    file: &Path,
    mode: FilingMode,
) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("not a file: {}", file.display());
    }

    let pipeline = Arc::new(Pipeline::from_settings(settings)?);
    let analytics = AnalyticsLogger::open(&settings.analytics_db)?;

    let path = file.to_path_buf();
    let worker = Arc::clone(&pipeline);
    let outcome =
        tokio::task::spawn_blocking(move || worker.process(&path, mode)).await??;

    analytics.log(&ProcessingRecord::from(&outcome));
    print_outcome(&outcome);
    Ok(())
}

/// Classify every supported document in a directory.
///
/// One bad document never stops the run; failures are counted and the
/// run exits non-zero only when nothing was processable at all.
pub async fn cmd_batch(settings: &Settings, dir: &Path, mode: FilingMode) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && Pipeline::is_supported(path))
        .collect();
    files.sort();

    if files.is_empty() {
        println!(
            "{} No supported documents in {}",
            style("!").yellow(),
            dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Processing {} documents from {}",
        style("→").cyan(),
        files.len(),
        dir.display()
    );

    let pipeline = Arc::new(Pipeline::from_settings(settings)?);
    let analytics = Arc::new(AnalyticsLogger::open(&settings.analytics_db)?);

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    let worker = Arc::clone(&pipeline);
    let log = Arc::clone(&analytics);
    let bar = progress.clone();
    let (processed, failed) = tokio::task::spawn_blocking(move || {
        let mut processed = 0u64;
        let mut failed = 0u64;
        for path in &files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            bar.set_message(name.clone());

            match worker.process(path, mode) {
                Ok(outcome) => {
                    log.log(&ProcessingRecord::from(&outcome));
                    match outcome.status {
                        ProcessingStatus::Error => failed += 1,
                        _ => processed += 1,
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to file {}: {}", name, e);
                    failed += 1;
                }
            }
            bar.inc(1);
        }
        (processed, failed)
    })
    .await?;
    progress.finish_and_clear();

    println!(
        "{} Batch done: {} processed, {} failed",
        style("✓").green(),
        processed,
        failed
    );
    if processed == 0 && failed > 0 {
        anyhow::bail!("all {} documents failed", failed);
    }
    Ok(())
}

fn print_outcome(outcome: &ProcessingOutcome) {
    let mark = match outcome.status {
        ProcessingStatus::Success => style("✓").green(),
        ProcessingStatus::EmptyDocument => style("!").yellow(),
        ProcessingStatus::Error => style("✗").red(),
    };
    println!(
        "{} {} -> {} ({:.1}%)",
        mark, outcome.filename, outcome.category, outcome.confidence
    );
    println!("  Filed at {}", outcome.decision.destination.display());
    println!(
        "  {} chars extracted in {:.1}s",
        outcome.text_chars,
        outcome.duration.as_secs_f64()
    );

    let fields = &outcome.fields;
    for (label, values) in [
        ("dates", &fields.dates),
        ("amounts", &fields.amounts),
        ("emails", &fields.emails),
        ("phones", &fields.phones),
    ] {
        if !values.is_empty() {
            println!("  {}: {}", label, values.join(", "));
        }
    }
    if let Some(error) = &outcome.error {
        println!("  {} {}", style("✗").red(), error);
    }
}
