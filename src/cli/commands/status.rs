//! Status command.

use console::style;

use crate::analytics::AnalyticsLogger;
use crate::classify::ClassifierModel;
use crate::config::Settings;
use crate::ocr::check_binary;

/// Show tool availability, model state and processing statistics.
pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    println!("{} External tools", style("→").cyan());
    for tool in ["tesseract", "pdftoppm"] {
        let state = if check_binary(tool) {
            style("available").green()
        } else {
            style("missing").red()
        };
        println!("  {:<12} {}", tool, state);
    }

    println!("{} Model", style("→").cyan());
    println!("  Path: {}", settings.model_path.display());
    match ClassifierModel::load(&settings.model_path) {
        Ok(model) => {
            println!("  Categories: {}", model.classes().join(", "));
        }
        Err(e) => {
            println!("  {} {}", style("!").yellow(), e);
        }
    }

    if !settings.analytics_db.exists() {
        println!(
            "{} No analytics database at {} (nothing processed yet)",
            style("!").yellow(),
            settings.analytics_db.display()
        );
        return Ok(());
    }

    let analytics = AnalyticsLogger::open(&settings.analytics_db)?;
    let stats = analytics.stats()?;

    println!("{} Processing summary", style("→").cyan());
    println!("  Total documents:  {}", stats.total);
    println!("  Succeeded:        {}", stats.succeeded);
    println!("  Failed:           {}", stats.failed);
    println!("  Avg confidence:   {:.1}%", stats.avg_confidence);

    if !stats.by_category.is_empty() {
        println!("  By category:");
        for (category, count) in &stats.by_category {
            println!("    {:<24} {}", category, count);
        }
    }

    Ok(())
}
