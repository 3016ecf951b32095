//! Initialize command.

use console::style;

use crate::config::Settings;

/// Write a default config file and create the output tree.
pub fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let config_path = Settings::default_config_path()
        .ok_or_else(|| anyhow::anyhow!("no user config directory available"))?;

    if config_path.exists() {
        println!(
            "{} Config already exists at {}",
            style("!").yellow(),
            config_path.display()
        );
    } else {
        settings.write_to(&config_path)?;
        println!(
            "{} Wrote default config to {}",
            style("✓").green(),
            config_path.display()
        );
    }

    std::fs::create_dir_all(&settings.output_dir)?;
    println!(
        "{} Output directory ready at {}",
        style("✓").green(),
        settings.output_dir.display()
    );

    if !settings.model_path.exists() {
        println!(
            "{} No classifier model at {} (documents will be filed as unclassified)",
            style("!").yellow(),
            settings.model_path.display()
        );
    }

    Ok(())
}
