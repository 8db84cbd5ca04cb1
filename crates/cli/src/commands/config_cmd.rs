//! `briefing config` — Show or validate configuration.

use super::load_config;
use briefing_config::BriefingConfig;
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    validate: bool,
    defaults: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if defaults {
        print!("{}", BriefingConfig::default_toml());
        return Ok(());
    }

    let config = load_config(config_path)?;
    if validate {
        eprintln!("Configuration is valid");
        return Ok(());
    }

    println!("# state_dir = {}", config.storage.resolved_state_dir().display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
