//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "geocoder.zoom")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        // No arguments: show all config
        (None, None) => {
            show_all_config(&config);
        }

        // Key only: show that value
        (Some(key), None) => {
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                eprintln!("Available keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        // Key and value: set the value
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }

        // Value without key: not valid
        (None, Some(_)) => {
            return Err(Error::Config("Must specify a key to set a value".to_string()));
        }
    }

    Ok(())
}

/// Display all configuration values
fn show_all_config(config: &Config) {
    println!("[api]");
    println!("base_url = \"{}\"", config.api.base_url);
    println!("timeout_secs = {}", config.api.timeout_secs);
    println!();

    println!("[geocoder]");
    println!("url = \"{}\"", config.geocoder.url);
    println!("zoom = {}", config.geocoder.zoom);
    if config.geocoder.accept_language.is_empty() {
        println!("accept_language = \"\" # provider default");
    } else {
        println!("accept_language = \"{}\"", config.geocoder.accept_language);
    }
    println!();

    println!("[geolocation]");
    println!("high_accuracy = {}", config.geolocation.high_accuracy);
    println!("timeout_ms = {}", config.geolocation.timeout_ms);
    println!("max_age_ms = {}", config.geolocation.max_age_ms);
    println!();

    println!("[form]");
    println!("debounce_ms = {}", config.form.debounce_ms);
    println!("divergence_tolerance_m = {}", config.form.divergence_tolerance_m);
    println!("snap_to_address = {}", config.form.snap_to_address);
}
