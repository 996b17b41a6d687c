//! `ferry config` – show where the config lives and what it resolves to.

use anyhow::Result;
use ferry_core::config::{self, FerryConfig};

pub fn run_config(cfg: &FerryConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    if let Err(e) = cfg.validate() {
        println!("# invalid: {:#}", e);
    }
    Ok(())
}
