use crate::case::require_initialized;
use clap::Subcommand;
use std::path::Path;
use timeline_store::TimelineConfig;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (display_offset or log_level)
        key: String,
        /// Config value (e.g. "+02:00", "debug")
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

/// `timeline config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = require_initialized(repo_root)?;
    let mut config = TimelineConfig::load(&paths.config_json)?;
    config.set(key, value)?;
    config.save(&paths.config_json)?;
    println!("{key} = {value}");
    Ok(())
}

/// `timeline config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = require_initialized(repo_root)?;
    let config = TimelineConfig::load(&paths.config_json)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => anyhow::bail!("unknown config key {key:?}"),
    }
    Ok(())
}

/// `timeline config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = require_initialized(repo_root)?;
    let config = TimelineConfig::load(&paths.config_json)?;
    for (k, v) in config.entries() {
        println!("{k} = {v}");
    }
    Ok(())
}
