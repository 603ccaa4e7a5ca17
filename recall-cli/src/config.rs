use anyhow::{Context, Result};
use recall_core::{MasteryPolicy, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_recall_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub mastery: MasteryPolicy,
    #[serde(default)]
    pub clock: ClockSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockSection {
    /// IANA zone used to read `--now` values that carry no offset.
    pub timezone: String,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl Config {
    /// Scheduler settings with `SRS_*` environment overrides applied last.
    pub fn effective_scheduler(&self) -> SchedulerConfig {
        self.scheduler
            .clone()
            .apply_env_overrides(|key| std::env::var(key).ok())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_recall_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
