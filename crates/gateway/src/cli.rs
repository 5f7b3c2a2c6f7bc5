//! Config loading and the `config` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use adj_domain::config::{Config, ConfigSeverity};

pub const CONFIG_ENV: &str = "ADJUTANT_CONFIG";
pub const CONFIG_DEFAULT: &str = "config.toml";

/// Resolve the config path (flag, then `ADJUTANT_CONFIG`, then
/// `config.toml`) and load it. A missing file is not an error: every
/// field has a default, so the process can run unconfigured in dev.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path: PathBuf = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DEFAULT));

    if !path.exists() {
        if explicit.is_some() {
            bail!("config file {} not found", path.display());
        }
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// `config validate`: print every issue; exit nonzero on hard errors.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    if issues.is_empty() {
        println!("configuration ok");
        return Ok(());
    }

    let mut errors = 0;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => println!("warning: {issue}"),
            ConfigSeverity::Error => {
                println!("error: {issue}");
                errors += 1;
            }
        }
    }
    if errors > 0 {
        bail!("{errors} error(s)");
    }
    Ok(())
}

/// `config show`: print the effective configuration after defaults.
pub fn show(config: &Config) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config).context("serializing config")?);
    Ok(())
}
