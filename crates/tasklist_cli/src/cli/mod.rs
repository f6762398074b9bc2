use clap::Parser;
use std::path::PathBuf;
use tasklist_core::config::{SettingsOverrides, canonical_key};

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive task list kept in a plain text file", long_about = None)]
pub struct Cli {
    /// Task file to use instead of the configured one
    ///
    /// Example: tasklist --file ~/notes/tasks.txt
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Colour theme (default, noir, solarized)
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Return to the menu without waiting for Enter
    #[arg(long)]
    pub no_pause: bool,

    /// Override configuration values (format KEY=VALUE)
    ///
    /// Keys: theme, store_path, pause
    #[arg(long = "config-override", value_name = "KEY=VALUE")]
    pub config_override: Vec<String>,
}

impl Cli {
    /// Folds `--config-override` values and the dedicated flags into one set of
    /// overrides. Dedicated flags win over `--config-override`.
    pub fn overrides(&self) -> Result<SettingsOverrides, String> {
        let mut overrides = SettingsOverrides::default();

        for raw in &self.config_override {
            let parsed = parse_config_override(raw)?;
            match parsed.target {
                ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
                ConfigOverrideTarget::StorePath => {
                    if parsed.value.is_empty() {
                        return Err("store_path override cannot be empty".to_string());
                    }
                    overrides.store_path = Some(PathBuf::from(parsed.value));
                }
                ConfigOverrideTarget::Pause => {
                    overrides.pause_after_action = Some(parse_switch(&parsed.value)?)
                }
            }
        }

        if let Some(file) = self.file.as_ref() {
            overrides.store_path = Some(file.clone());
        }
        if let Some(theme) = self.theme.as_ref() {
            overrides.theme = Some(theme.clone());
        }
        if self.no_pause {
            overrides.pause_after_action = Some(false);
        }

        Ok(overrides)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    StorePath,
    Pause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let canonical_field =
        canonical_key(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "store_path" | "file" => ConfigOverrideTarget::StorePath,
        "pause" | "pause_after_action" => ConfigOverrideTarget::Pause,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("pause override expects true or false, got '{other}'")),
    }
}
