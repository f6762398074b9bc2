//! Startup settings: where the task file lives, how the menu is coloured and
//! whether it pauses after each action.
//!
//! Sources, strongest first: command-line overrides, `TASKLIST_STORE_PATH`
//! (store path only), the JSON config file, built-in defaults. A broken config
//! file never stops the program; it is reported as a warning and ignored.

use crate::error::AppError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV_VAR: &str = "TASKLIST_CONFIG_PATH";
pub const STORE_ENV_VAR: &str = "TASKLIST_STORE_PATH";
pub const DEFAULT_STORE_FILE: &str = "my_tasks.txt";

/// Lower-cases ASCII words and joins them with `_`, so `Dark-Mode`,
/// `dark mode` and `DARK_MODE` all become `dark_mode`.
pub fn canonical_key(raw: &str) -> Option<String> {
    let words: Vec<String> = raw
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    /// A blank name means the plain theme; an unknown name is `None`.
    pub fn from_name(raw: &str) -> Option<Self> {
        let Some(key) = canonical_key(raw) else {
            return Some(Self::Plain);
        };
        match key.as_str() {
            "plain" | "default" | "light" | "vanilla" => Some(Self::Plain),
            "noir" | "dark" | "dark_mode" | "darkmode" => Some(Self::Noir),
            "solarized" => Some(Self::Solarized),
            _ => None,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Plain => Palette::default(),
            Self::Noir => Palette {
                heading: "\x1b[38;5;208m",
                detail: "\x1b[38;5;250m",
            },
            Self::Solarized => Palette {
                heading: "\x1b[38;5;108m",
                detail: "\x1b[38;5;250m",
            },
        }
    }
}

/// ANSI colours for menu headings and task details. Empty codes mean no
/// escape sequences are emitted at all.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    heading: &'static str,
    detail: &'static str,
}

impl Palette {
    pub fn heading(&self, text: &str) -> String {
        paint(self.heading, text)
    }

    pub fn detail(&self, text: &str) -> String {
        paint(self.detail, text)
    }
}

fn paint(code: &str, text: &str) -> String {
    if code.is_empty() {
        text.to_string()
    } else {
        format!("{code}{text}\x1b[0m")
    }
}

/// Fully resolved settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store_path: PathBuf,
    pub theme: Theme,
    pub pause_after_action: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            theme: Theme::Plain,
            pause_after_action: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub store_path: Option<PathBuf>,
    pub theme: Option<String>,
    pub pause_after_action: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SettingsLoad {
    pub settings: Settings,
    /// Problem with the config file that was worked around.
    pub warning: Option<AppError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    store_path: Option<PathBuf>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    pause_after_action: Option<bool>,
}

/// Location of the config file: `TASKLIST_CONFIG_PATH`, else
/// `<config dir>/tasklist/config.json`.
pub fn config_file_path() -> Option<PathBuf> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
        _ => dirs::config_dir().map(|dir| dir.join("tasklist").join("config.json")),
    }
}

/// Resolves settings from the environment. Fails only when an override is
/// itself invalid.
pub fn load_settings(overrides: &SettingsOverrides) -> Result<SettingsLoad, AppError> {
    let store_from_env = std::env::var(STORE_ENV_VAR).ok();
    resolve_settings(
        config_file_path().as_deref(),
        store_from_env.as_deref(),
        overrides,
    )
}

fn resolve_settings(
    config_file: Option<&Path>,
    store_from_env: Option<&str>,
    overrides: &SettingsOverrides,
) -> Result<SettingsLoad, AppError> {
    let override_theme = match overrides.theme.as_deref() {
        Some(name) => Some(
            Theme::from_name(name)
                .ok_or_else(|| AppError::invalid_input(format!("unknown theme '{name}'")))?,
        ),
        None => None,
    };

    let (file, mut warning) = match config_file {
        Some(path) => match read_config_file(path) {
            Ok(file) => (file, None),
            Err(err) => (ConfigFile::default(), Some(err)),
        },
        None => (ConfigFile::default(), None),
    };

    let file_theme = match file.theme.as_deref() {
        Some(name) => Theme::from_name(name).or_else(|| {
            warning.get_or_insert_with(|| {
                AppError::invalid_data(format!("unknown theme '{name}' in config file"))
            });
            None
        }),
        None => None,
    };

    let env_store = store_from_env
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from);
    let defaults = Settings::default();

    Ok(SettingsLoad {
        settings: Settings {
            store_path: overrides
                .store_path
                .clone()
                .or(env_store)
                .or(file.store_path)
                .unwrap_or(defaults.store_path),
            theme: override_theme.or(file_theme).unwrap_or(defaults.theme),
            pause_after_action: overrides
                .pause_after_action
                .or(file.pause_after_action)
                .unwrap_or(defaults.pause_after_action),
        },
        warning,
    })
}

fn read_config_file(path: &Path) -> Result<ConfigFile, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ConfigFile::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid config {}: {}", path.display(), err))
    })
}
