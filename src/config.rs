use std::{fs::read_to_string, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use colored::Colorize;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::session::{Defaults, DEFAULT_MINUTES, DEFAULT_TASK};

/// Alarm handed to the `finished` hook when none is configured
pub const DEFAULT_ALARM_URL: &str = "https://pomofocus.io/audios/alarms/alarm-digital.mp3";

/// Global configuration values
///
/// Countdown's configuration is stored in a TOML file in the current user's
/// config directory, which is `~/.config/countdown/config.toml` by default.
///
/// A config can be loaded from a file with [`Config::load`].
/// You can also use [`Config::init`] or [`Config::init_default`] to create
/// a default config file if one does not exist at the given path.
///
/// To save a config to the filesystem, use [`Config::save`].
///
/// ## File Format
///
/// The configuration file is written as a TOML file. Every field is
/// optional and falls back to its default.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Directory to find hook executables
    ///
    /// Default is a directory called `hooks` inside the config directory.
    #[serde(default = "default_hooks_directory")]
    pub hooks_directory: PathBuf,
    /// File holding the persisted duration, start time and task
    ///
    /// Default location is the user's state directory,
    /// which is usually `~/.local/state/countdown/state.toml`.
    #[serde(default = "default_state_path")]
    pub state_file_path: PathBuf,
    /// Duration used on the first run, in minutes
    ///
    /// Default is 30.
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    /// Label used when no task has ever been given
    #[serde(default = "default_task")]
    pub default_task: String,
    /// Sound the `finished` hook is asked to play
    #[serde(default = "default_alarm_url")]
    pub alarm_url: String,
    /// Audio file played when a countdown finishes
    ///
    /// Any format `rodio` decodes (MP3, WAV, FLAC, Ogg Vorbis). When unset a
    /// short tone is played instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_file: Option<PathBuf>,
    /// Play the alarm sound when a countdown finishes
    ///
    /// Only has an effect when built with the `sound` feature.
    #[serde(default = "default_sound")]
    pub sound: bool,
    /// Ring the terminal bell when a countdown finishes
    #[serde(default = "default_bell")]
    pub bell: bool,
}

impl Config {
    /// Returns the current config, creating a default config file if one does not exist
    pub fn init(config_path: &Path) -> Result<Self> {
        if let Some(conf) = Config::load(config_path)? {
            Ok(conf)
        } else {
            let conf = Config::default();

            eprintln!(
                "Creating config file at {}",
                config_path.display().to_string().cyan()
            );

            conf.save(config_path)?;

            Ok(conf)
        }
    }

    /// Returns the current config from the default location, and creates the file if one does not exist
    pub fn init_default() -> Result<Self> {
        let path = default_config_path()?;
        Self::init(&path)
    }

    /// Reads a TOML config file
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            let config_str = read_to_string(path)
                .with_context(|| format!("Unable to read config file {}", path.display()))?;

            toml::from_str(&config_str)
                .map(Some)
                .with_context(|| "Failed to parse config from TOML")
        } else {
            Ok(None)
        }
    }

    /// Write this config file to the filesystem
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string(&self)
            .with_context(|| "Unable to format config as TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create config directory {}", parent.display()))?;
        }

        std::fs::write(path, toml)
            .with_context(|| format!("Unable to write config TOML to path {}", path.display()))
    }

    /// Fallback session values
    ///
    /// A configured duration of zero is ignored.
    pub fn defaults(&self) -> Defaults {
        Defaults {
            minutes: if self.default_minutes > 0 {
                self.default_minutes
            } else {
                DEFAULT_MINUTES
            },
            task: self.default_task.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hooks_directory: default_hooks_directory(),
            state_file_path: default_state_path(),
            default_minutes: default_minutes(),
            default_task: default_task(),
            alarm_url: default_alarm_url(),
            alarm_file: None,
            sound: default_sound(),
            bell: default_bell(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "Countdown", "Countdown")
}

/// Get the default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    let conf_path = project_dirs()
        .with_context(|| "Unable to determine XDG directories")?
        .config_dir()
        .join("config.toml");

    Ok(conf_path)
}

fn default_hooks_directory() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("hooks"))
        .unwrap_or_else(|| PathBuf::from("hooks"))
}

fn default_state_path() -> PathBuf {
    project_dirs()
        .map(|dirs| {
            dirs.state_dir()
                .unwrap_or_else(|| dirs.data_local_dir())
                .join("state.toml")
        })
        .unwrap_or_else(|| PathBuf::from("countdown-state.toml"))
}

fn default_minutes() -> u32 {
    DEFAULT_MINUTES
}

fn default_task() -> String {
    DEFAULT_TASK.to_string()
}

fn default_alarm_url() -> String {
    DEFAULT_ALARM_URL.to_string()
}

fn default_sound() -> bool {
    true
}

fn default_bell() -> bool {
    true
}
