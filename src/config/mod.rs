pub mod store;

pub use store::{MemoryPreferenceStore, PreferenceStore, PreferencesError, YamlPreferenceStore};

use crate::models::{Playlist, SignageSettings};
use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables that override `signage.yaml`
pub const ENV_PREFIX: &str = "SIGNAGE";

/// Configuration manager for the player's data directory.
///
/// Manages:
/// - Settings (`signage.yaml`): static player configuration, layered with
///   `SIGNAGE_*` environment variables
/// - Preferences (`preferences.yaml`): the persisted autoplay / interval pair
/// - Playlists: YAML files named on the command line
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    preferences_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir`, creating it if missing.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("signage.yaml"),
            preferences_path: config_dir.join("preferences.yaml"),
            config_dir,
        })
    }

    /// Load settings from `signage.yaml` (optional) and the environment.
    ///
    /// Environment variables win over the file; missing keys take defaults.
    pub fn load_settings(&self) -> Result<SignageSettings> {
        self.load_settings_from(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_settings_from(&self, environment: Environment) -> Result<SignageSettings> {
        if !self.settings_path.exists() {
            tracing::debug!("No settings file at {}, using defaults", self.settings_path);
        }

        let layered = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: SignageSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: interval={}ms, stall_timeout={}s, alternate_screen={}",
            settings.default_interval_ms,
            settings.video_stall_timeout_secs,
            settings.alternate_screen
        );
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &SignageSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Open the on-disk preference store
    pub fn preference_store(&self) -> Result<YamlPreferenceStore> {
        YamlPreferenceStore::open(&self.preferences_path)
            .with_context(|| format!("Failed to open preferences: {}", self.preferences_path))
    }

    /// Parse a playlist file. Relative paths resolve against the data directory
    /// when they do not exist as given.
    pub fn load_playlist<P: AsRef<Utf8Path>>(&self, path: P) -> Result<Playlist> {
        let path = path.as_ref();
        let resolved = if path.is_relative() && !path.exists() {
            self.config_dir.join(path)
        } else {
            path.to_path_buf()
        };

        let file_contents = fs::read_to_string(&resolved)
            .with_context(|| format!("Failed to read playlist: {}", resolved))?;

        let playlist: Playlist = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse playlist: {}", resolved))?;

        tracing::info!("Loaded playlist {} ({} entries)", resolved, playlist.len());
        Ok(playlist)
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    pub fn preferences_path(&self) -> &Utf8Path {
        &self.preferences_path
    }
}
