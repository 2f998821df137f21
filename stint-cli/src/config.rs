use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use stint_core::{adapters::outbound::memory::BackendPolicy, EngineSettings, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Workspace the saved timer belongs to. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    /// User id sent along with created records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub dev_backend: DevBackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub discrepancy_tolerance_hours: f64,
    pub tick_interval_ms: u64,
    pub match_on_stop: bool,
    pub snapshot_key: String,
}

/// Duration policy of the simulated backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevBackendConfig {
    pub minimum_minutes: u32,
    pub rounding_minutes: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: None,
            owner_id: None,
            log_level: default_log_level(),
            engine: EngineConfig::default(),
            dev_backend: DevBackendConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = EngineSettings::default();
        Self {
            discrepancy_tolerance_hours: defaults.discrepancy_tolerance_hours,
            tick_interval_ms: defaults.tick_interval.as_millis() as u64,
            match_on_stop: defaults.match_on_stop,
            snapshot_key: defaults.snapshot_key,
        }
    }
}

impl Default for DevBackendConfig {
    fn default() -> Self {
        Self {
            minimum_minutes: 1,
            rounding_minutes: 0,
        }
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("stint")
            .join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        Ok(dirs::data_dir()
            .context("Cannot determine data directory")?
            .join("stint"))
    }

    /// Load settings: defaults, then the config file if present, then
    /// `STINT_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("STINT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        settings
            .try_deserialize::<Settings>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Write the default config to `path` unless a file already exists.
    /// Returns whether a file was created.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(true)
    }

    pub fn workspace(&self) -> Result<PathBuf> {
        match &self.workspace {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("Cannot determine current directory"),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            discrepancy_tolerance_hours: self.engine.discrepancy_tolerance_hours,
            tick_interval: Duration::from_millis(self.engine.tick_interval_ms),
            match_on_stop: self.engine.match_on_stop,
            snapshot_key: self.engine.snapshot_key.clone(),
            owner_id: self.owner_id.map(UserId::new),
        }
    }

    pub fn backend_policy(&self) -> BackendPolicy {
        BackendPolicy {
            minimum_minutes: self.dev_backend.minimum_minutes,
            rounding_minutes: self.dev_backend.rounding_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.engine_settings(), EngineSettings::default());
        assert_eq!(settings.backend_policy().minimum_minutes, 1);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
owner_id = 12
workspace = "/srv/project"

[engine]
discrepancy_tolerance_hours = 0.25
match_on_stop = true

[dev_backend]
rounding_minutes = 15
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        let engine = settings.engine_settings();

        assert_eq!(engine.owner_id, Some(UserId::new(12)));
        assert_eq!(engine.discrepancy_tolerance_hours, 0.25);
        assert!(engine.match_on_stop);
        assert_eq!(engine.tick_interval, Duration::from_secs(1));
        assert_eq!(settings.workspace().unwrap(), PathBuf::from("/srv/project"));
        assert_eq!(settings.backend_policy().rounding_minutes, 15);
        assert_eq!(settings.backend_policy().minimum_minutes, 1);
    }

    #[test]
    fn default_file_is_written_once_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Settings::write_default(&path).unwrap());
        assert!(!Settings::write_default(&path).unwrap());

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.engine.snapshot_key, "stint.timer");
    }
}
