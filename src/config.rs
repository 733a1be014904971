use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// How to launch the external dissonance core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeCoreConfig {
    /// Executable path, or a bare name looked up on `PATH`.
    pub program: PathBuf,
    /// Arguments placed before the source path and options.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for NativeCoreConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("dissonance-core"),
            args: Vec::new(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub native_core: Option<NativeCoreConfig>,
    /// Where the simulated core writes processed files. Defaults to `<tmp>/dissonance`.
    pub work_dir: Option<PathBuf>,
    /// Delay between simulated processing steps.
    pub simulated_step_ms: u64,
    /// Options handed to the core with every job.
    pub default_options: serde_json::Map<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            native_core: Some(NativeCoreConfig::default()),
            work_dir: None,
            simulated_step_ms: 500,
            default_options: serde_json::Map::new(),
        }
    }
}

impl Config {
    /// Directory: ~/.config/dissonance/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("dissonance");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    pub fn exists() -> bool {
        Self::path().exists()
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load() -> Self {
        let path = Self::path();
        match fs::read_to_string(&path) {
            Ok(data) => Self::from_json(&data),
            Err(_) => Self::default(),
        }
    }

    fn from_json(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config: {e}");
            Self::default()
        })
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = Self::dir();
        fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(), data)?;
        Ok(())
    }

    pub fn step_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.simulated_step_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json(r#"{ "simulated_step_ms": 20 }"#);
        assert_eq!(config.simulated_step_ms, 20);
        assert!(config.work_dir.is_none());
        assert_eq!(
            config.native_core.unwrap().program,
            PathBuf::from("dissonance-core")
        );
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        let config = Config::from_json("not json");
        assert_eq!(config.simulated_step_ms, 500);
        assert!(config.default_options.is_empty());
    }

    #[test]
    fn native_core_can_be_disabled() {
        let config = Config::from_json(
            r#"{ "native_core": null, "default_options": { "gain": 0.5 } }"#,
        );
        assert!(config.native_core.is_none());
        assert_eq!(config.default_options["gain"], 0.5);
    }
}
