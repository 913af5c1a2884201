use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "LoadConfig::default_drawing_path")]
    pub drawing_path: PathBuf,
    #[serde(default = "LoadConfig::default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl LoadConfig {
    fn default_drawing_path() -> PathBuf {
        PathBuf::from("assets/drawings/heavy.json")
    }

    const fn default_ready_timeout_ms() -> u64 {
        3000
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            drawing_path: Self::default_drawing_path(),
            ready_timeout_ms: Self::default_ready_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "NetworkConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "NetworkConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "NetworkConfig::default_fallback")]
    pub fallback: String,
}

impl NetworkConfig {
    fn default_endpoint() -> String {
        "https://ipv4.icanhazip.com".to_string()
    }

    const fn default_request_timeout_ms() -> u64 {
        5000
    }

    fn default_fallback() -> String {
        "192.168.0.1".to_string()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            fallback: Self::default_fallback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StampConfig {
    #[serde(default = "StampConfig::default_text_height")]
    pub text_height: f64,
    #[serde(default = "StampConfig::default_rotation_deg")]
    pub rotation_deg: f64,
    #[serde(default = "StampConfig::default_color_index")]
    pub color_index: u16,
    #[serde(default = "StampConfig::default_layer")]
    pub layer: String,
}

impl StampConfig {
    const fn default_text_height() -> f64 {
        15.0
    }

    const fn default_rotation_deg() -> f64 {
        90.5
    }

    const fn default_color_index() -> u16 {
        1
    }

    fn default_layer() -> String {
        "0".to_string()
    }
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            text_height: Self::default_text_height(),
            rotation_deg: Self::default_rotation_deg(),
            color_index: Self::default_color_index(),
            layer: Self::default_layer(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub stamp: StampConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub drawing_path: Option<PathBuf>,
    pub ready_timeout_ms: Option<u64>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(path) = &overrides.drawing_path {
            self.load.drawing_path = path.clone();
        }
        if let Some(timeout) = overrides.ready_timeout_ms {
            self.load.ready_timeout_ms = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.load.ready_timeout_ms, 3000);
        assert_eq!(cfg.network.fallback, "192.168.0.1");
        assert_eq!(cfg.stamp.rotation_deg, 90.5);
        assert_eq!(cfg.stamp.text_height, 15.0);
    }

    #[test]
    fn partial_config_files_fill_missing_sections() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"load": {"ready_timeout_ms": 500}}"#).expect("parse");
        assert_eq!(cfg.load.ready_timeout_ms, 500);
        assert_eq!(cfg.load.drawing_path, PathBuf::from("assets/drawings/heavy.json"));
        assert_eq!(cfg.network.endpoint, "https://ipv4.icanhazip.com");
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = AppConfig::default();
        let overrides = AppConfigOverrides {
            drawing_path: Some(PathBuf::from("other.json")),
            ready_timeout_ms: Some(100),
        };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.load.drawing_path, PathBuf::from("other.json"));
        assert_eq!(cfg.load.ready_timeout_ms, 100);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let cfg = AppConfig::load_or_default("does/not/exist.json");
        assert_eq!(cfg.load.ready_timeout_ms, 3000);
    }
}
