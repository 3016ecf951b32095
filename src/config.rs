//! Configuration management for gedsort.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default OCR timeout in seconds.
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;

/// OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Tesseract language(s); French documents are the primary target.
    #[serde(default = "default_language")]
    pub language: String,
    /// Per-invocation OCR timeout in seconds.
    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
    /// Let the neural backend (feature ocr-ocrs) compete with tesseract.
    #[serde(default)]
    pub neural_fallback: bool,
}

fn default_language() -> String {
    "fra+eng".to_string()
}

fn default_ocr_timeout() -> u64 {
    DEFAULT_OCR_TIMEOUT_SECS
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            timeout_secs: default_ocr_timeout(),
            neural_fallback: false,
        }
    }
}

impl OcrSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base directory the category folders are created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Classifier model artifact (JSON).
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Analytics database location.
    #[serde(default = "default_analytics_db")]
    pub analytics_db: PathBuf,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gedsort")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("documents_classifies")
}

fn default_model_path() -> PathBuf {
    data_dir().join("model").join("doc_classifier.json")
}

fn default_analytics_db() -> PathBuf {
    data_dir().join("analytics.db")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            model_path: default_model_path(),
            analytics_db: default_analytics_db(),
            ocr: OcrSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or from the default location
    /// when present, or fall back to defaults.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match config_path {
            Some(path) => Some(expand(path)),
            None => Self::default_config_path().filter(|p| p.exists()),
        };

        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("cannot read config {}: {}", path.display(), e)
                })?;
                toml::from_str::<Settings>(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?
            }
            None => Settings::default(),
        };

        settings.output_dir = expand(&settings.output_dir);
        settings.model_path = expand(&settings.model_path);
        settings.analytics_db = expand(&settings.analytics_db);
        Ok(settings)
    }

    /// Default config file location under the user config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gedsort").join("config.toml"))
    }

    /// Write the current settings as a TOML file.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Expand `~` and environment variables in a configured path.
fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from("documents_classifies"));
        assert_eq!(settings.ocr.language, "fra+eng");
        assert_eq!(settings.ocr.timeout_secs, 120);
        assert!(!settings.ocr.neural_fallback);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output_dir = \"/tmp/ged\"\n[ocr]\nlanguage = \"fra\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/ged"));
        assert_eq!(settings.ocr.language, "fra");
        assert_eq!(settings.ocr.timeout_secs, 120);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        assert!(Settings::load(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Settings::default().write_to(&path).unwrap();
        let loaded = Settings::load(Some(&path)).unwrap();
        assert_eq!(loaded.server.host, "127.0.0.1");
    }

    #[test]
    fn test_tilde_expansion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output_dir = \"~/ged_out\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert!(!settings.output_dir.to_string_lossy().starts_with('~'));
    }
}
