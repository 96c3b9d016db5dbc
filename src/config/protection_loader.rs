use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::mitigation::config::ProtectionConfig;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest file not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
    #[error("Unknown protection mode: {0}")]
    UnknownMode(String),
    #[error("Preset mode cannot be combined with fine-grained options")]
    ConflictingOptions,
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

/// On-disk protection settings. Either a preset `mode` or fine-grained
/// options — naming both is rejected rather than merged.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProtectionManifest {
    pub mode: Option<String>,
    pub enabled: Option<bool>,
    pub show_highlight: Option<bool>,
    pub enable_copy_ui: Option<bool>,
    pub highlight_color: Option<String>,
    pub noise_budget_ms: Option<u64>,
    /// Optional telemetry collector; wiring it up is the binary's job.
    pub report_endpoint: Option<String>,
}

pub fn load_protection_manifest(path: &str) -> Result<ProtectionManifest, ManifestError> {
    if !Path::new(path).exists() {
        return Err(ManifestError::FileNotFound(path.to_string()));
    }

    let raw_json = fs::read_to_string(path)?;
    serde_json::from_str(&raw_json).map_err(|e| ManifestError::ParseError(e.to_string()))
}

impl ProtectionManifest {
    fn has_overrides(&self) -> bool {
        self.enabled.is_some()
            || self.show_highlight.is_some()
            || self.enable_copy_ui.is_some()
            || self.highlight_color.is_some()
            || self.noise_budget_ms.is_some()
    }

    pub fn into_config(self) -> Result<ProtectionConfig, ManifestError> {
        if let Some(ref mode) = self.mode {
            if self.has_overrides() {
                return Err(ManifestError::ConflictingOptions);
            }
            return match mode.as_str() {
                "strict" => Ok(ProtectionConfig::strict()),
                "balanced" => Ok(ProtectionConfig::balanced()),
                "permissive" => Ok(ProtectionConfig::permissive()),
                other => Err(ManifestError::UnknownMode(other.to_string())),
            };
        }

        let mut config = ProtectionConfig::default();
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(show_highlight) = self.show_highlight {
            config.show_highlight = show_highlight;
        }
        if let Some(enable_copy_ui) = self.enable_copy_ui {
            config.enable_copy_ui = enable_copy_ui;
        }
        if let Some(color) = self.highlight_color {
            config.highlight_color = color;
        }
        if let Some(budget) = self.noise_budget_ms {
            config.noise_budget_ms = budget;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn manifest_from(json: &str) -> Result<ProtectionManifest, ManifestError> {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", json).unwrap();
        load_protection_manifest(temp_file.path().to_str().unwrap())
    }

    #[test]
    fn preset_mode_loads() {
        let manifest = manifest_from(r#"{"mode": "strict"}"#).unwrap();
        let config = manifest.into_config().unwrap();
        assert_eq!(config.noise_budget_ms, 500);
        assert!(config.show_highlight && config.enable_copy_ui);
    }

    #[test]
    fn fine_grained_overrides_start_from_balanced() {
        let manifest =
            manifest_from(r#"{"noise_budget_ms": 150, "enable_copy_ui": false}"#).unwrap();
        let config = manifest.into_config().unwrap();
        assert_eq!(config.noise_budget_ms, 150);
        assert!(!config.enable_copy_ui);
        assert!(config.show_highlight, "untouched options keep defaults");
    }

    #[test]
    fn mode_and_overrides_conflict() {
        let manifest =
            manifest_from(r#"{"mode": "balanced", "noise_budget_ms": 10}"#).unwrap();
        assert!(matches!(
            manifest.into_config(),
            Err(ManifestError::ConflictingOptions)
        ));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let manifest = manifest_from(r#"{"mode": "paranoid"}"#).unwrap();
        assert!(matches!(
            manifest.into_config(),
            Err(ManifestError::UnknownMode(_))
        ));
    }

    #[test]
    fn report_endpoint_survives_loading() {
        let manifest = manifest_from(
            r#"{"mode": "permissive", "report_endpoint": "https://collector.internal/events"}"#,
        )
        .unwrap();
        assert_eq!(
            manifest.report_endpoint.as_deref(),
            Some("https://collector.internal/events")
        );
        assert!(manifest.into_config().is_ok());
    }

    #[test]
    fn missing_file() {
        let result = load_protection_manifest("non_existent_manifest.json");
        assert!(matches!(result, Err(ManifestError::FileNotFound(_))));
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            manifest_from("INVALID JSON"),
            Err(ManifestError::ParseError(_))
        ));
    }
}
