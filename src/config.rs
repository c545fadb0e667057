use crate::analysis::ClassifierConfig;
use crate::analysis::deduction_v1::DeductionV1Params;
use crate::store::{Lot, SensorRecord};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SCORING: &str = "binary_v2";
pub const DEFAULT_PENALTY_AMOUNT: f64 = 50.0;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub classifier: Option<ClassifierSection>,
    #[serde(default)]
    pub penalty: Option<PenaltySection>,
    /// Seed data for the in-memory registry; a hosted deployment would load
    /// lots and sensors from its database instead.
    #[serde(default)]
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub sensors: Vec<SensorRecord>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

/// Classification thresholds and scoring selection. Every field is optional;
/// omitted values fall back to the canonical defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierSection {
    pub scoring: Option<String>,
    pub unoccupied_distance_cm: Option<f64>,
    pub unoccupied_tolerance_cm: Option<f64>,
    pub occupied_threshold_cm: Option<f64>,
    pub alignment_threshold_cm: Option<f64>,
    pub mispark_threshold_cm: Option<f64>,
    pub severe_misalign_threshold_cm: Option<f64>,
    /// Parameters for the `deduction_v1` scorer, ignored otherwise.
    pub deduction: Option<DeductionV1Params>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PenaltySection {
    pub amount: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Classifier thresholds with defaults filled in for omitted fields.
    pub fn classifier_config(&self) -> ClassifierConfig {
        let defaults = ClassifierConfig::default();
        let Some(section) = self.classifier.as_ref() else {
            return defaults;
        };
        ClassifierConfig {
            unoccupied_distance_cm: section
                .unoccupied_distance_cm
                .unwrap_or(defaults.unoccupied_distance_cm),
            unoccupied_tolerance_cm: section
                .unoccupied_tolerance_cm
                .unwrap_or(defaults.unoccupied_tolerance_cm),
            occupied_threshold_cm: section
                .occupied_threshold_cm
                .unwrap_or(defaults.occupied_threshold_cm),
            alignment_threshold_cm: section
                .alignment_threshold_cm
                .unwrap_or(defaults.alignment_threshold_cm),
            mispark_threshold_cm: section
                .mispark_threshold_cm
                .unwrap_or(defaults.mispark_threshold_cm),
            severe_misalign_threshold_cm: section
                .severe_misalign_threshold_cm
                .unwrap_or(defaults.severe_misalign_threshold_cm),
        }
    }

    /// Name of the selected scoring strategy (default: `binary_v2`).
    pub fn scoring_name(&self) -> &str {
        self.classifier
            .as_ref()
            .and_then(|s| s.scoring.as_deref())
            .unwrap_or(DEFAULT_SCORING)
    }

    pub fn deduction_params(&self) -> Option<DeductionV1Params> {
        self.classifier.as_ref()?.deduction.clone()
    }

    /// Misparking penalty amount (default: 50.0)
    pub fn penalty_amount(&self) -> f64 {
        self.penalty
            .as_ref()
            .and_then(|s| s.amount)
            .unwrap_or(DEFAULT_PENALTY_AMOUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn default_config_selects_binary_scoring() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        assert_eq!(config.scoring_name(), "binary_v2");
        assert_eq!(config.penalty_amount(), 50.0);
        assert!(!config.lots.is_empty());
        assert!(!config.sensors.is_empty());
        Ok(())
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = temp_dir.join(format!("spotwatch-config-minimal-{unique}.toml"));
        let contents = r#"
[app]
name = "spotwatch"

[logging]
level = "info"
"#;
        fs::write(&path, contents)?;

        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(config.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(config.scoring_name(), DEFAULT_SCORING);
        assert_eq!(config.penalty_amount(), DEFAULT_PENALTY_AMOUNT);
        assert_eq!(
            config.classifier_config(),
            crate::analysis::ClassifierConfig::default()
        );
        assert!(config.lots.is_empty());
        Ok(())
    }

    #[test]
    fn classifier_overrides_merge_onto_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = temp_dir.join(format!("spotwatch-config-thresholds-{unique}.toml"));
        let contents = r#"
[app]
name = "spotwatch"

[logging]
level = "info"

[classifier]
scoring = "deduction_v1"
occupied_threshold_cm = 90.0

[classifier.deduction]
asymmetry_penalty_per_cm = 2.0
free_asymmetry_cm = 5.0
offset_penalty_per_cm = 1.0
ideal_stop_cm = 35.0

[penalty]
amount = 75.0
"#;
        fs::write(&path, contents)?;

        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        let thresholds = config.classifier_config();
        assert_eq!(thresholds.occupied_threshold_cm, 90.0);
        assert_eq!(thresholds.mispark_threshold_cm, 25.0);
        assert_eq!(config.scoring_name(), "deduction_v1");
        assert_eq!(
            config.deduction_params().map(|p| p.ideal_stop_cm),
            Some(35.0)
        );
        assert_eq!(config.penalty_amount(), 75.0);
        Ok(())
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = temp_dir.join(format!("spotwatch-config-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = temp_dir.join(format!("spotwatch-config-invalid-{unique}.toml"));
        fs::write(&path, "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }
}
