use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    GridPosition,
    grid::GridBounds,
    planner::StepPolicy,
    scoring::ScoringPolicy,
    summary::{DEFAULT_REPORTED_TOTAL, SummaryGenerator},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid config: {0}")]
    Parse(String),
    #[error("Grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },
    #[error("Start position {start} is outside the {width}x{height} grid")]
    StartOffGrid {
        start: GridPosition,
        width: usize,
        height: usize,
    },
}

/// Settings for one simulation session.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// width = 20
/// height = 20
/// start = { x = 0, y = 19 }
/// scoring = "linear_penalty"
/// stepping = "fixed_priority"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub width: usize,
    pub height: usize,
    pub start: GridPosition,
    pub scoring: ScoringPolicy,
    pub stepping: StepPolicy,
    pub summary_latency_ms: u64,
    /// No timeout when unset.
    pub summary_timeout_ms: Option<u64>,
    /// Reported as `total_resources` in every summary, regardless of the
    /// catalog size.
    pub reported_total_resources: usize,
    /// Seed for cosmetic randomness. Unset means OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            start: GridPosition::new(0, 9),
            scoring: ScoringPolicy::default(),
            stepping: StepPolicy::default(),
            summary_latency_ms: 1500,
            summary_timeout_ms: None,
            reported_total_resources: DEFAULT_REPORTED_TOTAL,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if !self.bounds().contains(self.start) {
            return Err(ConfigError::StartOffGrid {
                start: self.start,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.width, self.height)
    }

    pub fn summary_generator(&self) -> SummaryGenerator {
        SummaryGenerator::new(
            Duration::from_millis(self.summary_latency_ms),
            self.reported_total_resources,
        )
    }

    pub fn summary_timeout(&self) -> Option<Duration> {
        self.summary_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn reads_policies_and_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            width = 20
            height = 20
            start = { x = 0, y = 19 }
            scoring = "linear_penalty"
            stepping = "fixed_priority"
            summary_timeout_ms = 3000
            seed = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.bounds(), GridBounds::new(20, 20));
        assert_eq!(config.start, GridPosition::new(0, 19));
        assert_eq!(config.scoring, ScoringPolicy::LinearPenalty);
        assert_eq!(config.stepping, StepPolicy::FixedPriority);
        assert_eq!(config.summary_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.summary_latency_ms, 1500);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("width = 0"),
            Err(ConfigError::EmptyGrid { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("start = { x = 10, y = 0 }"),
            Err(ConfigError::StartOffGrid { .. })
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("scoring = \"greedy\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
