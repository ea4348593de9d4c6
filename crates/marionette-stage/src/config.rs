//! Stage runtime configuration.
//!
//! Every field has a default, so a host can deserialize a partial JSON object
//! and only override what it cares about:
//!
//! ```
//! use marionette_stage::config::StageConfig;
//!
//! let config = StageConfig::from_json_str(r#"{ "step_budget_ms": 16 }"#).unwrap();
//! assert_eq!(config.step_budget_ms, 16);
//! assert_eq!(config.initial_divisor, 10.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StageError;

/// Configuration for [`StageRuntime`](crate::runtime::StageRuntime).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Substep divisor used before the controller has adapted.
    pub initial_divisor: f64,
    /// Lower clamp of the divisor.
    pub min_divisor: f64,
    /// Upper clamp of the divisor.
    pub max_divisor: f64,
    /// Time budget for the simulation phase of one frame, in milliseconds.
    /// Within budget the divisor grows by one, over budget it shrinks by one.
    pub step_budget_ms: u64,
    /// Maximum number of loop yields stepped through when an exit script is
    /// forced to completion.
    pub exit_script_step_limit: u32,
    /// Headless mode: no renderer is attached and render is a no-op.
    pub headless: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            initial_divisor: 10.0,
            min_divisor: 1.0,
            max_divisor: 50.0,
            step_budget_ms: 8,
            exit_script_step_limit: 10_000,
            headless: false,
        }
    }
}

impl StageConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`StageError::ConfigParse`] for malformed JSON,
    /// [`StageError::InvalidConfig`] if the parsed values fail
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, StageError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the divisor bounds.
    ///
    /// Bounds must be finite, integral, at least 1, and ordered; the initial
    /// divisor must lie within them.
    pub fn validate(&self) -> Result<(), StageError> {
        let integral = |v: f64| v.is_finite() && v.fract() == 0.0;
        if !integral(self.min_divisor) || !integral(self.max_divisor) {
            return Err(StageError::InvalidConfig(format!(
                "divisor bounds must be finite integers, got [{}, {}]",
                self.min_divisor, self.max_divisor
            )));
        }
        if self.min_divisor < 1.0 || self.min_divisor > self.max_divisor {
            return Err(StageError::InvalidConfig(format!(
                "divisor bounds must satisfy 1 <= min <= max, got [{}, {}]",
                self.min_divisor, self.max_divisor
            )));
        }
        if !integral(self.initial_divisor)
            || self.initial_divisor < self.min_divisor
            || self.initial_divisor > self.max_divisor
        {
            return Err(StageError::InvalidConfig(format!(
                "initial divisor {} must be an integer within [{}, {}]",
                self.initial_divisor, self.min_divisor, self.max_divisor
            )));
        }
        Ok(())
    }

    /// The step budget as a [`Duration`].
    pub fn step_budget(&self) -> Duration {
        Duration::from_millis(self.step_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stage_constants() {
        let config = StageConfig::default();
        assert_eq!(config.initial_divisor, 10.0);
        assert_eq!(config.min_divisor, 1.0);
        assert_eq!(config.max_divisor, 50.0);
        assert_eq!(config.step_budget(), Duration::from_millis(8));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = StageConfig::from_json_str(r#"{ "headless": true }"#).unwrap();
        assert!(config.headless);
        assert_eq!(config.max_divisor, 50.0);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = StageConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, StageError::ConfigParse(_)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let config = StageConfig {
            min_divisor: 20.0,
            max_divisor: 10.0,
            initial_divisor: 15.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn initial_divisor_outside_bounds_is_rejected() {
        let err = StageConfig::from_json_str(r#"{ "initial_divisor": 64.0 }"#).unwrap_err();
        assert!(matches!(err, StageError::InvalidConfig(_)));
    }

    #[test]
    fn fractional_divisor_is_rejected() {
        let config = StageConfig {
            initial_divisor: 2.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
