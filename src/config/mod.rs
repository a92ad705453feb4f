//! Output configuration overrides
//!
//! Parsing happens outside the engine; this is the applied form. The
//! desktop consults the set when an output appears: disabled outputs are
//! not admitted, and position/scale/transform/mode overrides are applied
//! before the first arrange.

use std::collections::HashMap;

use crate::compositor::output::OutputTransform;

/// Per-output override, keyed by connector name
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Connector name ("DP-1")
    pub name: String,
    /// False keeps the output from being admitted
    pub enabled: bool,
    /// Layout position override
    pub position: Option<(i32, i32)>,
    /// Scale override
    pub scale: Option<f64>,
    /// Transform override
    pub transform: Option<OutputTransform>,
    /// Preferred mode override: width, height, refresh in mHz (0 = any)
    pub mode: Option<(i32, i32, i32)>,
}

impl OutputConfig {
    /// An enabled config with no overrides
    pub fn new(name: String) -> Self {
        Self {
            name,
            enabled: true,
            position: None,
            scale: None,
            transform: None,
            mode: None,
        }
    }

    /// Reject nonsensical overrides before they reach an output
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scale) = self.scale {
            if !(scale > 0.0 && scale.is_finite()) {
                return Err(ConfigError::InvalidScale(self.name.clone(), scale));
            }
        }
        if let Some((w, h, _)) = self.mode {
            if w <= 0 || h <= 0 {
                return Err(ConfigError::InvalidMode(self.name.clone()));
            }
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("output `{0}`: invalid scale {1}")]
    InvalidScale(String, f64),
    #[error("output `{0}`: invalid mode")]
    InvalidMode(String),
}

/// All output overrides, keyed by connector name
#[derive(Debug, Default)]
pub struct ConfigSet {
    outputs: HashMap<String, OutputConfig>,
}

impl ConfigSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an override
    pub fn insert(&mut self, config: OutputConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.outputs.insert(config.name.clone(), config);
        Ok(())
    }

    /// Look up the override for a connector
    pub fn output(&self, name: &str) -> Option<&OutputConfig> {
        self.outputs.get(name)
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// True if no overrides exist
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = OutputConfig::new("DP-1".into());
        assert!(config.validate().is_ok());

        config.scale = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScale(_, _))
        ));

        config.scale = Some(2.0);
        config.mode = Some((0, 1080, 0));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMode(_))));
    }

    #[test]
    fn test_set_lookup() {
        let mut set = ConfigSet::new();
        let mut config = OutputConfig::new("DP-1".into());
        config.position = Some((1920, 0));
        set.insert(config).unwrap();

        assert!(set.output("DP-1").is_some());
        assert!(set.output("HDMI-1").is_none());
        assert_eq!(set.len(), 1);
    }
}
