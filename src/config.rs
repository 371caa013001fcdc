//! Configuration
//!
//! Typed settings for the engine, the geometry stages and the cut. Parsed
//! from TOML or JSON text; where the text comes from is up to the caller.

use crate::pipeline::JobOptions;
use gerbcut_camtools::validate;
use gerbcut_communication::PlotterConfig;
use gerbcut_core::{CutParameters, Error, Result};
use serde::{Deserialize, Serialize};

/// Complete gerbcut configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GerbcutConfig {
    /// USB chunking, polling and timeouts
    pub transport: PlotterConfig,
    /// Normalizer, merger and sequencing mode
    pub geometry: JobOptions,
    /// Offset, margin, transform and passes
    pub cut: CutParameters,
}

impl GerbcutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::other(format!("Invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| Error::other(format!("Invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        self.validate()?;
        toml::to_string_pretty(self)
            .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))
    }

    pub fn to_json_string(&self) -> Result<String> {
        self.validate()?;
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let transport = &self.transport;
        if transport.chunk_size == 0 {
            return Err(Error::other("Chunk size must be > 0"));
        }
        if transport.poll_interval_ms == 0 {
            return Err(Error::other("Poll interval must be > 0"));
        }
        if transport.poll_timeout_ms == 0 || transport.write_timeout_ms == 0 {
            return Err(Error::other("Transport timeouts must be > 0"));
        }

        let normalizer = &self.geometry.normalizer;
        if !normalizer.chord_tolerance.is_finite() || normalizer.chord_tolerance <= 0.0 {
            return Err(Error::other("Chord tolerance must be > 0"));
        }
        if normalizer.max_arc_segments == 0 {
            return Err(Error::other("Max arc segments must be > 0"));
        }

        let merge = &self.geometry.merge;
        if !merge.min_size.is_finite() || !merge.min_dist.is_finite() {
            return Err(Error::other("Merge thresholds must be finite"));
        }

        validate(&self.cut)?;
        Ok(())
    }

    /// Cut parameters and geometry options, cloned for one job
    pub fn job(&self) -> (JobOptions, CutParameters) {
        (self.geometry.clone(), self.cut.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gerbcut_core::{CutMode, PassSetting, Point, Stage};

    #[test]
    fn test_default_values() {
        let config = GerbcutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cut.offset, Point::new(1.0, 4.5));
        assert_eq!(
            config.cut.passes,
            vec![PassSetting::new(2, 8), PassSetting::new(2, 30)]
        );
        assert_eq!(config.geometry.merge.min_size, 0.014);
        assert_eq!(config.geometry.merge.min_dist, 0.009);
        assert_eq!(config.geometry.mode, CutMode::Enhanced);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GerbcutConfig::from_toml_str(
            r#"
            [transport]
            chunk_size = 512

            [geometry]
            mode = "standard"

            [cut]
            margin = 0.25
            passes = [{ speed = 3, force = 12 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.chunk_size, 512);
        assert_eq!(config.transport.poll_timeout_ms, 500);
        assert_eq!(config.geometry.mode, CutMode::Standard);
        assert_eq!(config.cut.margin, 0.25);
        assert_eq!(config.cut.pass_count(), 1);
        assert_eq!(config.cut.offset, Point::new(1.0, 4.5));
    }

    #[test]
    fn test_serialized_config_parses_back() {
        let mut config = GerbcutConfig::default();
        config.transport.chunk_size = 1024;
        config.cut.cut_border = true;

        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[transport]"));
        let parsed = GerbcutConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.transport, config.transport);
        assert_eq!(parsed.cut.passes, config.cut.passes);
        assert!(parsed.cut.cut_border);

        let json = config.to_json_string().unwrap();
        let parsed = GerbcutConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.geometry.mode, config.geometry.mode);
        assert_eq!(parsed.transport.chunk_size, 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GerbcutConfig::from_toml_str("[transport]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("Chunk size"));

        let err = GerbcutConfig::from_json_str(r#"{"cut": {"passes": []}}"#).unwrap_err();
        assert_eq!(err.stage(), Stage::Encoding);

        assert!(GerbcutConfig::from_toml_str("transport = 3").is_err());
    }
}
