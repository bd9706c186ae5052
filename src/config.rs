use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::domain::RatioBounds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Construction-time constants of one diagram instance.
///
/// Percentages are in the 0..=100 domain of the horizontal/vertical
/// scales; lengths are pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub width: f64,
    pub height: f64,
    pub text_padding: f64,
    pub curve_start_pct: f64,
    pub curve_end_pct: f64,
    /// Horizontal offset of the Bézier control points as a fraction of the curve span.
    pub curvature: f64,
    /// Ticks an order needs to cross the diagram. Controls speed.
    pub animation_ticks: u32,
    pub size_domain: [f64; 2],
    pub size_range: [f64; 2],
    pub ratio_bounds: RatioBounds,
    /// Pixels left between the buy and sell bands.
    pub flow_gap: f64,
    pub glyph_height: f64,
    pub block_width_pct: f64,
    pub intake_top_pct: f64,
    pub intake_height_pct: f64,
    /// Vertical share of the canvas split between the two destination blocks.
    pub destination_span_pct: f64,
    pub y_position_range: [u32; 2],
    pub label_font_size: f64,
    pub frame_interval_ms: u64,
    pub max_retained_orders: usize,
    pub seed: Option<u64>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
            text_padding: 20.0,
            curve_start_pct: 20.0,
            curve_end_pct: 80.0,
            curvature: 0.5,
            animation_ticks: 1000,
            size_domain: [1.0, 2500.0],
            size_range: [1.0, 50.0],
            ratio_bounds: RatioBounds::default(),
            flow_gap: 1.0,
            glyph_height: 8.0,
            block_width_pct: 4.0,
            intake_top_pct: 33.0,
            intake_height_pct: 34.0,
            destination_span_pct: 67.0,
            y_position_range: [10, 90],
            label_font_size: 14.0,
            frame_interval_ms: 16,
            max_retained_orders: 20_000,
            seed: None,
        }
    }
}

impl DiagramConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0) || !(self.height > 0.0) {
            return Err(invalid("width/height", "canvas dimensions must be positive"));
        }
        if self.text_padding < 0.0 || self.text_padding * 2.0 >= self.width {
            return Err(invalid("text_padding", "padding must fit inside the canvas"));
        }
        let pct = 0.0..=100.0;
        if !pct.contains(&self.curve_start_pct)
            || !pct.contains(&self.curve_end_pct)
            || self.curve_start_pct >= self.curve_end_pct
        {
            return Err(invalid(
                "curve_start_pct/curve_end_pct",
                format!(
                    "expected 0 <= start < end <= 100, got {} and {}",
                    self.curve_start_pct, self.curve_end_pct
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.curvature) {
            return Err(invalid("curvature", "must be within 0..=1"));
        }
        if self.animation_ticks == 0 {
            return Err(invalid("animation_ticks", "must be at least 1"));
        }
        if !(self.size_domain[0] < self.size_domain[1]) {
            return Err(invalid("size_domain", "domain must be non-empty and increasing"));
        }
        let RatioBounds { min, max } = self.ratio_bounds;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > 0.5 || max < 0.5 {
            return Err(invalid(
                "ratio_bounds",
                format!("expected 0 <= min <= 0.5 <= max <= 1, got [{min}, {max}]"),
            ));
        }
        let [lo, hi] = self.y_position_range;
        if lo > hi || hi > 100 {
            return Err(invalid("y_position_range", "expected lo <= hi <= 100"));
        }
        if !pct.contains(&self.block_width_pct)
            || !pct.contains(&self.intake_top_pct)
            || !pct.contains(&self.destination_span_pct)
            || self.intake_top_pct + self.intake_height_pct > 100.0
        {
            return Err(invalid("block geometry", "block percentages must stay within 0..=100"));
        }
        if self.frame_interval_ms == 0 {
            return Err(invalid("frame_interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}

/// Timing and startup state of the synthetic order stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
    pub min_delay_ms: u64,
    pub delay_spread_ms: u64,
    /// Exponent applied to `1 - U`; larger values push more delays toward the minimum.
    pub delay_skew: f64,
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 50,
            delay_spread_ms: 2000,
            delay_skew: 3.0,
            seed: None,
        }
    }
}

/// On-disk shape read by the host binary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub diagram: DiagramConfig,
    pub stream: StreamConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.diagram.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.diagram.seed = Some(seed);
        self.stream.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DiagramConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"diagram": {"width": 800, "animation_ticks": 10}}"#).unwrap();
        assert_eq!(config.diagram.width, 800.0);
        assert_eq!(config.diagram.animation_ticks, 10);
        assert_eq!(config.diagram.height, 300.0);
        assert!(config.stream.enabled);
        assert_eq!(config.stream.min_delay_ms, 50);
    }

    #[test]
    fn test_rejects_inverted_curve() {
        let config = DiagramConfig {
            curve_start_pct: 80.0,
            curve_end_pct: 20.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "curve_start_pct/curve_end_pct", .. })
        ));
    }

    #[test]
    fn test_rejects_bounds_excluding_neutral() {
        let config = DiagramConfig {
            ratio_bounds: RatioBounds { min: 0.6, max: 0.9 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_ticks() {
        let config = DiagramConfig {
            animation_ticks: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_override() {
        let config = AppConfig::default().with_seed(7);
        assert_eq!(config.diagram.seed, Some(7));
        assert_eq!(config.stream.seed, Some(7));
    }
}
