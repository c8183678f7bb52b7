//! masonry.toml configuration parser.
//!
//! ```toml
//! [layout]
//! columns = 2
//! gap = 16.0
//! strategy = "balanced"
//! balance_threshold = 0.05
//!
//! [[layout.breakpoints]]
//! min_width = 600.0
//! columns = 2
//!
//! [timing]
//! debounce_ms = 500
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MasonryError, MasonryResult};
use crate::types::{Breakpoint, Strategy};

/// Per-render layout configuration. A new value fully supersedes the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column count when no breakpoint applies.
    pub columns: usize,
    pub gap: f64,
    pub strategy: Strategy,
    /// Acceptable `(max - min) / max` spread for the balanced strategy.
    pub balance_threshold: f64,
    pub breakpoints: Vec<Breakpoint>,
    pub smooth_transitions: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            gap: 16.0,
            strategy: Strategy::Count,
            balance_threshold: 0.05,
            breakpoints: Vec::new(),
            smooth_transitions: false,
        }
    }
}

impl LayoutConfig {
    pub fn with_columns(columns: usize) -> Self {
        Self { columns, ..Self::default() }
    }

    pub fn balanced(columns: usize) -> Self {
        Self {
            columns,
            strategy: Strategy::Balanced,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MasonryResult<()> {
        if self.columns == 0 {
            return Err(MasonryError::InvalidConfig(
                "columns must be at least 1".to_string(),
            ));
        }
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(MasonryError::InvalidConfig(format!(
                "gap must be a non-negative number, got {}",
                self.gap
            )));
        }
        if !(0.0..=1.0).contains(&self.balance_threshold) {
            return Err(MasonryError::InvalidConfig(format!(
                "balance_threshold must be within [0, 1], got {}",
                self.balance_threshold
            )));
        }
        for bp in &self.breakpoints {
            if bp.columns == 0 {
                return Err(MasonryError::InvalidConfig(format!(
                    "breakpoint at {} has zero columns",
                    bp.min_width
                )));
            }
            if !bp.min_width.is_finite() || bp.min_width < 0.0 {
                return Err(MasonryError::InvalidConfig(format!(
                    "breakpoint width must be a non-negative number, got {}",
                    bp.min_width
                )));
            }
        }
        Ok(())
    }
}

/// Scheduler timing and filter constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet window before a redistribution runs.
    pub debounce_ms: u64,
    /// Quiescence before observation is released.
    pub stability_ms: u64,
    /// Delay after the last image completes.
    pub image_settle_ms: u64,
    /// Redistribution passes allowed per item-set generation.
    pub max_passes: u32,
    /// Height delta that counts as a real change.
    pub significance_px: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            stability_ms: 2000,
            image_settle_ms: 1000,
            max_passes: 10,
            significance_px: 10.0,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stability(&self) -> Duration {
        Duration::from_millis(self.stability_ms)
    }

    pub fn image_settle(&self) -> Duration {
        Duration::from_millis(self.image_settle_ms)
    }
}

/// The `masonry.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasonryConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl MasonryConfig {
    pub fn from_file(path: &Path) -> MasonryResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> MasonryResult<Self> {
        let config: MasonryConfig = toml::from_str(content)?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> MasonryResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.gap, 16.0);
        assert_eq!(layout.strategy, Strategy::Count);
        assert_eq!(layout.balance_threshold, 0.05);
        assert!(!layout.smooth_transitions);

        let timing = TimingConfig::default();
        assert_eq!(timing.debounce(), Duration::from_millis(500));
        assert_eq!(timing.stability(), Duration::from_millis(2000));
        assert_eq!(timing.image_settle(), Duration::from_millis(1000));
        assert_eq!(timing.max_passes, 10);
    }

    #[test]
    fn parse_minimal() {
        let config = MasonryConfig::parse("").unwrap();
        assert_eq!(config, MasonryConfig::default());
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
[layout]
columns = 2
gap = 24.0
strategy = "balanced"
balance_threshold = 0.0
smooth_transitions = true

[[layout.breakpoints]]
min_width = 600.0
columns = 2

[[layout.breakpoints]]
min_width = 1000.0
columns = 4

[timing]
debounce_ms = 250
"#;
        let config = MasonryConfig::parse(toml_str).unwrap();
        assert_eq!(config.layout.columns, 2);
        assert_eq!(config.layout.strategy, Strategy::Balanced);
        assert_eq!(config.layout.balance_threshold, 0.0);
        assert_eq!(config.layout.breakpoints[1], Breakpoint::new(1000.0, 4));
        assert_eq!(config.timing.debounce_ms, 250);
        assert_eq!(config.timing.stability_ms, 2000);
    }

    #[test]
    fn rejects_zero_columns() {
        let err = MasonryConfig::parse("[layout]\ncolumns = 0\n").unwrap_err();
        assert!(matches!(err, MasonryError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let mut layout = LayoutConfig::default();
        layout.balance_threshold = 1.5;
        assert!(layout.validate().is_err());
        layout.balance_threshold = -0.1;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn rejects_negative_gap_and_bad_breakpoints() {
        let mut layout = LayoutConfig::default();
        layout.gap = -1.0;
        assert!(layout.validate().is_err());

        let mut layout = LayoutConfig::default();
        layout.breakpoints.push(Breakpoint::new(600.0, 0));
        assert!(layout.validate().is_err());
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let err = MasonryConfig::parse("[layout]\nstrategy = \"random\"\n").unwrap_err();
        assert!(matches!(err, MasonryError::Parse(_)));
    }

    #[test]
    fn toml_round_trip_preserves_breakpoints() {
        let mut config = MasonryConfig::default();
        config.layout.breakpoints = vec![Breakpoint::new(300.0, 1), Breakpoint::new(900.0, 3)];
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("min_width"));
        assert_eq!(MasonryConfig::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("masonry.toml");
        std::fs::write(&path, "[layout]\ncolumns = 4\n").unwrap();
        let config = MasonryConfig::from_file(&path).unwrap();
        assert_eq!(config.layout.columns, 4);

        let missing = MasonryConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(MasonryError::Io(_))));
    }
}
