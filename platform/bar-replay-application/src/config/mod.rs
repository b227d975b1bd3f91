use bar_replay_domain::entities::annotation_board::{
    AnnotationSettings, DEFAULT_EXTENSION_FACTOR, DEFAULT_HIT_THRESHOLD,
};
use bar_replay_domain::services::chart::{ChartStyle, DEFAULT_MARKER_LABEL_OFFSET};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CSV_PATH: &str = "AAPL_data.csv";
const DEFAULT_SYMBOL: &str = "AAPL";
const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
const DEFAULT_LOG_LINES: usize = 5000;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub annotations: AnnotationsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnnotationsConfig {
    #[serde(default = "default_hit_threshold")]
    pub hit_threshold: f64,
    #[serde(default = "default_extension_factor")]
    pub trend_extension_factor: f64,
    #[serde(default = "default_marker_label_offset")]
    pub marker_label_offset: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UiConfig {
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            symbol: default_symbol(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            hit_threshold: default_hit_threshold(),
            trend_extension_factor: default_extension_factor(),
            marker_label_offset: default_marker_label_offset(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            log_lines: default_log_lines(),
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from(DEFAULT_CSV_PATH)
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_string()
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_hit_threshold() -> f64 {
    DEFAULT_HIT_THRESHOLD
}

fn default_extension_factor() -> f64 {
    DEFAULT_EXTENSION_FACTOR
}

fn default_marker_label_offset() -> f64 {
    DEFAULT_MARKER_LABEL_OFFSET
}

fn default_log_lines() -> usize {
    DEFAULT_LOG_LINES
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.replay.tick_interval_ms)
    }

    pub fn annotation_settings(&self) -> AnnotationSettings {
        AnnotationSettings {
            hit_threshold: self.annotations.hit_threshold,
            extension_factor: self.annotations.trend_extension_factor,
        }
    }

    pub fn chart_style(&self) -> ChartStyle {
        ChartStyle {
            marker_label_offset: self.annotations.marker_label_offset,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.replay.tick_interval_ms == 0 {
            return Err("replay.tick_interval_ms must be > 0".to_string());
        }
        let threshold = self.annotations.hit_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(format!(
                "annotations.hit_threshold must be finite and > 0 (got {threshold})"
            ));
        }
        if !self.annotations.trend_extension_factor.is_finite() {
            return Err("annotations.trend_extension_factor must be finite".to_string());
        }
        if !self.annotations.marker_label_offset.is_finite() {
            return Err("annotations.marker_label_offset must be finite".to_string());
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    config
        .validate()
        .map_err(|err| format!("invalid config {}: {err}", path.display()))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}
