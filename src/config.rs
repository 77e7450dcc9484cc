//! Map configuration from map_config.json
//!
//! Every constant the pipeline uses (threshold, offset coordinate, file names,
//! map styling) is defined in map_config.json, which is embedded at compile time.
//! There are no hardcoded fallbacks in this code; the only runtime setting is the
//! project root directory, resolved into [`ProjectPaths`].

use crate::error::{FocalMapError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// map_config.json embedded at compile time
const MAP_CONFIG_JSON: &str = include_str!("../map_config.json");

/// Environment variable naming the project root when `--dir` is not given
pub const PROJECT_DIR_ENV: &str = "FOCAL_MECHANISM_DIR";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub catalog: CatalogConfig,
    pub legend: LegendStyle,
    pub map: MainMapStyle,
    pub inset: InsetStyle,
    pub output: OutputConfig,
}

/// Catalog partitioning and file naming
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Events at or above this magnitude are offset and labelled
    pub magnitude_threshold: f64,
    pub offset_longitude: f64,
    pub offset_latitude: f64,
    pub input_file: String,
    pub cleaned_file: String,
    /// `{threshold}` is replaced with the magnitude threshold
    pub less_than_file: String,
    pub greater_or_equal_file: String,
}

/// Legend file layout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendStyle {
    pub file: String,
    pub header: String,
    pub symbol_offset: String,
    pub symbol_fill: String,
    pub symbol_pen: String,
    pub label_offset: String,
    /// Gap after the first entry; each following gap is the square root of the previous
    pub initial_gap: f64,
    pub position: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainMapStyle {
    /// [min lon, max lon, min lat, max lat]
    pub region: [f64; 4],
    pub projection: String,
    pub frame: Vec<String>,
    pub map_scale: String,
    pub grid: String,
    pub grid_cmap: String,
    pub meca_convention: String,
    pub meca_scale: String,
    pub meca_offset: String,
    pub depth_colors: String,
    pub colorbar_frame: String,
    /// GMT default settings applied before drawing, as (key, value) pairs
    pub gmt_defaults: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsetStyle {
    pub region: [f64; 4],
    pub projection: String,
    pub borders: Vec<String>,
    pub land: String,
    pub shorelines: String,
    pub water: String,
    pub pen: String,
    pub xshift: String,
    pub yshift: String,
    pub style: String,
    pub frame: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub data_dir: String,
    pub results_dir: String,
    pub name: String,
    pub format: String,
}

impl MapConfig {
    /// Parse the configuration embedded from map_config.json
    pub fn embedded() -> Result<Self> {
        Self::from_json(MAP_CONFIG_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.catalog.magnitude_threshold.is_finite() {
            return Err(FocalMapError::Config(
                "magnitudeThreshold must be a finite number".to_string(),
            ));
        }
        let [min_lon, max_lon, min_lat, max_lat] = self.map.region;
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(FocalMapError::Config(format!(
                "map region {:?} is empty",
                self.map.region
            )));
        }
        if self.legend.initial_gap <= 0.0 {
            return Err(FocalMapError::Config(
                "legend initialGap must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Threshold as it appears in file names: `7` rather than `7.0`
    pub fn threshold_label(&self) -> String {
        format_number(self.catalog.magnitude_threshold)
    }
}

/// Format a float without a trailing `.0` when it is integral
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Resolved locations of every file the pipeline reads or writes
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub raw_catalog: PathBuf,
    pub cleaned_catalog: PathBuf,
    pub below_threshold: PathBuf,
    pub at_or_above_threshold: PathBuf,
    pub legend: PathBuf,
    /// Figure path without extension (gmt begin appends it)
    pub figure_stem: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl AsRef<Path>, config: &MapConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        let data_dir = root.join(&config.output.data_dir);
        let results_dir = root.join(&config.output.results_dir);
        let threshold = config.threshold_label();
        let catalog = &config.catalog;

        Self {
            raw_catalog: data_dir.join(&catalog.input_file),
            cleaned_catalog: data_dir.join(&catalog.cleaned_file),
            below_threshold: data_dir
                .join(catalog.less_than_file.replace("{threshold}", &threshold)),
            at_or_above_threshold: data_dir
                .join(catalog.greater_or_equal_file.replace("{threshold}", &threshold)),
            legend: data_dir.join(&config.legend.file),
            figure_stem: results_dir.join(&config.output.name),
            root,
            data_dir,
            results_dir,
        }
    }

    /// Final image path, e.g. `Results/Focal_Mechanism_Demo.png`
    pub fn figure(&self, config: &MapConfig) -> PathBuf {
        self.figure_stem.with_extension(&config.output.format)
    }

    /// Partition files in drawing order: below threshold first
    pub fn partitions(&self) -> [&Path; 2] {
        [&self.below_threshold, &self.at_or_above_threshold]
    }

    /// Check that the data directory exists and create the results directory
    pub fn prepare(&self) -> Result<()> {
        if !self.data_dir.is_dir() {
            return Err(FocalMapError::Config(format!(
                "data directory {} does not exist",
                self.data_dir.display()
            )));
        }
        std::fs::create_dir_all(&self.results_dir)
            .map_err(|e| FocalMapError::io(&self.results_dir, e))
    }
}
