//! Catalog filtering and scaling into the AKI focal mechanism format
//!
//! Loads the conditioned catalog, splits events at the magnitude threshold and
//! converts each partition to the seven-column layout `gmt meca -Sa` expects:
//!
//! | catalog | output      |
//! |---------|-------------|
//! | LON     | longitude   |
//! | LAT     | latitude    |
//! | DEPTH   | depth       |
//! | STRIKE  | strike      |
//! | DIP     | dip         |
//! | RAKE    | rake        |
//! | MAG     | magnitude   |
//!
//! The output `magnitude` column is a display size (`0.1 * 2^MAG`), not a physical
//! magnitude. Events at or above the threshold also carry an offset coordinate and
//! their original magnitude as a label.

use crate::config::{format_number, MapConfig, ProjectPaths};
use crate::error::{FocalMapError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;

/// Catalog columns that must be present, in output order
pub const CATALOG_COLUMNS: [&str; 7] = ["LON", "LAT", "DEPTH", "STRIKE", "DIP", "RAKE", "MAG"];

/// Output column names matching [`CATALOG_COLUMNS`] position for position
pub const MECHANISM_COLUMNS: [&str; 7] = [
    "longitude",
    "latitude",
    "depth",
    "strike",
    "dip",
    "rake",
    "magnitude",
];

/// Extra columns of the at-or-above partition, after the mechanism columns
pub const OFFSET_COLUMNS: [&str; 3] = ["offset_longitude", "offset_latitude", "label_mag"];

/// Exponential display size for a magnitude: `0.1 * 2^magnitude`
pub fn magnitude_to_size(magnitude: f64) -> f64 {
    0.1 * 2f64.powf(magnitude)
}

/// The two magnitude partitions in AKI format
#[derive(Debug, Clone)]
pub struct Partitions {
    /// Events with magnitude strictly below the threshold
    pub below: DataFrame,
    /// Events at or above the threshold, with offset and label columns
    pub at_or_above: DataFrame,
}

/// Values the later stages need from the unscaled catalog
#[derive(Debug, Clone)]
pub struct CatalogSummary {
    /// Unscaled depths of every event, used for the depth color palette
    pub depths: Vec<f64>,
    /// Unscaled magnitudes of every event, used for the legend
    pub magnitudes: Vec<f64>,
    pub threshold: f64,
    pub below_count: usize,
    pub at_or_above_count: usize,
}

impl CatalogSummary {
    /// (min, max) of the depth series, ignoring NaNs
    pub fn depth_range(&self) -> Result<(f64, f64)> {
        min_max(&self.depths).ok_or(FocalMapError::EmptyCatalog)
    }
}

/// (min, max) over the finite values of a series
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Load a conditioned, tab-separated catalog file
pub fn load_catalog(path: &Path) -> Result<DataFrame> {
    let bytes = fs::read(path).map_err(|e| FocalMapError::io(path, e))?;
    parse_catalog(bytes)
}

/// Parse conditioned catalog bytes (header row, tab separated)
///
/// Column types are inferred from every row, so a decimal value deep in an
/// otherwise integer column still parses. Only MAG is cast to Float64; the other
/// columns keep their inferred type and integer fields such as STRIKE are
/// written back without a fractional part.
pub fn parse_catalog(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_separator(b'\t'))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    for name in CATALOG_COLUMNS {
        if df.get_column_index(name).is_none() {
            return Err(FocalMapError::MissingColumn(name.to_string()));
        }
    }

    Ok(df
        .lazy()
        .with_column(col("MAG").cast(DataType::Float64))
        .collect()?)
}

/// Split the catalog at the magnitude threshold and convert both halves
pub fn split_and_scale(catalog: &DataFrame, config: &MapConfig) -> Result<Partitions> {
    let threshold = config.catalog.magnitude_threshold;

    // Null magnitudes satisfy neither predicate and are dropped
    let below = catalog
        .clone()
        .lazy()
        .filter(col("MAG").lt(lit(threshold)))
        .collect()?;
    let at_or_above = catalog
        .clone()
        .lazy()
        .filter(col("MAG").gt_eq(lit(threshold)))
        .collect()?;

    let below = to_aki_format(&below)?;

    let labels = magnitude_values(&at_or_above)?;
    let mut offset = to_aki_format(&at_or_above)?;
    let rows = offset.height();

    // A single offset coordinate is shared by every offset event
    offset.with_column(Series::new(
        OFFSET_COLUMNS[0].into(),
        vec![config.catalog.offset_longitude; rows],
    ))?;
    offset.with_column(Series::new(
        OFFSET_COLUMNS[1].into(),
        vec![config.catalog.offset_latitude; rows],
    ))?;
    offset.with_column(Series::new(OFFSET_COLUMNS[2].into(), labels))?;

    Ok(Partitions {
        below,
        at_or_above: offset,
    })
}

/// Select and rename the mechanism columns, replacing MAG with its display size
fn to_aki_format(partition: &DataFrame) -> Result<DataFrame> {
    let renamed: Vec<Expr> = CATALOG_COLUMNS[..6]
        .iter()
        .zip(MECHANISM_COLUMNS[..6].iter())
        .map(|(from, to)| col(*from).alias(*to))
        .collect();

    let mut aki = partition.clone().lazy().select(renamed).collect()?;

    let sizes = partition
        .column("MAG")?
        .cast(&DataType::Float64)?
        .as_materialized_series()
        .f64()?
        .apply_values(magnitude_to_size)
        .into_series()
        .with_name(MECHANISM_COLUMNS[6].into());
    aki.with_column(sizes)?;

    Ok(aki)
}

fn magnitude_values(df: &DataFrame) -> Result<Vec<f64>> {
    column_values(df, "MAG")
}

/// Non-null values of a numeric column as f64, in row order
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    Ok(values
        .as_materialized_series()
        .f64()?
        .into_iter()
        .flatten()
        .collect())
}

/// Write a partition tab-separated with no header row and no index column
///
/// `gmt meca` would otherwise try to plot the header text as a symbol.
pub fn write_partition(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| FocalMapError::io(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .with_separator(b'\t')
        .finish(df)?;
    Ok(())
}

pub fn write_partitions(partitions: &mut Partitions, paths: &ProjectPaths) -> Result<()> {
    write_partition(&mut partitions.below, &paths.below_threshold)?;
    write_partition(&mut partitions.at_or_above, &paths.at_or_above_threshold)?;
    Ok(())
}

/// Load the conditioned catalog, write both AKI partitions and summarize the
/// unscaled depths and magnitudes for the legend and renderer.
pub fn filter_aki_format(paths: &ProjectPaths, config: &MapConfig) -> Result<CatalogSummary> {
    println!("Writing focal mechanisms to CSV...");

    let catalog = load_catalog(&paths.cleaned_catalog)?;
    let depths = column_values(&catalog, "DEPTH")?;
    let magnitudes = magnitude_values(&catalog)?;

    let mut partitions = split_and_scale(&catalog, config)?;
    write_partitions(&mut partitions, paths)?;

    let threshold = config.catalog.magnitude_threshold;
    println!(
        "  {} events below M{}, {} at or above",
        partitions.below.height(),
        format_number(threshold),
        partitions.at_or_above.height()
    );

    Ok(CatalogSummary {
        depths,
        magnitudes,
        threshold,
        below_count: partitions.below.height(),
        at_or_above_count: partitions.at_or_above.height(),
    })
}
