//! Shared map building pipeline
//!
//! This module runs the four stages in order and is shared between the binary
//! and the integration tests:
//! 1. Conditions the raw catalog export into a tab-separated table
//! 2. Splits, scales and writes the AKI partitions
//! 3. Writes the magnitude legend
//! 4. Renders the map through a PlotBackend
//!
//! Each stage reads the previous stage's output file, so a failure stops the run.

use crate::catalog::{self, CatalogSummary};
use crate::condition;
use crate::config::{MapConfig, ProjectPaths};
use crate::error::Result;
use crate::legend::{self, LegendEntry};
use crate::profile::StageTimer;
use crate::render::{self, PlotBackend};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub conditioned_lines: usize,
    pub summary: CatalogSummary,
    pub legend: Vec<LegendEntry>,
}

/// Build the focal mechanism map for the project at `paths`
pub fn build_map(
    paths: &ProjectPaths,
    config: &MapConfig,
    backend: &mut dyn PlotBackend,
) -> Result<PipelineReport> {
    let mut timer = StageTimer::new();

    println!("\n[1/4] Conditioning catalog export...");
    let conditioned_lines = condition::condition_file(&paths.raw_catalog, &paths.cleaned_catalog)?;
    timer.finish("condition");

    println!("\n[2/4] Filtering and scaling focal mechanisms...");
    let summary = catalog::filter_aki_format(paths, config)?;
    timer.finish("filter");

    println!("\n[3/4] Creating legend...");
    let legend = legend::create_legend(&summary.magnitudes, paths, config)?;
    timer.finish("legend");

    println!("\n[4/4] Rendering map...");
    render::plot_map(backend, config, paths, &summary)?;
    timer.finish("render");
    eprintln!("TIMEPROF: build_map [{:.3}s]", timer.total().as_secs_f64());

    Ok(PipelineReport {
        conditioned_lines,
        summary,
        legend,
    })
}
