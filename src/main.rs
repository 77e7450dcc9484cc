//! Focal Mechanism Map - Main entry point
//!
//! Conditions a focal mechanism catalog exported from the SCEDC focal mechanism
//! search, splits it at the magnitude threshold and renders a beachball map
//! colored by depth with GMT.
//!
//! Usage:
//! ```bash
//! # project layout: <dir>/Data/focal_mechanism_data.txt
//! focal_mechanism_map --dir ~/Focal_Mechanism_Demo
//! # without GMT installed: write the GMT commands to a script
//! focal_mechanism_map --dir ~/Focal_Mechanism_Demo --script map.sh
//! ```

use anyhow::Context;
use focal_mechanism_map::config::{MapConfig, ProjectPaths, PROJECT_DIR_ENV};
use focal_mechanism_map::gmt::{GmtCli, ScriptBackend};
use focal_mechanism_map::pipeline;
use focal_mechanism_map::render::PlotBackend;
use std::path::PathBuf;

/// Command-line options
#[derive(Debug, Default)]
struct Args {
    dir: Option<PathBuf>,
    script: Option<PathBuf>,
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" if i + 1 < args.len() => {
                parsed.dir = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--script" if i + 1 < args.len() => {
                parsed.script = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => anyhow::bail!("unrecognized argument '{}' (see --help)", other),
        }
    }
    Ok(parsed)
}

fn print_usage() {
    println!("Usage: focal_mechanism_map [--dir <project root>] [--script <path>]");
    println!();
    println!("  --dir     project root containing Data/ (default: ${PROJECT_DIR_ENV} or .)");
    println!("  --script  write the GMT commands to a shell script instead of running gmt");
}

fn main() -> anyhow::Result<()> {
    println!("Focal Mechanism Map v{}", env!("CARGO_PKG_VERSION"));

    let raw_args: Vec<String> = std::env::args().collect();
    let args = parse_args(&raw_args)?;

    let root = args
        .dir
        .or_else(|| std::env::var_os(PROJECT_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let config = MapConfig::embedded().context("Failed to load map_config.json")?;
    let paths = ProjectPaths::new(&root, &config);
    println!("Project directory: {}", paths.root.display());

    let mut backend: Box<dyn PlotBackend> = match args.script {
        Some(script) => Box::new(ScriptBackend::new(script)),
        None => Box::new(GmtCli::from_env()),
    };

    let report = pipeline::build_map(&paths, &config, backend.as_mut())
        .with_context(|| format!("Failed to build map in {}", paths.root.display()))?;

    println!(
        "\n✓ {} events mapped ({} offset), {} legend entries",
        report.summary.below_count + report.summary.at_or_above_count,
        report.summary.at_or_above_count,
        report.legend.len()
    );
    println!("  Output: {}", paths.figure(&config).display());
    Ok(())
}
