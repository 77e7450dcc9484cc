//! Map rendering through GMT modern mode
//!
//! The map is described as an ordered plan of `gmt` module calls which a
//! [`PlotBackend`] executes. Layers, in drawing order:
//!
//! 1. `begin` / `set`: open the figure and apply the GMT defaults
//! 2. `basemap` + `grdimage`: frame and shaded SRTM relief of the study area
//! 3. `makecpt`: depth palette spanning the observed depth range
//! 4. `meca` once per magnitude partition, below the threshold first
//! 5. `colorbar`, `legend`, scale bar
//! 6. `coast` + `plot`: inset map with the study area outlined
//! 7. `end`: write the image

use crate::catalog::CatalogSummary;
use crate::config::{format_number, MapConfig, ProjectPaths};
use crate::error::{FocalMapError, Result};
use crate::gmt::shell_quote;
use std::fmt;
use std::path::Path;

/// One `gmt <module> <args...>` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GmtCommand {
    pub module: String,
    pub args: Vec<String>,
    /// Table data piped to the module's standard input
    pub stdin: Option<String>,
}

impl GmtCommand {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a short option such as `-R` with its value glued on
    pub fn opt(self, flag: &str, value: impl AsRef<str>) -> Self {
        let arg = format!("-{}{}", flag, value.as_ref());
        self.arg(arg)
    }

    pub fn path(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }
}

impl fmt::Display for GmtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gmt {}", self.module)?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Executes GMT commands
pub trait PlotBackend {
    fn execute(&mut self, command: &GmtCommand) -> Result<()>;

    /// Called once after the last command of a successful plan
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `-R` value for a [min lon, max lon, min lat, max lat] extent
fn region_arg(region: &[f64; 4]) -> String {
    region
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join("/")
}

/// `meca -S` symbol code for the mechanism convention
///
/// Partition files are written in the Aki & Richards layout, which is the only
/// convention they can be plotted with.
pub fn convention_code(convention: &str) -> Result<char> {
    if convention.eq_ignore_ascii_case("aki") {
        Ok('a')
    } else {
        Err(FocalMapError::Config(format!(
            "partition files are in Aki & Richards format, cannot plot them as '{}'",
            convention
        )))
    }
}

/// Build the complete command plan for the map
pub fn map_commands(
    config: &MapConfig,
    paths: &ProjectPaths,
    depth_range: (f64, f64),
) -> Result<Vec<GmtCommand>> {
    let map = &config.map;
    let inset = &config.inset;
    let mut plan = Vec::new();

    plan.push(
        GmtCommand::new("begin")
            .path(&paths.figure_stem)
            .arg(config.output.format.as_str()),
    );

    let mut set = GmtCommand::new("set");
    for (key, value) in &map.gmt_defaults {
        set = set.arg(key.as_str()).arg(value.as_str());
    }
    plan.push(set);

    let mut basemap = GmtCommand::new("basemap")
        .opt("R", region_arg(&map.region))
        .opt("J", &map.projection);
    for frame in &map.frame {
        basemap = basemap.opt("B", frame);
    }
    plan.push(basemap);

    plan.push(
        GmtCommand::new("grdimage")
            .arg(map.grid.as_str())
            .opt("I", "+d")
            .opt("C", &map.grid_cmap),
    );

    let (min_depth, max_depth) = depth_range;
    plan.push(GmtCommand::new("makecpt").opt("C", &map.depth_colors).opt(
        "T",
        format!("{}/{}", format_number(min_depth), format_number(max_depth)),
    ));

    // Both partitions get the offset option; rows without offset columns are
    // drawn in place.
    let symbol = convention_code(&map.meca_convention)?;
    for partition in paths.partitions() {
        plan.push(
            GmtCommand::new("meca")
                .path(partition)
                .opt("S", format!("{}{}", symbol, map.meca_scale))
                .arg("-C")
                .opt("A", &map.meca_offset),
        );
    }

    plan.push(GmtCommand::new("colorbar").opt("B", &map.colorbar_frame));

    plan.push(
        GmtCommand::new("legend")
            .path(&paths.legend)
            .opt("D", &config.legend.position),
    );

    plan.push(GmtCommand::new("basemap").opt("L", &map.map_scale));

    let mut coast = GmtCommand::new("coast")
        .opt("R", region_arg(&inset.region))
        .opt("J", &inset.projection);
    for frame in &inset.frame {
        coast = coast.opt("B", frame);
    }
    coast = coast.opt("G", &inset.land);
    for border in &inset.borders {
        coast = coast.opt("N", border);
    }
    plan.push(
        coast
            .opt("W", &inset.shorelines)
            .opt("S", &inset.water)
            .opt("X", &inset.xshift)
            .opt("Y", &inset.yshift),
    );

    // Study area outline: lower-left and upper-right corners
    let [min_lon, max_lon, min_lat, max_lat] = map.region;
    plan.push(
        GmtCommand::new("plot")
            .opt("S", &inset.style)
            .opt("W", &inset.pen)
            .opt("J", &inset.projection)
            .stdin(format!(
                "{} {} {} {}\n",
                format_number(min_lon),
                format_number(min_lat),
                format_number(max_lon),
                format_number(max_lat)
            )),
    );

    plan.push(GmtCommand::new("end"));
    Ok(plan)
}

/// Render the map for a filtered catalog
///
/// The first failing command aborts the run; nothing is retried.
pub fn plot_map(
    backend: &mut dyn PlotBackend,
    config: &MapConfig,
    paths: &ProjectPaths,
    summary: &CatalogSummary,
) -> Result<()> {
    println!("Building map...");

    paths.prepare()?;
    let depth_range = summary.depth_range()?;
    println!(
        "  Depth palette: {} to {} km, offsetting events >= M{}",
        format_number(depth_range.0),
        format_number(depth_range.1),
        format_number(summary.threshold)
    );

    let plan = map_commands(config, paths, depth_range)?;
    for command in &plan {
        eprintln!("  {}", command);
        backend.execute(command)?;
    }
    backend.finish()?;

    println!("Map Saved!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every command instead of running it
    #[derive(Default)]
    struct RecordingBackend {
        commands: Vec<GmtCommand>,
        fail_on: Option<&'static str>,
        finished: bool,
    }

    impl PlotBackend for RecordingBackend {
        fn execute(&mut self, command: &GmtCommand) -> Result<()> {
            if self.fail_on == Some(command.module.as_str()) {
                return Err(FocalMapError::Gmt {
                    module: command.module.clone(),
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                });
            }
            self.commands.push(command.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn plan() -> Vec<GmtCommand> {
        let config = MapConfig::embedded().unwrap();
        let paths = ProjectPaths::new("demo", &config);
        map_commands(&config, &paths, (1.1, 10.5)).unwrap()
    }

    fn summary() -> CatalogSummary {
        CatalogSummary {
            depths: vec![10.5, 8.0, 1.1],
            magnitudes: vec![5.2, 7.8, 6.9],
            threshold: 7.0,
            below_count: 2,
            at_or_above_count: 1,
        }
    }

    #[test]
    fn test_plan_order() {
        let modules: Vec<String> = plan().into_iter().map(|c| c.module).collect();
        assert_eq!(
            modules,
            vec![
                "begin", "set", "basemap", "grdimage", "makecpt", "meca", "meca", "colorbar",
                "legend", "basemap", "coast", "plot", "end"
            ]
        );
    }

    #[test]
    fn test_basemap_and_palette() {
        let plan = plan();
        assert_eq!(
            plan[2].args,
            vec!["-R-118/-117.15/35.5/36.1", "-JM6i", "-BSWne", "-Bxa", "-Bya"]
        );
        assert_eq!(plan[4].args, vec!["-Cyellow,red,purple", "-T1.1/10.5"]);
    }

    #[test]
    fn test_meca_for_both_partitions() {
        let plan = plan();
        let meca: Vec<&GmtCommand> = plan.iter().filter(|c| c.module == "meca").collect();

        assert!(meca[0].args[0].ends_with("focal_mechanism_data_less_than_M7.csv"));
        assert!(meca[1].args[0].ends_with("focal_mechanism_data_greater_than_or_equal_to_M7.csv"));
        for command in meca {
            assert_eq!(
                &command.args[1..],
                &["-Sa0.5+f15p,Helvetica,black", "-C", "-A1p"]
            );
        }
    }

    #[test]
    fn test_inset_rectangle() {
        let plan = plan();
        let plot = plan.iter().find(|c| c.module == "plot").unwrap();
        assert_eq!(plot.stdin.as_deref(), Some("-118 35.5 -117.15 36.1\n"));
        assert_eq!(plot.args, vec!["-Sr+s", "-W1p,black", "-JM1.75i"]);

        let coast = plan.iter().find(|c| c.module == "coast").unwrap();
        assert!(coast.args.contains(&"-N1/0.8p,gray40".to_string()));
        assert!(coast.args.contains(&"-N2/0.8p,gray40".to_string()));
        assert!(coast.args.contains(&"-X12.5c".to_string()));
    }

    #[test]
    fn test_display_quotes_spaces() {
        let command = GmtCommand::new("colorbar").opt("B", "af+lDepth (km)");
        assert_eq!(command.to_string(), "gmt colorbar '-Baf+lDepth (km)'");
    }

    #[test]
    fn test_convention_code() {
        assert_eq!(convention_code("aki").unwrap(), 'a');
        assert_eq!(convention_code("AKI").unwrap(), 'a');
        assert!(matches!(
            convention_code("gcmt"),
            Err(FocalMapError::Config(_))
        ));
        assert!(convention_code("mt").is_err());
    }

    #[test]
    fn test_plot_map_runs_plan() {
        let config = MapConfig::embedded().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(tmp.path(), &config);
        std::fs::create_dir(&paths.data_dir).unwrap();

        let mut backend = RecordingBackend::default();
        plot_map(&mut backend, &config, &paths, &summary()).unwrap();

        assert_eq!(backend.commands.len(), 13);
        assert!(backend.finished);
        assert!(paths.results_dir.is_dir());
    }

    #[test]
    fn test_plot_map_stops_on_failure() {
        let config = MapConfig::embedded().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(tmp.path(), &config);
        std::fs::create_dir(&paths.data_dir).unwrap();

        let mut backend = RecordingBackend {
            fail_on: Some("meca"),
            ..Default::default()
        };
        let err = plot_map(&mut backend, &config, &paths, &summary()).unwrap_err();

        assert!(matches!(err, FocalMapError::Gmt { ref module, .. } if module == "meca"));
        assert_eq!(backend.commands.len(), 5);
        assert!(!backend.finished);
    }
}
