//! Magnitude legend for `gmt legend`
//!
//! The legend file is a list of GMT legend codes: a header, a divider, then one
//! circle per integer magnitude sized exactly like the plotted beachballs.
//!
//! Vertical gaps grow as successive square roots of the initial gap
//! (0.08, 0.283, 0.532, ...) so that the increasingly large circles stay
//! evenly spaced.

use crate::catalog::min_max;
use crate::config::{LegendStyle, MapConfig, ProjectPaths};
use crate::error::{FocalMapError, Result};
use std::fmt::Write as _;
use std::fs;

const PREAMBLE: &str = "# G is vertical gap, V is vertical line, N sets # of columns,\n\
                        # D draws horizontal line, H is header, L is column header,\n\
                        # S is symbol <symbol size><symbol color><symbol border thickness><text position><text>\n\
                        \n";

/// One circle of the magnitude legend
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub magnitude: i64,
    /// Circle diameter, matching the scale of `meca -Sa0.5`
    pub size: f64,
    /// Vertical gap in inches written after this entry
    pub gap: f64,
}

impl LegendEntry {
    pub fn label(&self) -> String {
        format!("M{}", self.magnitude)
    }
}

/// Legend circle size for an integer magnitude.
///
/// This is the display size of `catalog::magnitude_to_size` scaled by another
/// 0.1 (the meca scale is relative to M5), rounded to two decimals.
pub fn legend_symbol_size(magnitude: i64) -> f64 {
    let size = 0.1 * (0.1 * 2f64.powi(magnitude as i32));
    (size * 100.0).round() / 100.0
}

/// Build one entry per integer magnitude from floor(min) to round(max)
///
/// `round` is round-half-to-even, so a maximum of exactly 6.5 stops at M6.
pub fn legend_entries(magnitudes: &[f64], style: &LegendStyle) -> Result<Vec<LegendEntry>> {
    let (min, max) = min_max(magnitudes).ok_or(FocalMapError::EmptyCatalog)?;
    let first = min.floor() as i64;
    let last = max.round_ties_even() as i64;

    let mut gap = style.initial_gap;
    let mut entries = Vec::new();
    for magnitude in first..=last {
        entries.push(LegendEntry {
            magnitude,
            size: legend_symbol_size(magnitude),
            gap,
        });
        gap = gap.sqrt();
    }
    Ok(entries)
}

/// Render the full legend file text
pub fn render_legend(entries: &[LegendEntry], style: &LegendStyle) -> String {
    let mut out = String::from(PREAMBLE);
    let _ = write!(
        out,
        "H {}\nD 0.1i 1p\nG 0.05i\nN 1\n\n",
        style.header
    );

    for entry in entries {
        let _ = write!(
            out,
            "S {} c {} {} {} {} {}\nG {}i\n",
            style.symbol_offset,
            float_repr(entry.size),
            style.symbol_fill,
            style.symbol_pen,
            style.label_offset,
            entry.label(),
            float_repr(entry.gap)
        );
    }
    out
}

/// Shortest round-trip float text, always with a decimal point (`1.0`, `0.32`)
fn float_repr(value: f64) -> String {
    let s = format!("{}", value);
    if value.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

/// Write the legend file for the catalog's magnitude range
pub fn create_legend(
    magnitudes: &[f64],
    paths: &ProjectPaths,
    config: &MapConfig,
) -> Result<Vec<LegendEntry>> {
    let entries = legend_entries(magnitudes, &config.legend)?;
    let text = render_legend(&entries, &config.legend);
    fs::write(&paths.legend, text).map_err(|e| FocalMapError::io(&paths.legend, e))?;

    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        println!(
            "  Legend: {} entries ({} to {})",
            entries.len(),
            first.label(),
            last.label()
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn style() -> LegendStyle {
        MapConfig::embedded().unwrap().legend
    }

    #[test]
    fn test_entry_range() {
        let entries = legend_entries(&[5.2, 7.8, 6.9, 9.1], &style()).unwrap();
        let mags: Vec<i64> = entries.iter().map(|e| e.magnitude).collect();
        assert_eq!(mags, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_max_rounds_half_to_even() {
        let entries = legend_entries(&[5.0, 6.5], &style()).unwrap();
        assert_eq!(entries.len(), 2);
        let entries = legend_entries(&[5.0, 7.5], &style()).unwrap();
        assert_eq!(entries.len(), 4);
        let entries = legend_entries(&[5.9, 6.6], &style()).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_symbol_sizes() {
        assert_eq!(legend_symbol_size(5), 0.32);
        assert_eq!(legend_symbol_size(6), 0.64);
        assert_eq!(legend_symbol_size(7), 1.28);
        assert_eq!(legend_symbol_size(9), 5.12);
    }

    #[test]
    fn test_gap_sequence() {
        let entries = legend_entries(&[5.0, 9.0], &style()).unwrap();
        let gaps: Vec<f64> = entries.iter().map(|e| e.gap).collect();

        assert_eq!(gaps[0], 0.08);
        assert_abs_diff_eq!(gaps[1], 0.28284271247461906, epsilon = 1e-15);
        assert_abs_diff_eq!(gaps[2], 0.5318295896944989, epsilon = 1e-12);
        assert!(gaps.windows(2).all(|w| w[0] < w[1]));
        assert!(gaps.iter().all(|g| *g < 1.0));
    }

    #[test]
    fn test_rendered_text() {
        let style = style();
        let entries = legend_entries(&[5.4, 6.2], &style).unwrap();
        let text = render_legend(&entries, &style);

        assert!(text.starts_with("# G is vertical gap"));
        assert!(text.contains("\nH 12p,Helvetica Magnitude\nD 0.1i 1p\nG 0.05i\nN 1\n\n"));
        let body: Vec<&str> = text.lines().skip_while(|l| !l.starts_with("S ")).collect();
        assert_eq!(body.len(), 4);
        assert_eq!(body[0], "S 0.20i c 0.32 white@100 0.5p 0.6i M5");
        assert_eq!(body[1], "G 0.08i");
        assert_eq!(body[2], "S 0.20i c 0.64 white@100 0.5p 0.6i M6");
        let gap: f64 = body[3]
            .strip_prefix("G ")
            .and_then(|g| g.strip_suffix('i'))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(gap, 0.08f64.sqrt());
    }

    #[test]
    fn test_empty_magnitudes() {
        assert!(matches!(
            legend_entries(&[], &style()),
            Err(FocalMapError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(0.32), "0.32");
        assert_eq!(float_repr(1.0), "1.0");
    }
}
