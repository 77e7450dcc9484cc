//! Text conditioning of raw catalog exports
//!
//! The SCEDC focal mechanism search returns a fixed-width text table padded with
//! runs of spaces and separated by blank lines. Conditioning drops the blank lines
//! and collapses every run of spaces into a single tab so the result can be read as
//! a tab-separated table.

use crate::error::{FocalMapError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// One or more space characters. Tabs are not matched.
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(" +").expect("valid space-run regex"));

/// Condition an in-memory export.
///
/// Lines that consist solely of a newline are dropped; every other line is kept
/// with its terminator. Windows line endings are normalized to `\n` first.
pub fn condition_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");

    let kept: String = normalized
        .split_inclusive('\n')
        .filter(|line| *line != "\n")
        .collect();

    SPACE_RUN.replace_all(&kept, "\t").into_owned()
}

/// Condition `input` and write the result to `output`.
///
/// Returns the number of lines written.
pub fn condition_file(input: &Path, output: &Path) -> Result<usize> {
    println!("Conditioning focal mechanisms...");

    let raw = fs::read_to_string(input).map_err(|e| FocalMapError::io(input, e))?;
    let conditioned = condition_text(&raw);
    fs::write(output, &conditioned).map_err(|e| FocalMapError::io(output, e))?;

    let lines = conditioned.lines().count();
    println!("  Wrote {} lines to {}", lines, output.display());
    Ok(lines)
}
