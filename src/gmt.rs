//! GMT command execution backends
//!
//! - [`GmtCli`]: runs each module through the `gmt` executable
//! - [`ScriptBackend`]: writes the plan as a shell script for machines without GMT

use crate::error::{FocalMapError, Result};
use crate::render::{GmtCommand, PlotBackend};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable overriding the gmt executable
pub const GMT_BIN_ENV: &str = "GMT_BIN";

/// Quote an argument for a POSIX shell only when it needs it
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Runs GMT modules as child processes
///
/// All modules share one modern-mode session, named after this process.
pub struct GmtCli {
    program: String,
    session: String,
}

impl GmtCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            session: std::process::id().to_string(),
        }
    }

    /// Use `$GMT_BIN`, falling back to `gmt` on the PATH
    pub fn from_env() -> Self {
        Self::new(std::env::var(GMT_BIN_ENV).unwrap_or_else(|_| "gmt".to_string()))
    }
}

impl PlotBackend for GmtCli {
    fn execute(&mut self, command: &GmtCommand) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(&command.module)
            .args(&command.args)
            .env("GMT_SESSION_NAME", &self.session)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FocalMapError::GmtNotFound {
                program: self.program.clone(),
                source,
            })?;

        if let (Some(data), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin
                .write_all(data.as_bytes())
                .map_err(|e| FocalMapError::io(&self.program, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| FocalMapError::io(&self.program, e))?;

        if !output.status.success() {
            return Err(FocalMapError::Gmt {
                module: command.module.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Writes the command plan to a shell script instead of running it
pub struct ScriptBackend {
    path: PathBuf,
    lines: Vec<String>,
}

impl ScriptBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Script text accumulated so far
    pub fn script(&self) -> String {
        let mut text = String::from("#!/bin/sh\nset -e\nexport GMT_SESSION_NAME=$$\n\n");
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

impl PlotBackend for ScriptBackend {
    fn execute(&mut self, command: &GmtCommand) -> Result<()> {
        match &command.stdin {
            Some(data) => {
                let data = data.strip_suffix('\n').unwrap_or(data);
                self.lines
                    .push(format!("{} <<'EOF'\n{}\nEOF", command, data));
            }
            None => self.lines.push(command.to_string()),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        fs::write(&self.path, self.script()).map_err(|e| FocalMapError::io(&self.path, e))?;
        println!("  GMT script written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("-JM6i"), "-JM6i");
        assert_eq!(shell_quote("-Sa0.5+f15p,Helvetica,black"), "-Sa0.5+f15p,Helvetica,black");
        assert_eq!(shell_quote("-Baf+lDepth (km)"), "'-Baf+lDepth (km)'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_script_backend_heredoc() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.sh");
        let mut backend = ScriptBackend::new(&path);

        backend
            .execute(&GmtCommand::new("begin").arg("Results/map").arg("png"))
            .unwrap();
        backend
            .execute(
                &GmtCommand::new("plot")
                    .opt("S", "r+s")
                    .stdin("-118 35.5 -117.15 36.1\n"),
            )
            .unwrap();
        backend.finish().unwrap();

        let script = fs::read_to_string(&path).unwrap();
        assert!(script.starts_with("#!/bin/sh\nset -e\n"));
        assert!(script.contains("gmt begin Results/map png\n"));
        assert!(script.contains("gmt plot -Sr+s <<'EOF'\n-118 35.5 -117.15 36.1\nEOF\n"));
    }

    #[test]
    fn test_missing_executable() {
        let mut cli = GmtCli::new("/nonexistent/gmt-binary");
        let err = cli.execute(&GmtCommand::new("begin")).unwrap_err();
        assert!(matches!(err, FocalMapError::GmtNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        // `false` ignores its arguments and exits 1
        let mut cli = GmtCli::new("false");
        let err = cli.execute(&GmtCommand::new("meca").arg("x")).unwrap_err();
        assert!(matches!(err, FocalMapError::Gmt { ref module, .. } if module == "meca"));
    }
}
