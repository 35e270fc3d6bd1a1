//! GitHub Actions runner plumbing.
//!
//! Outputs and exported variables go to the files named by
//! `GITHUB_OUTPUT` and `GITHUB_ENV`. Masks and annotations are workflow
//! commands on stdout. Without the files (local runs) outputs fall back
//! to workflow commands as well.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{HostingError, HostingResult};

pub struct ActionsIo<W: Write = io::Stdout> {
    output_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
    commands: W,
}

impl ActionsIo {
    /// Use the runner's files and the process stdout.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            file_from_env("GITHUB_OUTPUT"),
            file_from_env("GITHUB_ENV"),
            io::stdout(),
        )
    }
}

impl<W: Write> ActionsIo<W> {
    pub const fn new(output_file: Option<PathBuf>, env_file: Option<PathBuf>, commands: W) -> Self {
        Self {
            output_file,
            env_file,
            commands,
        }
    }

    pub fn set_output(&mut self, name: &str, value: &str) -> HostingResult<()> {
        match &self.output_file {
            Some(path) => append_entry(path, name, value),
            None => {
                writeln!(
                    self.commands,
                    "::set-output name={}::{}",
                    escape_property(name),
                    escape_data(value)
                )?;
                Ok(())
            }
        }
    }

    /// Register a value the runner must redact from the log.
    pub fn add_mask(&mut self, value: &str) -> HostingResult<()> {
        if value.is_empty() {
            return Ok(());
        }
        writeln!(self.commands, "::add-mask::{}", escape_data(value))?;
        Ok(())
    }

    /// Make a variable visible to the following steps of the job.
    pub fn export_variable(&mut self, name: &str, value: &str) -> HostingResult<()> {
        match &self.env_file {
            Some(path) => append_entry(path, name, value),
            None => {
                log::warn!("GITHUB_ENV is not set; cannot export {name}");
                Ok(())
            }
        }
    }

    /// Print an error annotation. The caller decides the exit status.
    pub fn fail(&mut self, message: &str) -> HostingResult<()> {
        writeln!(self.commands, "::error::{}", escape_data(message))?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.commands
    }
}

fn file_from_env(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Append `name<<DELIM\nvalue\nDELIM` so values may span lines.
fn append_entry(path: &Path, name: &str, value: &str) -> HostingResult<()> {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(HostingError::Validation(format!(
            "value of {name} contains the delimiter"
        )));
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{name}<<{delimiter}\n{value}\n{delimiter}")?;
    Ok(())
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}
