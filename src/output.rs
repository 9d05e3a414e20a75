//! Workflow outputs
//!
//! Step outputs and failure annotations use the GitHub Actions runner
//! conventions: outputs are appended to the file named by `GITHUB_OUTPUT`,
//! annotations are workflow commands printed to stdout.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

/// Destination of named step outputs
pub trait OutputSink {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()>;
}

/// Collects outputs in memory
impl OutputSink for BTreeMap<String, String> {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        self.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Writes outputs the way the Actions runner reads them
#[derive(Debug, Clone, Default)]
pub struct GithubOutput {
    path: Option<PathBuf>,
}

impl GithubOutput {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn from_env() -> Self {
        let path = std::env::var_os("GITHUB_OUTPUT")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::new(path)
    }
}

impl OutputSink for GithubOutput {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        tracing::debug!("Setting output {}", name);

        let Some(path) = &self.path else {
            // Runners without GITHUB_OUTPUT still accept the legacy command
            println!("::set-output name={}::{}", escape_property(name), escape_data(value));
            return Ok(());
        };

        let entry = file_command_entry(name, value)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output file {}", path.display()))?;
        file.write_all(entry.as_bytes())
            .with_context(|| format!("Failed to write output file {}", path.display()))?;

        Ok(())
    }
}

/// `name<<delimiter` block for an output file
fn file_command_entry(name: &str, value: &str) -> Result<String> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());

    if name.contains(&delimiter) {
        bail!("Unexpected input: name should not contain the delimiter \"{delimiter}\"");
    }
    if value.contains(&delimiter) {
        bail!("Unexpected input: value should not contain the delimiter \"{delimiter}\"");
    }

    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

/// Mark the step failed
pub fn set_failed(message: &str) {
    println!("::error::{}", escape_data(message));
}
