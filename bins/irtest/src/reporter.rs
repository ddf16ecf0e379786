// Result log writer with optional live console mirror
use anyhow::{Context, Result};
use irtest_common::types::Verdict;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Writes one `<source padded>\t<verdict>` line per case
///
/// Every line goes straight to the log file, so whatever was written before
/// an abort stays on disk.
pub struct Reporter {
    log: File,
    console: Option<Box<dyn Write>>,
    width: usize,
    legacy: bool,
}

impl Reporter {
    /// Create (or truncate) the result log
    pub fn create(path: &Path, width: usize) -> Result<Self> {
        let log = File::create(path)
            .with_context(|| format!("Failed to create result log {}", path.display()))?;
        Ok(Self {
            log,
            console: None,
            width,
            legacy: false,
        })
    }

    pub fn with_console(mut self, console: Box<dyn Write>) -> Self {
        self.console = Some(console);
        self
    }

    /// Match older result logs: `Accecpted`, and a space
    /// before the tab
    pub fn legacy_format(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn format_line(&self, source: &Path, verdict: Verdict) -> String {
        let (sep, label) = if self.legacy {
            (" \t", verdict.legacy_label())
        } else {
            ("\t", verdict.label())
        };
        format!(
            "{:<width$}{}{}\n",
            source.display().to_string(),
            sep,
            label,
            width = self.width
        )
    }

    /// Append one line to the log, then the console
    ///
    /// Only a log write failure is an error. A console that stops accepting
    /// writes (closed pipe) is dropped and the batch carries on.
    pub fn record(&mut self, source: &Path, verdict: Verdict) -> Result<()> {
        let line = self.format_line(source, verdict);
        self.log
            .write_all(line.as_bytes())
            .context("Failed to write result log")?;
        if let Some(console) = self.console.as_mut() {
            if let Err(e) = console.write_all(line.as_bytes()).and_then(|()| console.flush()) {
                warn!(error = %e, "Console mirror failed; continuing with result log only");
                self.console = None;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.log.flush().context("Failed to flush result log")?;
        self.log.sync_all().context("Failed to sync result log")?;
        Ok(())
    }
}
