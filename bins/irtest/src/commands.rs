// CLI command implementations
use crate::executor::Harness;
use crate::loader;
use anyhow::Result;
use irtest_common::config::{HarnessConfig, DEFAULT_CONFIG_PATH};
use irtest_common::types::BatchReport;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub gen_dir: Option<PathBuf>,
    pub runtime_library: Option<PathBuf>,
    pub no_echo_exit_code: bool,
    pub quiet: bool,
    pub legacy_log_format: bool,
}

impl RunOverrides {
    pub fn apply(self, config: &mut HarnessConfig) {
        if let Some(gen_dir) = self.gen_dir {
            config.gen_dir = gen_dir;
        }
        if let Some(runtime_library) = self.runtime_library {
            config.runtime_library = runtime_library;
        }
        if self.no_echo_exit_code {
            config.echo_exit_code = false;
        }
        if self.quiet {
            config.console_log = false;
        }
        if self.legacy_log_format {
            config.legacy_log_format = true;
        }
    }
}

/// Load config, discover cases and run the batch
pub fn run_batch(cases_dir: &Path, config_path: &Path, overrides: RunOverrides) -> Result<BatchReport> {
    let mut config = HarnessConfig::load(config_path).map_err(|e| {
        error!("Failed to load harness config: {:#}", e);
        error!("Create one with: irtest init");
        e
    })?;
    overrides.apply(&mut config);

    let testcases = loader::discover(cases_dir, &config.source_extension)?;
    info!(cases = testcases.len(), dir = %cases_dir.display(), "Discovered test cases");

    let harness = Harness::new(config, testcases)?;
    let report = harness.run()?;

    println!(
        "{} / {} accepted, results in {}",
        report.accepted(),
        report.total(),
        harness.run_dir().result_log.display()
    );
    Ok(report)
}

/// Create `config/harness.json` with default values unless it already exists
pub fn init_project(path: &Path) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_PATH);
    if config_path.exists() {
        info!(path = %config_path.display(), "Config already exists, leaving it untouched");
        return Ok(());
    }

    HarnessConfig::default().save(&config_path)?;
    info!(path = %config_path.display(), "Created default harness config");
    Ok(())
}
