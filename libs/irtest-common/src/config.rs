// Harness configuration: toolchain commands and run options
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/harness.json";

/// An external program plus the leading arguments it always receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

fn default_compiler() -> ToolCommand {
    ToolCommand::new("java").with_args(["-jar", "Cbias.jar"])
}

fn default_linker() -> ToolCommand {
    ToolCommand::new("llvm-link")
}

fn default_interpreter() -> ToolCommand {
    ToolCommand::new("lli")
}

fn default_runtime_library() -> PathBuf {
    PathBuf::from("sylib.ll")
}

fn default_gen_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_source_extension() -> String {
    "sy".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_compiler")]
    pub compiler: ToolCommand,
    #[serde(default = "default_linker")]
    pub linker: ToolCommand,
    #[serde(default = "default_interpreter")]
    pub interpreter: ToolCommand,
    /// Linked into every case's IR
    #[serde(default = "default_runtime_library")]
    pub runtime_library: PathBuf,
    /// Parent of the per-run `testgen-*` directories
    #[serde(default = "default_gen_dir")]
    pub gen_dir: PathBuf,
    #[serde(default = "default_true")]
    pub echo_exit_code: bool,
    /// Mirror each result line to stdout as it is produced
    #[serde(default = "default_true")]
    pub console_log: bool,
    /// Reproduce the older log spelling and spacing byte for byte
    #[serde(default)]
    pub legacy_log_format: bool,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            linker: default_linker(),
            interpreter: default_interpreter(),
            runtime_library: default_runtime_library(),
            gen_dir: default_gen_dir(),
            echo_exit_code: true,
            console_log: true,
            legacy_log_format: false,
            source_extension: default_source_extension(),
        }
    }
}

impl HarnessConfig {
    /// Load harness configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Harness config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Load with default path (config/harness.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Write this configuration as pretty JSON, creating parent directories
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json_content = serde_json::to_string_pretty(self)
            .context("Failed to serialize harness config")?;

        fs::write(config_path, json_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))
    }
}
