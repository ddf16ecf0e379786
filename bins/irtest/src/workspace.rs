/// Run Directory - Per-Run Artifact Workspace
///
/// Every harness instance owns one `testgen-<MMDD-HHMMSS>` directory under
/// the configured generation dir:
///
/// ```text
/// <gen_dir>/testgen-<MMDD-HHMMSS>/
///     ir/          compiled (.ll) and linked (.bc) artifacts
///     out/         captured program output
///     result.log   one verdict line per case
/// ```
///
/// The tree is created eagerly and never removed by the harness.

use anyhow::{Context, Result};
use chrono::Local;
use irtest_common::types::TestCase;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

const ROOT_PREFIX: &str = "testgen-";
const TIMESTAMP_FORMAT: &str = "%m%d-%H%M%S";

#[derive(Debug, Clone)]
pub struct RunDirectory {
    pub root: PathBuf,
    pub ir_dir: PathBuf,
    pub out_dir: PathBuf,
    pub result_log: PathBuf,
    /// Widest source path in the batch, for aligning the log columns
    pub max_path_width: usize,
}

impl RunDirectory {
    /// Create the run directory tree for a batch of test cases
    pub fn create(gen_dir: &Path, testcases: &[TestCase]) -> Result<Self> {
        fs::create_dir_all(gen_dir)
            .with_context(|| format!("Failed to create directory: {}", gen_dir.display()))?;

        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let root = create_unique_root(gen_dir, &stamp)?;

        let ir_dir = root.join("ir");
        let out_dir = root.join("out");
        fs::create_dir(&ir_dir)
            .with_context(|| format!("Failed to create directory: {}", ir_dir.display()))?;
        fs::create_dir(&out_dir)
            .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

        let max_path_width = testcases
            .iter()
            .map(TestCase::source_display_width)
            .max()
            .unwrap_or(0);

        info!(root = %root.display(), cases = testcases.len(), "Run directory created");

        Ok(Self {
            result_log: root.join("result.log"),
            root,
            ir_dir,
            out_dir,
            max_path_width,
        })
    }

    pub fn ir_path(&self, testcase: &TestCase) -> PathBuf {
        self.ir_dir.join(testcase.ir_name())
    }

    pub fn linked_path(&self, testcase: &TestCase) -> PathBuf {
        self.ir_dir.join(testcase.linked_name())
    }

    pub fn output_path(&self, testcase: &TestCase) -> PathBuf {
        self.out_dir.join(testcase.output_name())
    }
}

/// `create_dir` is not recursive and fails on an existing path, so a second
/// run in the same second lands on `testgen-<stamp>-1`, `-2`, ...
fn create_unique_root(gen_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}{}", ROOT_PREFIX, stamp)
        } else {
            format!("{}{}-{}", ROOT_PREFIX, stamp, attempt)
        };
        let candidate = gen_dir.join(name);

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create directory: {}", candidate.display())
                });
            }
        }
    }
}
