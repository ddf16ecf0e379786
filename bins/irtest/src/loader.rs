// Test case discovery from a directory tree
use anyhow::{Context, Result, bail};
use irtest_common::types::TestCase;
use std::path::Path;
use walkdir::WalkDir;

/// Collect every `*.<extension>` file under `root` as a test case
///
/// `<stem>.in` is used as stdin when present; `<stem>.out` is always taken
/// as the expected answer. Each case is named by its path relative to
/// `root`, so artifact names do not grow with the checkout location. Cases
/// come back in path order.
pub fn discover(root: &Path, extension: &str) -> Result<Vec<TestCase>> {
    if !root.is_dir() {
        bail!("Test case directory not found: {}", root.display());
    }

    let mut testcases = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let mut testcase =
            TestCase::new(path, path.with_extension("out")).with_name(relative);
        let input = path.with_extension("in");
        if input.is_file() {
            testcase = testcase.with_input(input);
        }
        testcases.push(testcase);
    }

    if testcases.is_empty() {
        bail!("No .{} test cases found under {}", extension, root.display());
    }

    Ok(testcases)
}
