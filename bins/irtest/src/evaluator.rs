/// Output Evaluator - Verdict Assignment
///
/// **Core Responsibility:**
/// Compare captured program output against the expected answer and turn a
/// stage outcome into a verdict.
///
/// **Critical Properties:**
/// - Knows nothing about the toolchain
/// - Comparison is exact, byte for byte: no trimming, no newline folding
/// - Both files must exist; a missing file is an error, not a mismatch

use anyhow::{Context, Result};
use irtest_common::types::{StageOutcome, Verdict};
use std::fs;
use std::path::Path;

/// Byte-for-byte file comparison
pub fn files_match(actual: &Path, expected: &Path) -> Result<bool> {
    let actual_len = fs::metadata(actual)
        .with_context(|| format!("Failed to read captured output {}", actual.display()))?
        .len();
    let expected_len = fs::metadata(expected)
        .with_context(|| format!("Failed to read expected output {}", expected.display()))?
        .len();
    if actual_len != expected_len {
        return Ok(false);
    }

    let actual_bytes = fs::read(actual)
        .with_context(|| format!("Failed to read captured output {}", actual.display()))?;
    let expected_bytes = fs::read(expected)
        .with_context(|| format!("Failed to read expected output {}", expected.display()))?;
    Ok(actual_bytes == expected_bytes)
}

/// Verdict for a finished pipeline
///
/// Compile and link failures are both reported as `CompilationError`.
pub fn judge(outcome: &StageOutcome, expected: &Path) -> Result<Verdict> {
    match outcome {
        StageOutcome::CompileFailed | StageOutcome::LinkFailed => Ok(Verdict::CompilationError),
        StageOutcome::Ran { output, .. } => {
            if files_match(output, expected)? {
                Ok(Verdict::Accepted)
            } else {
                Ok(Verdict::WrongAnswer)
            }
        }
    }
}
