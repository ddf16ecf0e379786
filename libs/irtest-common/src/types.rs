use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Longest readable prefix of an artifact key, in bytes
const KEY_BASE_MAX: usize = 96;
/// Hex digits of the source path digest appended to every key
const KEY_HASH_LEN: usize = 8;

/// One source test case plus the file locations needed to judge it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub source: PathBuf,
    /// Path relative to the case root; names artifacts instead of `source`
    #[serde(default)]
    pub name: Option<PathBuf>,
    /// Absent means the interpreter is run with no stdin
    #[serde(default)]
    pub input: Option<PathBuf>,
    pub expected_output: PathBuf,
    /// Per-case override of the batch-wide exit code echo flag
    #[serde(default)]
    pub echo_exit_code: Option<bool>,
}

impl TestCase {
    pub fn new(source: impl Into<PathBuf>, expected_output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            name: None,
            input: None,
            expected_output: expected_output.into(),
            echo_exit_code: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<PathBuf>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Deterministic artifact key derived from the source path
    ///
    /// The readable part comes from `name` (or `source` when unnamed): normal
    /// components joined with `_`, final extension dropped, capped at
    /// `KEY_BASE_MAX` bytes. A short SHA-256 of the full source path follows,
    /// so `cases/functional/01_add.sy` named `functional/01_add.sy` becomes
    /// `functional_01_add-<8 hex>`. Distinct sources never share a key even
    /// when their readable parts flatten to the same text.
    pub fn artifact_key(&self) -> String {
        let naming = self.name.as_deref().unwrap_or(&self.source);
        let base = flatten(naming);
        let base = truncate_on_char_boundary(&base, KEY_BASE_MAX);

        let digest = Sha256::digest(self.source.as_os_str().as_encoded_bytes());
        let hash: String = digest
            .iter()
            .take(KEY_HASH_LEN / 2)
            .map(|b| format!("{:02x}", b))
            .collect();

        if base.is_empty() {
            hash
        } else {
            format!("{}-{}", base, hash)
        }
    }

    /// Name of the IR file emitted by the compiler
    pub fn ir_name(&self) -> String {
        format!("{}.ll", self.artifact_key())
    }

    /// Name of the linked, self-contained artifact
    pub fn linked_name(&self) -> String {
        format!("{}.bc", self.artifact_key())
    }

    /// Name of the capture file holding the program's output
    pub fn output_name(&self) -> String {
        format!("{}.out", self.artifact_key())
    }

    pub fn source_display_width(&self) -> usize {
        self.source.display().to_string().chars().count()
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }
}

fn flatten(path: &Path) -> String {
    path.with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// What the pipeline stages produced for a case, before comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    CompileFailed,
    LinkFailed,
    Ran { exit_code: i32, output: PathBuf },
}

/// Final classification of a case, written to the result log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    CompilationError,
    Accepted,
    WrongAnswer,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::CompilationError => "Compilation Error",
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
        }
    }

    /// Label spelling found in older result logs
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Verdict::Accepted => "Accecpted",
            other => other.label(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub source: PathBuf,
    pub outcome: StageOutcome,
    pub verdict: Verdict,
}

/// Results of a whole batch in input order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<CaseResult>,
}

impl BatchReport {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.results.iter().filter(|r| r.verdict == verdict).count()
    }

    pub fn accepted(&self) -> usize {
        self.count(Verdict::Accepted)
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readable(key: &str) -> &str {
        key.rsplit_once('-').map(|(base, _)| base).unwrap_or("")
    }

    #[test]
    fn test_artifact_names_follow_source_path() {
        let tc = TestCase::new("cases/functional/01_add.sy", "cases/functional/01_add.out");
        let key = tc.artifact_key();
        assert_eq!(readable(&key), "cases_functional_01_add");
        assert_eq!(key.len(), "cases_functional_01_add-".len() + KEY_HASH_LEN);
        assert_eq!(tc.ir_name(), format!("{}.ll", key));
        assert_eq!(tc.linked_name(), format!("{}.bc", key));
        assert_eq!(tc.output_name(), format!("{}.out", key));
    }

    #[test]
    fn test_artifact_key_is_deterministic() {
        let a = TestCase::new("cases/x.sy", "cases/x.out");
        let b = TestCase::new("cases/x.sy", "elsewhere.out");
        assert_eq!(a.artifact_key(), b.artifact_key());
    }

    #[test]
    fn test_name_replaces_source_in_readable_part() {
        let tc = TestCase::new("/home/ci/checkout/tests/functional/01_add.sy", "x.out")
            .with_name("functional/01_add.sy");
        assert_eq!(readable(&tc.artifact_key()), "functional_01_add");
    }

    #[test]
    fn test_artifact_key_skips_dot_components() {
        let tc = TestCase::new("./cases/../x/main.sy", "x/main.out");
        assert_eq!(readable(&tc.artifact_key()), "cases_x_main");
    }

    #[test]
    fn test_same_stem_in_different_dirs_does_not_collide() {
        let a = TestCase::new("a/main.sy", "a/main.out");
        let b = TestCase::new("b/main.sy", "b/main.out");
        assert_ne!(a.artifact_key(), b.artifact_key());
    }

    #[test]
    fn test_flattened_lookalikes_do_not_collide() {
        let a = TestCase::new("a_b/c.sy", "a_b/c.out").with_name("a_b/c.sy");
        let b = TestCase::new("a/b_c.sy", "a/b_c.out").with_name("a/b_c.sy");
        assert_eq!(readable(&a.artifact_key()), readable(&b.artifact_key()));
        assert_ne!(a.artifact_key(), b.artifact_key());

        let sy = TestCase::new("x.sy", "x.out");
        let c = TestCase::new("x.c", "x.out");
        assert_ne!(sy.artifact_key(), c.artifact_key());
    }

    #[test]
    fn test_deep_source_path_keeps_names_short() {
        let segment = "d".repeat(45);
        let mut source = PathBuf::from("/");
        for _ in 0..6 {
            source.push(&segment);
        }
        source.push("ok.sy");
        let tc = TestCase::new(&source, "ok.out");

        assert!(tc.ir_name().len() <= KEY_BASE_MAX + 1 + KEY_HASH_LEN + ".ll".len());
        assert!(tc.output_name().len() < 255);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "é".repeat(KEY_BASE_MAX);
        let cut = truncate_on_char_boundary(&long, KEY_BASE_MAX - 1);
        assert!(cut.len() <= KEY_BASE_MAX - 1);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::CompilationError.label(), "Compilation Error");
        assert_eq!(Verdict::Accepted.to_string(), "Accepted");
        assert_eq!(Verdict::WrongAnswer.label(), "Wrong Answer");
        assert_eq!(Verdict::Accepted.legacy_label(), "Accecpted");
        assert_eq!(Verdict::WrongAnswer.legacy_label(), "Wrong Answer");
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            results: vec![
                CaseResult {
                    source: "a.sy".into(),
                    outcome: StageOutcome::CompileFailed,
                    verdict: Verdict::CompilationError,
                },
                CaseResult {
                    source: "b.sy".into(),
                    outcome: StageOutcome::Ran { exit_code: 0, output: "b.out".into() },
                    verdict: Verdict::Accepted,
                },
            ],
        };
        assert_eq!(report.total(), 2);
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.count(Verdict::WrongAnswer), 0);
    }
}
