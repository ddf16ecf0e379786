/// Batch Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Run every test case through compile → link → execute → compare, strictly
/// in sequence, and record one verdict per case in input order.
///
/// **Architecture:**
/// 1. `RunDirectory` owns the on-disk workspace (workspace.rs)
/// 2. Engine stages drive the external tools (engine.rs)
/// 3. Evaluator compares outputs (evaluator.rs)
/// 4. Reporter writes the result log (reporter.rs)
///
/// Each case is an explicit state machine. A missing compile or link
/// artifact jumps straight to `Done` with `CompilationError`.

use crate::engine::{self, ProcessRunner, ToolRunner};
use crate::evaluator;
use crate::reporter::Reporter;
use crate::workspace::RunDirectory;
use anyhow::{Result, bail};
use irtest_common::config::HarnessConfig;
use irtest_common::types::{BatchReport, CaseResult, StageOutcome, TestCase, Verdict};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Per-case pipeline position
#[derive(Debug, Clone, PartialEq, Eq)]
enum CaseState {
    Compiling,
    Linking { ir: PathBuf },
    Executing { linked: PathBuf },
    Comparing { exit_code: i32, output: PathBuf },
    Done { outcome: StageOutcome, verdict: Verdict },
}

pub struct Harness<R: ToolRunner = ProcessRunner> {
    config: HarnessConfig,
    testcases: Vec<TestCase>,
    run_dir: RunDirectory,
    runner: R,
}

impl Harness<ProcessRunner> {
    /// Build a harness that launches real processes
    pub fn new(config: HarnessConfig, testcases: Vec<TestCase>) -> Result<Self> {
        Self::with_runner(config, testcases, ProcessRunner)
    }
}

impl<R: ToolRunner> Harness<R> {
    /// Validate the batch and create the run directory
    pub fn with_runner(config: HarnessConfig, testcases: Vec<TestCase>, runner: R) -> Result<Self> {
        validate_batch(&testcases)?;
        let run_dir = RunDirectory::create(&config.gen_dir, &testcases)?;
        Ok(Self {
            config,
            testcases,
            run_dir,
            runner,
        })
    }

    pub fn run_dir(&self) -> &RunDirectory {
        &self.run_dir
    }

    /// Run the whole batch, mirroring result lines to stdout if configured
    pub fn run(&self) -> Result<BatchReport> {
        let console: Option<Box<dyn Write>> = if self.config.console_log {
            Some(Box::new(std::io::stdout()))
        } else {
            None
        };
        self.run_with_console(console)
    }

    pub fn run_with_console(&self, console: Option<Box<dyn Write>>) -> Result<BatchReport> {
        let mut reporter = Reporter::create(&self.run_dir.result_log, self.run_dir.max_path_width)?
            .legacy_format(self.config.legacy_log_format);
        if let Some(console) = console {
            reporter = reporter.with_console(console);
        }

        info!(
            cases = self.testcases.len(),
            root = %self.run_dir.root.display(),
            echo_exit_code = self.config.echo_exit_code,
            "Starting batch"
        );

        let mut report = BatchReport::default();
        for testcase in &self.testcases {
            let (outcome, verdict) = self.run_case(testcase)?;
            reporter.record(&testcase.source, verdict)?;
            report.results.push(CaseResult {
                source: testcase.source.clone(),
                outcome,
                verdict,
            });
        }
        reporter.finish()?;

        info!(
            total = report.total(),
            accepted = report.accepted(),
            wrong_answer = report.count(Verdict::WrongAnswer),
            compilation_error = report.count(Verdict::CompilationError),
            result_log = %self.run_dir.result_log.display(),
            "Batch complete"
        );

        Ok(report)
    }

    /// Drive one case from `Compiling` to `Done`
    #[instrument(skip(self, testcase), fields(source = %testcase.source.display()))]
    fn run_case(&self, testcase: &TestCase) -> Result<(StageOutcome, Verdict)> {
        let mut state = CaseState::Compiling;
        loop {
            state = match self.step(testcase, state)? {
                CaseState::Done { outcome, verdict } => return Ok((outcome, verdict)),
                next => next,
            };
        }
    }

    fn step(&self, testcase: &TestCase, state: CaseState) -> Result<CaseState> {
        let next = match state {
            CaseState::Compiling => {
                let ir = self.run_dir.ir_path(testcase);
                if engine::compile(&self.runner, &self.config.compiler, &testcase.source, &ir)? {
                    CaseState::Linking { ir }
                } else {
                    CaseState::Done {
                        outcome: StageOutcome::CompileFailed,
                        verdict: Verdict::CompilationError,
                    }
                }
            }
            CaseState::Linking { ir } => {
                let linked = self.run_dir.linked_path(testcase);
                if engine::link(
                    &self.runner,
                    &self.config.linker,
                    &ir,
                    &self.config.runtime_library,
                    &linked,
                )? {
                    CaseState::Executing { linked }
                } else {
                    CaseState::Done {
                        outcome: StageOutcome::LinkFailed,
                        verdict: Verdict::CompilationError,
                    }
                }
            }
            CaseState::Executing { linked } => {
                let output = self.run_dir.output_path(testcase);
                let echo = testcase.echo_exit_code.unwrap_or(self.config.echo_exit_code);
                let exit_code = engine::execute(
                    &self.runner,
                    &self.config.interpreter,
                    &linked,
                    &output,
                    testcase.input_path(),
                    echo,
                )?;
                CaseState::Comparing { exit_code, output }
            }
            CaseState::Comparing { exit_code, output } => {
                let outcome = StageOutcome::Ran { exit_code, output };
                let verdict = evaluator::judge(&outcome, &testcase.expected_output)?;
                CaseState::Done { outcome, verdict }
            }
            done @ CaseState::Done { .. } => done,
        };
        Ok(next)
    }
}

/// Every source must be non-empty and every artifact key unique, since all
/// cases share one `ir/` and one `out/` directory
fn validate_batch(testcases: &[TestCase]) -> Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for testcase in testcases {
        if testcase.source.as_os_str().is_empty() {
            bail!("Test case has an empty source path");
        }
        let key = testcase.artifact_key();
        if let Some(previous) = seen.insert(key.clone(), &testcase.source) {
            bail!(
                "Test cases {} and {} both map to artifact name '{}'",
                previous.display(),
                testcase.source.display(),
                key
            );
        }
    }
    Ok(())
}
