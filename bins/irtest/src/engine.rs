/// Execution Engine - External Toolchain Invocation
///
/// **Core Responsibility:**
/// Drive the compiler, linker and interpreter for one test case and capture
/// what they leave on disk.
///
/// **Architectural Boundary:**
/// - Engine knows HOW to run the tools (subprocesses, stdio wiring)
/// - Engine does NOT compare outputs or assign verdicts
/// - Compile/link success is judged by artifact presence, never exit code
///
/// All process launches go through [`ToolRunner`], so stages can be driven by
/// in-process stubs instead of a real toolchain.

use anyhow::{Context, Result};
use irtest_common::config::ToolCommand;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// A fully resolved tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Start from a configured tool, keeping its fixed leading arguments
    pub fn from_tool(tool: &ToolCommand) -> Self {
        Self {
            program: tool.command.clone(),
            args: tool.args.iter().map(OsString::from).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Seam between pipeline stages and the operating system
///
/// Both calls block until the tool terminates. An `Err` means the tool could
/// not be launched at all; a tool that runs and fails is an `Ok` exit code.
pub trait ToolRunner {
    /// Run with stdin closed and stdout/stderr discarded
    fn run_silent(&self, invocation: &Invocation) -> Result<i32>;

    /// Run with stdout written to `stdout`, stdin read from `stdin` if given
    /// (null otherwise), stderr discarded
    fn run_captured(&self, invocation: &Invocation, stdin: Option<File>, stdout: File)
        -> Result<i32>;
}

/// Production runner backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run_silent(&self, invocation: &Invocation) -> Result<i32> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to launch {}", invocation.program.display()))?;
        Ok(exit_code(status))
    }

    fn run_captured(
        &self,
        invocation: &Invocation,
        stdin: Option<File>,
        stdout: File,
    ) -> Result<i32> {
        let stdin = match stdin {
            Some(file) => Stdio::from(file),
            None => Stdio::null(),
        };
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(stdin)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to launch {}", invocation.program.display()))?;
        Ok(exit_code(status))
    }
}

/// Exit code as a shell would report it; signal deaths map to `-signo`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Compile one source file to IR
///
/// Returns `Ok(true)` iff `target` exists once the compiler has exited.
pub fn compile(
    runner: &dyn ToolRunner,
    compiler: &ToolCommand,
    source: &Path,
    target: &Path,
) -> Result<bool> {
    let invocation = Invocation::from_tool(compiler)
        .arg("-s")
        .arg(source)
        .arg("-emit-llvm")
        .arg(target);

    let code = runner
        .run_silent(&invocation)
        .with_context(|| format!("Compiler could not be run for {}", source.display()))?;
    debug!(source = %source.display(), exit_code = code, "Compiler exited");

    let produced = target.exists();
    if !produced {
        warn!(source = %source.display(), exit_code = code, "Compiler produced no IR");
    }
    Ok(produced)
}

/// Link IR with the runtime library into a self-contained artifact
///
/// Returns `Ok(true)` iff `target` exists once the linker has exited.
pub fn link(
    runner: &dyn ToolRunner,
    linker: &ToolCommand,
    ir: &Path,
    runtime_library: &Path,
    target: &Path,
) -> Result<bool> {
    let invocation = Invocation::from_tool(linker)
        .arg(ir)
        .arg(runtime_library)
        .arg("-o")
        .arg(target);

    let code = runner
        .run_silent(&invocation)
        .with_context(|| format!("Linker could not be run for {}", ir.display()))?;
    debug!(ir = %ir.display(), exit_code = code, "Linker exited");

    let produced = target.exists();
    if !produced {
        warn!(ir = %ir.display(), exit_code = code, "Linker produced no artifact");
    }
    Ok(produced)
}

/// Run a linked artifact, appending its stdout to `capture`
///
/// With `echo_exit_code`, the exit code is appended as a final line; a
/// newline separator goes first when the program printed anything. Returns
/// the exit code.
pub fn execute(
    runner: &dyn ToolRunner,
    interpreter: &ToolCommand,
    artifact: &Path,
    capture: &Path,
    input: Option<&Path>,
    echo_exit_code: bool,
) -> Result<i32> {
    let mut out_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(capture)
        .with_context(|| format!("Failed to open capture file {}", capture.display()))?;

    let in_file = match input {
        Some(path) => Some(
            File::open(path)
                .with_context(|| format!("Failed to open input file {}", path.display()))?,
        ),
        None => None,
    };

    let child_stdout = out_file
        .try_clone()
        .context("Failed to duplicate capture file handle")?;

    let invocation = Invocation::from_tool(interpreter).arg(artifact);
    let code = runner
        .run_captured(&invocation, in_file, child_stdout)
        .with_context(|| format!("Interpreter could not be run for {}", artifact.display()))?;
    debug!(artifact = %artifact.display(), exit_code = code, "Interpreter exited");

    if echo_exit_code {
        let captured_len = out_file
            .metadata()
            .with_context(|| format!("Failed to stat capture file {}", capture.display()))?
            .len();
        if captured_len > 0 {
            out_file.write_all(b"\n")?;
        }
        writeln!(out_file, "{}", code)
            .with_context(|| format!("Failed to append exit code to {}", capture.display()))?;
    }

    Ok(code)
}


#[cfg(test)]
mod tests {
    use super::stub::{toolchain, Call, Program, StubToolchain};
    use super::*;
    use std::fs;

    #[test]
    fn test_invocation_keeps_fixed_args_first() {
        let tool = ToolCommand::new("java").with_args(["-jar", "Cbias.jar"]);
        let inv = Invocation::from_tool(&tool).arg("-s").arg("a.sy");
        assert_eq!(inv.program, PathBuf::from("java"));
        assert_eq!(inv.args, vec!["-jar", "Cbias.jar", "-s", "a.sy"]);
    }

    #[test]
    fn test_compile_success_requires_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (cc, _, _) = toolchain();
        let stub = StubToolchain::default();
        let target = dir.path().join("a.ll");

        assert!(compile(&stub, &cc, Path::new("a.sy"), &target).unwrap());
        assert!(target.exists());
    }

    #[test]
    fn test_compile_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (cc, _, _) = toolchain();
        let stub = StubToolchain {
            broken_sources: vec!["a.sy".into()],
            ..Default::default()
        };

        let ok = compile(&stub, &cc, Path::new("a.sy"), &dir.path().join("a.ll")).unwrap();
        assert!(!ok);
        assert_eq!(stub.calls(), vec![Call::Compile("a.sy".into())]);
    }

    #[test]
    fn test_link_without_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_, ld, _) = toolchain();
        let stub = StubToolchain {
            broken_links: vec!["a.ll".into()],
            ..Default::default()
        };
        let ir = dir.path().join("a.ll");

        let ok = link(&stub, &ld, &ir, Path::new("sylib.ll"), &dir.path().join("a.bc")).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_launch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (cc, _, _) = toolchain();
        let stub = StubToolchain {
            missing: vec!["cc".into()],
            ..Default::default()
        };

        let err = compile(&stub, &cc, Path::new("a.sy"), &dir.path().join("a.ll")).unwrap_err();
        assert!(format!("{:#}", err).contains("Compiler could not be run"));
    }

    fn run_program(program: Program, echo: bool) -> (i32, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, run) = toolchain();
        let mut stub = StubToolchain::default();
        stub.programs.insert("p.bc".into(), program);
        let capture = dir.path().join("p.out");

        let code = execute(&stub, &run, Path::new("p.bc"), &capture, None, echo).unwrap();
        (code, fs::read(&capture).unwrap())
    }

    #[test]
    fn test_echo_after_output_adds_separator() {
        let (code, captured) = run_program(
            Program { stdout: b"hi".to_vec(), exit_code: 0, echo_stdin: false },
            true,
        );
        assert_eq!(code, 0);
        assert_eq!(captured, b"hi\n0\n");
    }

    #[test]
    fn test_echo_on_empty_output_has_no_separator() {
        let (code, captured) = run_program(
            Program { stdout: Vec::new(), exit_code: 1, echo_stdin: false },
            true,
        );
        assert_eq!(code, 1);
        assert_eq!(captured, b"1\n");
    }

    #[test]
    fn test_echo_disabled_keeps_raw_output() {
        let (_, captured) = run_program(
            Program { stdout: b"hi\n".to_vec(), exit_code: 3, echo_stdin: false },
            false,
        );
        assert_eq!(captured, b"hi\n");
    }

    #[test]
    fn test_empty_capture_still_created_without_echo() {
        let (_, captured) = run_program(Program::default(), false);
        assert!(captured.is_empty());
    }

    #[test]
    fn test_input_file_is_wired_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, run) = toolchain();
        let mut stub = StubToolchain::default();
        stub.programs.insert(
            "p.bc".into(),
            Program { stdout: Vec::new(), exit_code: 0, echo_stdin: true },
        );
        let input = dir.path().join("p.in");
        fs::write(&input, "5 7").unwrap();
        let capture = dir.path().join("p.out");

        execute(&stub, &run, Path::new("p.bc"), &capture, Some(&input), true).unwrap();
        assert_eq!(fs::read(&capture).unwrap(), b"5 7\n0\n");
    }

    #[test]
    fn test_capture_is_appended_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, run) = toolchain();
        let mut stub = StubToolchain::default();
        stub.programs.insert(
            "p.bc".into(),
            Program { stdout: b"x".to_vec(), exit_code: 0, echo_stdin: false },
        );
        let capture = dir.path().join("p.out");
        fs::write(&capture, "old").unwrap();

        execute(&stub, &run, Path::new("p.bc"), &capture, None, false).unwrap();
        assert_eq!(fs::read(&capture).unwrap(), b"oldx");
    }

    #[test]
    fn test_missing_input_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, run) = toolchain();
        let stub = StubToolchain::default();

        let result = execute(
            &stub,
            &run,
            Path::new("p.bc"),
            &dir.path().join("p.out"),
            Some(&dir.path().join("absent.in")),
            true,
        );
        assert!(result.is_err());
        assert!(stub.calls().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reports_exit_code() {
        let runner = ProcessRunner;
        let inv = Invocation::from_tool(&ToolCommand::new("sh").with_args(["-c", "exit 7"]));
        assert_eq!(runner.run_silent(&inv).unwrap(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_captures_stdout_with_echo() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("p.out");
        let sh = ToolCommand::new("sh").with_args(["-c", "printf hi; exit 2", "sh"]);

        let code = execute(&ProcessRunner, &sh, Path::new("ignored"), &capture, None, true).unwrap();
        assert_eq!(code, 2);
        assert_eq!(fs::read(&capture).unwrap(), b"hi\n2\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_maps_signal_to_negative_code() {
        let inv = Invocation::from_tool(&ToolCommand::new("sh").with_args(["-c", "kill -SEGV $$"]));
        assert_eq!(ProcessRunner.run_silent(&inv).unwrap(), -11);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_is_echoed_as_negative_code() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("p.out");
        let sh = ToolCommand::new("sh").with_args(["-c", "kill -SEGV $$", "sh"]);

        let code = execute(&ProcessRunner, &sh, Path::new("ignored"), &capture, None, true).unwrap();
        assert_eq!(code, -11);
        assert_eq!(fs::read(&capture).unwrap(), b"-11\n");
    }

    #[test]
    fn test_process_runner_missing_binary_is_error() {
        let inv = Invocation::from_tool(&ToolCommand::new("/nonexistent/irtest-tool"));
        assert!(ProcessRunner.run_silent(&inv).is_err());
    }
}
