//! Source Code Unit: materializes user code into a box, compiles it when
//! the language needs that, and runs it under the isolate-compatible
//! sandbox binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::config::JudgeConfig;
use crate::language::Language;

/// The encoded lifecycle of [`SourceCode::run_args`]: absent, populated-but-
/// failed, or ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunArgs {
    Unprepared,
    FailedCompile(String),
    Ready(Vec<String>),
}

/// A piece of user (or grader) source code, together with everything needed
/// to prepare and run it inside a sandbox box.
pub struct SourceCode {
    pub code: String,
    pub language: Language,
    /// Base name for the materialized source file, without extension.
    pub file_name: String,
    /// AQA memory addresses to seed from stdin, in order.
    pub aqaasm_inputs: Vec<String>,
    /// AQA memory addresses to print after halt, in order.
    pub aqaasm_outputs: Vec<String>,
    /// When set, Python's `input()` ignores its prompt argument so a
    /// submission written against interactive stdin still reads cleanly.
    pub python_ignore_prompts: bool,
    run_args: RunArgs,
}

impl SourceCode {
    pub fn new(code: impl Into<String>, language: Language) -> Self {
        Self {
            code: code.into(),
            language,
            file_name: "code".to_string(),
            aqaasm_inputs: Vec::new(),
            aqaasm_outputs: Vec::new(),
            python_ignore_prompts: false,
            run_args: RunArgs::Unprepared,
        }
    }

    pub fn run_args(&self) -> &RunArgs {
        &self.run_args
    }

    /// Prepares the source inside `box_path`, writing files and compiling as
    /// the language requires. Idempotent: once `run_args` is set, later
    /// calls return immediately with the cached outcome. Returns the
    /// compilation diagnostic (empty string if none).
    pub fn prepare(&mut self, box_path: &Path, config: &JudgeConfig) -> Result<String> {
        match &self.run_args {
            RunArgs::Ready(_) => return Ok(String::new()),
            RunArgs::FailedCompile(_) => {
                return Ok("See error details in the first testcase.".to_string());
            }
            RunArgs::Unprepared => {}
        }

        match self.language {
            Language::PYTHON => self.prepare_python(box_path, config),
            Language::CPLUSPLUS => self.prepare_cpp(box_path, config),
            Language::AQAASM => self.prepare_aqaasm(box_path, config),
        }
    }

    fn prepare_python(&mut self, box_path: &Path, config: &JudgeConfig) -> Result<String> {
        let mut code = self.code.clone();
        if self.python_ignore_prompts {
            code = format!("TOPYC_INPUT = input; input = lambda _=0: TOPYC_INPUT()\n{code}");
        }
        let code_path = box_path.join(format!("{}.py", self.file_name));
        std::fs::write(&code_path, &code)
            .with_context(|| format!("writing source to {code_path:?}"))?;

        self.run_args = RunArgs::Ready(vec![
            config.python_path.to_string_lossy().into_owned(),
            format!("{}.py", self.file_name),
        ]);
        Ok(String::new())
    }

    fn prepare_cpp(&mut self, box_path: &Path, config: &JudgeConfig) -> Result<String> {
        let code_path = box_path.join(format!("{}.cpp", self.file_name));
        std::fs::write(&code_path, &self.code)
            .with_context(|| format!("writing source to {code_path:?}"))?;
        let exe_path = box_path.join(&self.file_name);

        let output = Command::new("g++")
            .args(&config.cpp_compile_flags)
            .arg("-o")
            .arg(&exe_path)
            .arg(&code_path)
            .output()
            .context("spawning g++")?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stderr.is_empty() {
            self.run_args = RunArgs::FailedCompile(stderr.clone());
            return Ok(stderr);
        }
        self.run_args = RunArgs::Ready(vec![self.file_name.clone()]);
        Ok(String::new())
    }

    fn prepare_aqaasm(&mut self, box_path: &Path, config: &JudgeConfig) -> Result<String> {
        let code_path = box_path.join(format!("{}.aqaasm", self.file_name));
        std::fs::write(&code_path, &self.code)
            .with_context(|| format!("writing source to {code_path:?}"))?;

        let interpreter_src = std::fs::read_to_string(&config.aqaasm_interpreter_path)
            .context("reading bundled AQA assembly interpreter")?;
        std::fs::write(box_path.join("aqaasm.py"), interpreter_src)
            .context("copying AQA assembly interpreter into box")?;

        let mut args = vec![
            config.python_path.to_string_lossy().into_owned(),
            "aqaasm.py".to_string(),
            format!("{}.aqaasm", self.file_name),
            "-i".to_string(),
        ];
        args.extend(self.aqaasm_inputs.iter().cloned());
        args.push("-o".to_string());
        args.extend(self.aqaasm_outputs.iter().cloned());

        self.run_args = RunArgs::Ready(args);
        Ok(String::new())
    }

    /// Invokes the sandbox on the prepared run-args, piping `input` over
    /// stdin. Returns `(stdout, error_digest, exit_code)`.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        config: &JudgeConfig,
        box_id: u32,
        metadata_path: &Path,
        time_limit_ms: u32,
        memory_limit_kb: u32,
        input: &str,
    ) -> Result<(String, String, i32)> {
        let run_args = match &self.run_args {
            RunArgs::Ready(args) => args,
            _ => bail!("run() called on a source that has not been prepared successfully"),
        };

        let time_limit_s = time_limit_ms / 1000;
        let wall_limit_s = time_limit_s + 1;

        let mut child = Command::new(&config.isolate_binary)
            .arg("--box-id")
            .arg(box_id.to_string())
            .arg("-M")
            .arg(metadata_path)
            .arg("-t")
            .arg(time_limit_s.to_string())
            .arg("-w")
            .arg(wall_limit_s.to_string())
            .arg("-m")
            .arg(memory_limit_kb.to_string())
            .arg("--run")
            .arg("--")
            .args(run_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawning isolate --run")?;

        // Writing all of stdin before reading stdout/stderr would deadlock once
        // either pipe fills its OS buffer: the child blocks on a full stdout
        // pipe while we're still blocked writing stdin, and neither side reads
        // the other. Write on a separate thread in parallel with
        // `wait_with_output`, the same interleaving `subprocess.run(input=...)`
        // gets from `communicate()`.
        let mut stdin = child.stdin.take().expect("stdin was requested as piped");
        let input = input.as_bytes().to_vec();
        let writer = std::thread::spawn(move || {
            let _ = stdin.write_all(&input);
        });

        let output = child
            .wait_with_output()
            .context("waiting for sandboxed process")?;
        let _ = writer.join();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let error_digest = self.error_digest(&stderr);

        Ok((stdout, error_digest, output.status.code().unwrap_or(-1)))
    }

    /// Derives the language-specific error summary from raw stderr. The
    /// sandbox tool appends a two-line summary of its own to stderr; that's
    /// dropped first.
    fn error_digest(&self, stderr: &str) -> String {
        let mut lines: Vec<&str> = stderr.split('\n').collect();
        for _ in 0..2 {
            lines.pop();
        }
        let trimmed = lines.join("\n");

        match self.language {
            Language::PYTHON => match trimmed.find("Traceback (most recent call last):") {
                Some(idx) => trimmed[idx..].to_string(),
                None => trimmed,
            },
            Language::AQAASM => {
                let last_token_is_line_number = trimmed
                    .split_whitespace()
                    .last()
                    .and_then(|tok| tok.parse::<usize>().ok());
                match last_token_is_line_number.and_then(|n| n.checked_sub(1)) {
                    Some(line_idx) => {
                        let marker = "Exception: ";
                        let message = trimmed
                            .rfind(marker)
                            .map(|idx| &trimmed[idx + marker.len()..])
                            .unwrap_or(trimmed.as_str());
                        let source_line = self.code.split('\n').nth(line_idx).unwrap_or("");
                        format!("{message}\n  Line {}:\n    {source_line}", line_idx + 1)
                    }
                    None => trimmed,
                }
            }
            Language::CPLUSPLUS => String::new(),
        }
    }
}
