//! Judge Driver: the top-level per-testcase judging loop and its dual,
//! answer generation.

use anyhow::{Context, Result};

use crate::checker::check_output;
use crate::config::JudgeConfig;
use crate::judge_result::JudgeResult;
use crate::metadata::{Metadata, decide_re_verdict};
use crate::sandbox::Sandbox;
use crate::source::{RunArgs, SourceCode};
use crate::testcase::Testcase;
use crate::verdict::Verdict;

/// A compilation error was already reported on an earlier testcase; every
/// subsequent testcase in the same run repeats this short message.
const REPEAT_CE_MESSAGE: &str = "See error details in the first testcase.";

/// Resource limits and optional collaborators for one judging operation.
pub struct JudgeOptions<'a> {
    pub time_limit_ms: u32,
    pub memory_limit_kb: u32,
    pub grader: Option<&'a mut SourceCode>,
    pub file_in: Option<&'a str>,
    pub file_out: Option<&'a str>,
}

impl<'a> JudgeOptions<'a> {
    pub fn new(time_limit_ms: u32, memory_limit_kb: u32) -> Self {
        Self {
            time_limit_ms,
            memory_limit_kb,
            grader: None,
            file_in: None,
            file_out: None,
        }
    }
}

/// Owns a sandbox for the duration of one judging operation and guarantees
/// its release (normal completion, early return, or an error) via `Drop`.
pub struct JudgeDriver {
    sandbox: Sandbox,
    config: JudgeConfig,
}

impl JudgeDriver {
    pub fn acquire(config: JudgeConfig) -> Result<Self> {
        Sandbox::ensure_isolate_installed(&config)?;
        let sandbox = Sandbox::acquire(&config)?;
        Ok(Self { sandbox, config })
    }

    /// Judges `source` against `testcases` one at a time, calling `on_result`
    /// after each. Stops early (without judging remaining testcases) if
    /// `on_result` returns `false`. The sandbox is released when this
    /// returns, whether by exhausting `testcases` or by early stop — and
    /// also if this returns early via `?`, since the sandbox is torn down
    /// by its own `Drop` impl.
    pub fn judge(
        &mut self,
        source: &mut SourceCode,
        testcases: &[Testcase],
        options: &mut JudgeOptions,
        mut on_result: impl FnMut(JudgeResult) -> bool,
    ) -> Result<()> {
        log::info!("judging code");
        if let Some(grader) = options.grader.as_deref_mut() {
            grader.file_name = "grader".to_string();
        }

        for testcase in testcases {
            let result = self.judge_one(source, &testcase.input, &testcase.answer, options)?;
            if !on_result(result) {
                break;
            }
        }
        log::info!("finished judging code");
        Ok(())
    }

    /// Runs `source` against each of `inputs`, calling `on_output` with the
    /// raw output and its classification Result. Used to generate reference
    /// answers rather than to grade them.
    pub fn get_outputs(
        &mut self,
        source: &mut SourceCode,
        inputs: &[String],
        options: &mut JudgeOptions,
        mut on_output: impl FnMut(String, JudgeResult) -> bool,
    ) -> Result<()> {
        log::info!("generating outputs");
        for input in inputs {
            let (output, result) = self.run_for_output(source, input, options)?;
            if !on_output(output, result) {
                break;
            }
        }
        log::info!("finished generating outputs");
        Ok(())
    }

    fn judge_one(
        &mut self,
        source: &mut SourceCode,
        input: &str,
        answer: &str,
        options: &mut JudgeOptions,
    ) -> Result<JudgeResult> {
        match self.run_code(source, input, options)? {
            RunOutcome::CompileFailed(message) => {
                Ok(JudgeResult::new(Verdict::CE, -1, -1, message))
            }
            RunOutcome::NoOutputFile => Ok(JudgeResult::new(Verdict::NOF, -1, -1, String::new())),
            RunOutcome::Ran {
                stdout,
                error,
                exit_code,
                metadata,
            } => {
                let (verdict, message) = if exit_code != 0 {
                    let verdict = decide_re_verdict(&metadata, options.memory_limit_kb as i64)?;
                    (verdict, error)
                } else if let Some(grader) = options.grader.as_deref_mut() {
                    let grader_input = format!("{input}\n{stdout}");
                    let verdict = self.run_grader(
                        grader,
                        &grader_input,
                        options.time_limit_ms,
                        options.memory_limit_kb,
                    )?;
                    (verdict, String::new())
                } else if check_output(&stdout, answer) {
                    (Verdict::AC, String::new())
                } else {
                    (Verdict::WA, String::new())
                };
                Ok(JudgeResult::new(
                    verdict,
                    metadata.time_ms(),
                    metadata.max_rss_kb(),
                    message,
                ))
            }
        }
    }

    fn run_for_output(
        &mut self,
        source: &mut SourceCode,
        input: &str,
        options: &mut JudgeOptions,
    ) -> Result<(String, JudgeResult)> {
        match self.run_code(source, input, options)? {
            RunOutcome::CompileFailed(message) => {
                Ok((String::new(), JudgeResult::new(Verdict::CE, -1, -1, message)))
            }
            RunOutcome::NoOutputFile => Ok((
                String::new(),
                JudgeResult::new(Verdict::NOF, -1, -1, String::new()),
            )),
            RunOutcome::Ran {
                stdout,
                error,
                exit_code,
                metadata,
            } => {
                let (verdict, message) = if exit_code != 0 {
                    (
                        decide_re_verdict(&metadata, options.memory_limit_kb as i64)?,
                        error,
                    )
                } else {
                    (Verdict::AC, String::new())
                };
                let result = JudgeResult::new(verdict, metadata.time_ms(), metadata.max_rss_kb(), message);
                Ok((stdout, result))
            }
        }
    }

    fn run_grader(
        &mut self,
        grader: &mut SourceCode,
        grader_input: &str,
        time_limit_ms: u32,
        memory_limit_kb: u32,
    ) -> Result<Verdict> {
        grader.prepare(&self.sandbox.box_path, &self.config)?;
        let metadata_path = self.sandbox.metadata_path(&self.config);
        let (grader_output, grader_error, grader_exit_code) = grader.run(
            &self.config,
            self.sandbox.box_id,
            &metadata_path,
            time_limit_ms,
            memory_limit_kb,
            grader_input,
        )?;

        if grader_exit_code != 0 {
            log::warn!("grader returned non-zero exit code with error: {grader_error}");
            return Ok(Verdict::SE);
        }
        if check_output(&grader_output, "AC") {
            Ok(Verdict::AC)
        } else if check_output(&grader_output, "WA") {
            Ok(Verdict::WA)
        } else {
            log::warn!("grader returned unexpected output: {grader_output}");
            Ok(Verdict::SE)
        }
    }

    /// Prepares and runs `source`, handling `file_in`/`file_out` redirection
    /// and translating the result into a shape the classifier can read
    /// without caring which path (compile failure, missing output file, or
    /// a completed run) produced it.
    fn run_code(
        &mut self,
        source: &mut SourceCode,
        input: &str,
        options: &JudgeOptions,
    ) -> Result<RunOutcome> {
        let compile_message = source.prepare(&self.sandbox.box_path, &self.config)?;
        if !compile_message.is_empty() {
            log::info!("compilation failed");
            let message = match source.run_args() {
                RunArgs::FailedCompile(_) => compile_message,
                _ => REPEAT_CE_MESSAGE.to_string(),
            };
            return Ok(RunOutcome::CompileFailed(message));
        }

        let mut stdin_input = input.to_string();
        if let Some(file_in) = options.file_in {
            std::fs::write(self.sandbox.box_path.join(file_in), input)
                .with_context(|| format!("writing {file_in} into box"))?;
            stdin_input.clear();
        }

        let metadata_path = self.sandbox.metadata_path(&self.config);
        let (mut stdout, error, exit_code) = source.run(
            &self.config,
            self.sandbox.box_id,
            &metadata_path,
            options.time_limit_ms,
            options.memory_limit_kb,
            &stdin_input,
        )?;

        if let Some(file_out) = options.file_out {
            let out_path = self.sandbox.box_path.join(file_out);
            match std::fs::read_to_string(&out_path) {
                Ok(contents) => stdout = contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::error!("user code does not produce output file: {file_out}");
                    return Ok(RunOutcome::NoOutputFile);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("reading output file {out_path:?}"));
                }
            }
        }

        if !error.is_empty() {
            log::info!("user code gave error: {error}");
        }

        let metadata = Metadata::read(&metadata_path).context("reading sandbox metadata file")?;
        Ok(RunOutcome::Ran {
            stdout,
            error,
            exit_code,
            metadata,
        })
    }
}

enum RunOutcome {
    CompileFailed(String),
    NoOutputFile,
    Ran {
        stdout: String,
        error: String,
        exit_code: i32,
        metadata: Metadata,
    },
}

/// Reduces a collection of per-testcase verdicts to a single overall
/// verdict; re-exported here for callers that only import `driver`.
pub fn decide_final_verdict(verdicts: &[Verdict]) -> Verdict {
    crate::verdict::decide_final_verdict(verdicts)
}
