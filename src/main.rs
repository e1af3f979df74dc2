use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use judge_core::config::JudgeConfig;
use judge_core::driver::{JudgeDriver, JudgeOptions};
use judge_core::language::Language;
use judge_core::source::SourceCode;
use judge_core::testcase::Testcase;
use judge_core::verdict::decide_final_verdict;

/// Judges a single submission, described by a JSON file, against its
/// testcases and prints one line per result plus the overall verdict.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct CliArgs {
    /// Path to a JSON submission file.
    submission: PathBuf,

    /// Overrides the submission's time limit, in milliseconds.
    #[arg(long)]
    time_limit_ms: Option<u32>,

    /// Overrides the submission's memory limit, in kilobytes.
    #[arg(long)]
    memory_limit_kb: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    code: String,
    language: Language,
    testcases: Vec<Testcase>,
    time_limit_ms: u32,
    memory_limit_kb: u32,
    #[serde(default)]
    grader: Option<String>,
    #[serde(default = "default_grader_language")]
    grader_language: Language,
    #[serde(default)]
    file_in: Option<String>,
    #[serde(default)]
    file_out: Option<String>,
}

fn default_grader_language() -> Language {
    Language::PYTHON
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = CliArgs::parse();
    let contents = fs::read_to_string(&args.submission)
        .with_context(|| format!("reading submission file {:?}", args.submission))?;
    let submission: Submission = serde_json::from_str(&contents)
        .with_context(|| format!("parsing submission file {:?}", args.submission))?;

    let config = JudgeConfig::from_env()?;
    let mut source = SourceCode::new(submission.code, submission.language);
    let mut grader = submission
        .grader
        .map(|code| SourceCode::new(code, submission.grader_language));

    let mut options = JudgeOptions::new(
        args.time_limit_ms.unwrap_or(submission.time_limit_ms),
        args.memory_limit_kb.unwrap_or(submission.memory_limit_kb),
    );
    options.grader = grader.as_mut();
    options.file_in = submission.file_in.as_deref();
    options.file_out = submission.file_out.as_deref();

    let mut driver = JudgeDriver::acquire(config)?;
    let mut verdicts = Vec::new();
    driver.judge(&mut source, &submission.testcases, &mut options, |result| {
        println!(
            "{:<4} time={:>6}ms memory={:>8}KB {}",
            result.verdict.short_name(),
            result.time,
            result.memory,
            result.message
        );
        verdicts.push(result.verdict);
        true
    })?;

    let overall = decide_final_verdict(&verdicts);
    println!("Overall: {} ({})", overall.short_name(), overall.long_name());

    Ok(())
}
