//! Process-wide configuration, threaded explicitly rather than read from
//! ambient globals.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Contents of the bundled AQA assembly interpreter, baked into the binary
/// so the crate doesn't depend on an external checkout at runtime.
const AQAASM_INTERPRETER_SOURCE: &str = include_str!("../assets/aqaasm.py");

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Absolute path to a Python interpreter (`PYTHON_PATH`, or a
    /// development default when `DEV=1`).
    pub python_path: PathBuf,
    /// Path to the bundled AQA assembly interpreter script, materialized
    /// into the filesystem once so it can be copied into each box.
    pub aqaasm_interpreter_path: PathBuf,
    /// `CPP_COMPILE_FLAGS`, tokenized on whitespace.
    pub cpp_compile_flags: Vec<String>,
    /// Maximum number of concurrent sandboxes (`MAX_BOX`).
    pub max_box: u32,
    /// Directory metadata files are written to; created if absent.
    pub metadata_folder: PathBuf,
    /// Name (or path) of the `isolate`-compatible sandbox binary to invoke.
    /// Overridable so tests can substitute a stand-in on `PATH`.
    pub isolate_binary: String,
}

impl JudgeConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let python_path = if env::var("DEV").as_deref() == Ok("1") {
            PathBuf::from("/usr/bin/python3")
        } else {
            PathBuf::from(
                env::var("PYTHON_PATH").context("PYTHON_PATH is not set and DEV != 1")?,
            )
        };

        let cpp_compile_flags = env::var("CPP_COMPILE_FLAGS")
            .unwrap_or_else(|_| "-static -std=c++2a -s -O2".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let metadata_folder = env::var("METADATA_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("metadata"));
        fs::create_dir_all(&metadata_folder)
            .with_context(|| format!("creating metadata folder {metadata_folder:?}"))?;

        let aqaasm_interpreter_path = match env::var("AQAASM_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_interpreter_path()?,
        };
        ensure_interpreter_script(&aqaasm_interpreter_path)?;

        let max_box = env::var("MAX_BOX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let isolate_binary = env::var("ISOLATE_BIN").unwrap_or_else(|_| "isolate".to_string());

        Ok(Self {
            python_path,
            aqaasm_interpreter_path,
            cpp_compile_flags,
            max_box,
            metadata_folder,
            isolate_binary,
        })
    }
}

/// Default location for the materialized AQA interpreter script, under the
/// platform's cache directory (grounded on the teacher's
/// `ProjectDirs`-based cache/data directory resolution).
fn default_interpreter_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", "judge_core")
        .context("unable to resolve a project cache directory")?;
    let cache_dir = proj_dirs.cache_dir();
    fs::create_dir_all(cache_dir).with_context(|| format!("creating cache dir {cache_dir:?}"))?;
    Ok(cache_dir.join("aqaasm.py"))
}

/// Writes the bundled interpreter source to `path` if it isn't already
/// there (or is stale), so every box copy starts from the same contents.
fn ensure_interpreter_script(path: &PathBuf) -> Result<()> {
    let up_to_date = fs::read_to_string(path)
        .map(|existing| existing == AQAASM_INTERPRETER_SOURCE)
        .unwrap_or(false);
    if !up_to_date {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating parent dir for {path:?}"))?;
        }
        fs::write(path, AQAASM_INTERPRETER_SOURCE)
            .with_context(|| format!("writing AQA interpreter script to {path:?}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_interpreter_script_writes_once_and_is_idempotent() {
        let dir = tempdir("ensure_once");
        let path = dir.join("aqaasm.py");

        ensure_interpreter_script(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(first, AQAASM_INTERPRETER_SOURCE);

        // Tamper with it, then re-ensure: it should be rewritten back.
        fs::write(&path, "tampered").unwrap();
        ensure_interpreter_script(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), AQAASM_INTERPRETER_SOURCE);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cpp_flags_tokenize_on_whitespace() {
        let flags = "-static  -std=c++2a -s -O2"
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();
        assert_eq!(flags, vec!["-static", "-std=c++2a", "-s", "-O2"]);
    }

    fn tempdir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("judge_core_config_test_{label}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
