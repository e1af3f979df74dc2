//! Sandbox Manager: acquires and releases isolate box identities.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::config::JudgeConfig;

/// Directory isolate keeps its boxes under; used only by [`Sandbox::cleanup_all`]
/// to discover ids to sweep.
const ISOLATE_ROOT: &str = "/var/local/lib/isolate";

/// A live sandbox box: an id in `[0, MAX_BOX)` and the working directory
/// `isolate --init` reported for it.
pub struct Sandbox {
    pub box_id: u32,
    pub box_path: PathBuf,
    isolate_binary: String,
}

impl Sandbox {
    /// Runs `isolate --version` once; turns a missing/broken binary into a
    /// clear error instead of a confusing first-acquisition failure.
    pub fn ensure_isolate_installed(config: &JudgeConfig) -> Result<()> {
        let ok = Command::new(&config.isolate_binary)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !ok {
            bail!("{} is not installed", config.isolate_binary);
        }
        Ok(())
    }

    /// Scans `box_id` from 0 upward, calling `isolate --box-id <id> --init`
    /// for each, until one succeeds. Fails with an error if all
    /// `config.max_box` ids are occupied.
    pub fn acquire(config: &JudgeConfig) -> Result<Self> {
        fs::create_dir_all(&config.metadata_folder).with_context(|| {
            format!("creating metadata folder {:?}", config.metadata_folder)
        })?;

        for box_id in 0..config.max_box {
            let output = Command::new(&config.isolate_binary)
                .arg("--box-id")
                .arg(box_id.to_string())
                .arg("--init")
                .output()
                .with_context(|| format!("spawning {} --init", config.isolate_binary))?;

            if !output.status.success() {
                log::info!("box {box_id} in use, trying next");
                continue;
            }

            let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if root.is_empty() {
                bail!(
                    "isolate --init produced empty stdout for box {box_id}; stderr={}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            let box_path = PathBuf::from(root).join("box");
            log::info!("box {box_id} available, created at {box_path:?}");
            return Ok(Self {
                box_id,
                box_path,
                isolate_binary: config.isolate_binary.clone(),
            });
        }

        bail!("all boxes full")
    }

    /// Releases the box. Safe to call more than once.
    pub fn cleanup(&self) {
        let result = Command::new(&self.isolate_binary)
            .arg("--box-id")
            .arg(self.box_id.to_string())
            .arg("--cleanup")
            .output();
        match result {
            Ok(out) if out.status.success() => log::info!("cleaned up box {}", self.box_id),
            _ => log::error!("failed to clean up box {}", self.box_id),
        }
    }

    /// Sweeps every id currently present under the isolate root, invoking
    /// `--cleanup` on each. Used to recover from a crashed process holding
    /// boxes open.
    pub fn cleanup_all(config: &JudgeConfig) -> Result<()> {
        let entries = match fs::read_dir(ISOLATE_ROOT) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context(format!("reading {ISOLATE_ROOT}")),
        };

        for entry in entries {
            let entry = entry.context("reading isolate root directory entry")?;
            let box_id = entry.file_name().to_string_lossy().into_owned();
            let _ = Command::new(&config.isolate_binary)
                .arg("--box-id")
                .arg(&box_id)
                .arg("--cleanup")
                .output();
        }
        Ok(())
    }

    /// Path to this box's metadata file, `<METADATA_FOLDER>/<box_id>.txt`.
    pub fn metadata_path(&self, config: &JudgeConfig) -> PathBuf {
        config.metadata_folder.join(format!("{}.txt", self.box_id))
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.cleanup();
    }
}
