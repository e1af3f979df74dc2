//! Sandbox metadata file parsing and RE/TLE/MLE/SE classification.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::verdict::Verdict;

/// A parsed `key: value` metadata file. Keys not present are simply absent
/// from the map.
#[derive(Debug, Clone, Default)]
pub struct Metadata(HashMap<String, String>);

impl Metadata {
    pub fn parse(contents: &str) -> Self {
        let mut map = HashMap::new();
        for line in contents.lines() {
            if let Some((key, value)) = line.split_once(':') {
                map.insert(key.to_string(), value.trim().to_string());
            }
        }
        Self(map)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading metadata file {path:?}"))?;
        Ok(Self::parse(&contents))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// `time` in milliseconds, rounded, or `-1` if absent.
    pub fn time_ms(&self) -> i64 {
        self.get("time")
            .and_then(|v| v.parse::<f64>().ok())
            .map(|secs| (secs * 1000.0).round() as i64)
            .unwrap_or(-1)
    }

    /// `max-rss` in KB, or `-1` if absent.
    pub fn max_rss_kb(&self) -> i64 {
        self.get("max-rss")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(-1)
    }
}

/// Classifies a non-zero-exit run from its sandbox metadata.
/// `memory_limit_kb` is the testcase's memory limit.
///
/// Any `status` other than `XX`/`TO`/`RE`/`SG`/`OK` is a fatal classifier
/// error, surfaced as an infrastructure failure.
pub fn decide_re_verdict(metadata: &Metadata, memory_limit_kb: i64) -> Result<Verdict> {
    let status = metadata
        .get("status")
        .context("metadata is missing required `status` key for a non-zero exit")?;

    match status {
        "XX" => Ok(Verdict::SE),
        "TO" => Ok(Verdict::TLE),
        "RE" | "SG" => {
            let max_rss = metadata.max_rss_kb();
            if max_rss > 0 && (max_rss as f64) > memory_limit_kb as f64 * 0.8 {
                Ok(Verdict::MLE)
            } else {
                Ok(Verdict::RE)
            }
        }
        // Should not happen: status would not be OK if the exit code were non-zero.
        "OK" => Ok(Verdict::AC),
        other => bail!("unexpected metadata status {other:?}"),
    }
}
