//! Per-testcase judging result.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// Outcome of judging a single testcase.
///
/// `time == -1` or `memory == -1` means "unknown" (the sandbox did not
/// report it, e.g. on a compilation error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub verdict: Verdict,
    pub time: i64,
    pub memory: i64,
    #[serde(default)]
    pub message: String,
}

impl JudgeResult {
    /// The canonical `(WJ, -1, -1, "")` initial result.
    pub fn pending() -> Self {
        Self {
            verdict: Verdict::WJ,
            time: -1,
            memory: -1,
            message: String::new(),
        }
    }

    pub fn new(verdict: Verdict, time: i64, memory: i64, message: impl Into<String>) -> Self {
        Self {
            verdict,
            time,
            memory,
            message: message.into(),
        }
    }
}

impl Default for JudgeResult {
    fn default() -> Self {
        Self::pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pending_is_waiting_for_judge_with_unknown_time_and_memory() {
        let r = JudgeResult::pending();
        assert_eq!(r, JudgeResult::new(Verdict::WJ, -1, -1, ""));
    }

    #[test]
    fn document_round_trip() {
        let r = JudgeResult::new(Verdict::AC, 120, 4096, "");
        let doc = serde_json::to_string(&r).unwrap();
        let back: JudgeResult = serde_json::from_str(&doc).unwrap();
        assert_eq!(back, r);
    }
}
