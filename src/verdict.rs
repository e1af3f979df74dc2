//! Verdict enumeration and the final-verdict reduction rule.

use serde::{Deserialize, Serialize};

/// Outcome of a single testcase, or of a whole submission once reduced.
///
/// `WJ` is a sentinel for "not judged yet" and should never appear in a
/// [`crate::judge_result::JudgeResult`] yielded by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    WJ,
    SE,
    CE,
    NOF,
    WA,
    RE,
    TLE,
    MLE,
    AC,
}

/// Priority order used by [`decide_final_verdict`], highest first.
const PRIORITY_ORDER: [Verdict; 8] = [
    Verdict::WJ,
    Verdict::SE,
    Verdict::CE,
    Verdict::NOF,
    Verdict::WA,
    Verdict::RE,
    Verdict::TLE,
    Verdict::MLE,
];

impl Verdict {
    /// Short symbolic name, e.g. `"AC"`.
    pub fn short_name(&self) -> &'static str {
        match self {
            Verdict::WJ => "WJ",
            Verdict::SE => "SE",
            Verdict::CE => "CE",
            Verdict::NOF => "NOF",
            Verdict::WA => "WA",
            Verdict::RE => "RE",
            Verdict::TLE => "TLE",
            Verdict::MLE => "MLE",
            Verdict::AC => "AC",
        }
    }

    /// Long human-readable name, e.g. `"Accepted"`.
    pub fn long_name(&self) -> &'static str {
        match self {
            Verdict::WJ => "Waiting for Judge",
            Verdict::SE => "System Error",
            Verdict::CE => "Compilation Error",
            Verdict::NOF => "No Output File",
            Verdict::WA => "Wrong Answer",
            Verdict::RE => "Runtime Error",
            Verdict::TLE => "Time Limit Exceeded",
            Verdict::MLE => "Memory Limit Exceeded",
            Verdict::AC => "Accepted",
        }
    }

    pub fn is_ac(&self) -> bool {
        matches!(self, Verdict::AC)
    }
}

/// Reduces a collection of per-testcase verdicts to one overall verdict,
/// by returning the first verdict present (in priority order); `AC` if the
/// collection contains no other verdict in the priority order (including an
/// empty collection).
///
/// Idempotent and independent of the input order.
pub fn decide_final_verdict(verdicts: &[Verdict]) -> Verdict {
    for candidate in PRIORITY_ORDER {
        if verdicts.contains(&candidate) {
            return candidate;
        }
    }
    Verdict::AC
}
