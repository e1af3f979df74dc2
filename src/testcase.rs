//! Testcase data model.

use serde::{Deserialize, Serialize};

fn default_batch_number() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testcase {
    pub input: String,
    pub answer: String,
    #[serde(default = "default_batch_number")]
    pub batch_number: u32,
}

impl Testcase {
    pub fn new(input: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            answer: answer.into(),
            batch_number: default_batch_number(),
        }
    }
}
