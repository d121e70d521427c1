//! Workflow progress steps.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

/// A named step in a workflow invocation. Ids start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStep {
    pub id: u32,
    pub label: String,
    pub status: StepStatus,
}

impl ProgressStep {
    pub fn new(id: u32, label: impl Into<String>, status: StepStatus) -> Self {
        Self {
            id,
            label: label.into(),
            status,
        }
    }

    pub fn pending(id: u32, label: impl Into<String>) -> Self {
        Self::new(id, label, StepStatus::Pending)
    }
}
