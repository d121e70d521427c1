//! Step-by-step workflow progress.

use std::sync::{Arc, RwLock};

use super::events::{noop_sink, EventSink, WorkflowEvent};
use crate::types::{ProgressStep, StepStatus};

/// Appended to the label of a step interrupted by cancellation.
pub const STOPPED_SUFFIX: &str = " (Stopped)";

/// Step labels.
pub mod labels {
    pub fn preparing_analysis() -> String {
        "Preparing analysis...".into()
    }

    pub fn parsing(name: &str) -> String {
        format!("Reading: {name}")
    }

    pub fn generating(name: &str) -> String {
        format!("Generating insights for: {name}")
    }

    pub fn synthesizing(count: usize) -> String {
        format!("Synthesizing {count} papers/notes...")
    }

    pub fn finalizing() -> String {
        "Finalizing notes...".into()
    }

    pub fn preparing_search() -> String {
        "Preparing search...".into()
    }

    pub fn searching(platforms: &[String], query: &str) -> String {
        format!("Searching {} for: \"{query}\"", platforms.join("/"))
    }
}

/// Ordered step list for the current workflow, shared across tasks.
#[derive(Clone)]
pub struct ProgressTracker {
    steps: Arc<RwLock<Vec<ProgressStep>>>,
    sink: EventSink,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("steps", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(noop_sink())
    }
}

impl ProgressTracker {
    pub fn new(sink: EventSink) -> Self {
        Self {
            steps: Arc::new(RwLock::new(Vec::new())),
            sink,
        }
    }

    pub fn snapshot(&self) -> Vec<ProgressStep> {
        self.steps.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn status(&self, id: u32) -> Option<StepStatus> {
        self.steps
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.status)
    }

    /// Start a new workflow's step list.
    pub fn reset(&self, steps: Vec<ProgressStep>) {
        *self.steps.write().unwrap_or_else(|e| e.into_inner()) = steps.clone();
        (self.sink)(WorkflowEvent::ProgressReset { steps });
    }

    /// Move one step to `status`. Unknown ids are ignored.
    pub fn set_status(&self, id: u32, status: StepStatus) {
        let changed = {
            let mut steps = self.steps.write().unwrap_or_else(|e| e.into_inner());
            steps.iter_mut().find(|s| s.id == id).map(|step| {
                step.status = status;
                step.clone()
            })
        };
        if let Some(step) = changed {
            (self.sink)(WorkflowEvent::StepChanged { step });
        }
    }

    /// Fail every step still in progress.
    pub fn mark_in_progress_as_error(&self) {
        self.fail_in_progress(None);
    }

    /// Fail every step still in progress, tagging its label with `suffix`.
    pub fn mark_in_progress_as_stopped(&self, suffix: &str) {
        self.fail_in_progress(Some(suffix));
    }

    fn fail_in_progress(&self, suffix: Option<&str>) {
        let changed: Vec<ProgressStep> = {
            let mut steps = self.steps.write().unwrap_or_else(|e| e.into_inner());
            steps
                .iter_mut()
                .filter(|s| s.status == StepStatus::InProgress)
                .map(|step| {
                    step.status = StepStatus::Error;
                    if let Some(suffix) = suffix {
                        step.label.push_str(suffix);
                    }
                    step.clone()
                })
                .collect()
        };
        for step in changed {
            (self.sink)(WorkflowEvent::StepChanged { step });
        }
    }
}
