use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::{TaskId, TaskOutcome, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Search,
    Execute,
    Complete,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Search => "search",
            Stage::Execute => "execute",
            Stage::Complete => "complete",
        }
    }
}

/// The unit streamed to the presentation layer.
///
/// Serialized as `{"kind": "task-step", "taskId": "...", ...}`; pipeline-level
/// kinds carry no `taskId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ProgressEvent {
    StageChanged {
        stage: Stage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
    TaskConnecting {
        task_id: TaskId,
        target_url: String,
        label: String,
        category: String,
    },
    TaskStep {
        task_id: TaskId,
        step: String,
    },
    TaskLiveSession {
        task_id: TaskId,
        url: String,
    },
    TaskComplete {
        task_id: TaskId,
        result: Value,
    },
    /// Also used for timeouts; `status` tells them apart.
    TaskError {
        task_id: TaskId,
        status: TaskStatus,
        message: String,
    },
    BatchComplete {
        results: Vec<TaskOutcome>,
    },
    PipelineError {
        message: String,
    },
}

impl ProgressEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::StageChanged { .. } => "stage-changed",
            ProgressEvent::TaskConnecting { .. } => "task-connecting",
            ProgressEvent::TaskStep { .. } => "task-step",
            ProgressEvent::TaskLiveSession { .. } => "task-live-session",
            ProgressEvent::TaskComplete { .. } => "task-complete",
            ProgressEvent::TaskError { .. } => "task-error",
            ProgressEvent::BatchComplete { .. } => "batch-complete",
            ProgressEvent::PipelineError { .. } => "pipeline-error",
        }
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            ProgressEvent::TaskConnecting { task_id, .. }
            | ProgressEvent::TaskStep { task_id, .. }
            | ProgressEvent::TaskLiveSession { task_id, .. }
            | ProgressEvent::TaskComplete { task_id, .. }
            | ProgressEvent::TaskError { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Last event of a run.
    pub fn ends_run(&self) -> bool {
        matches!(
            self,
            ProgressEvent::BatchComplete { .. } | ProgressEvent::PipelineError { .. }
        )
    }
}
