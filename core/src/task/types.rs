use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique per launched task; never reused across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(category: &str, index: usize) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{category}-{index}-{}", &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    Connecting,
    Running,
    Complete,
    Error,
    TimedOut,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::Error | TaskStatus::TimedOut | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Connecting => "connecting",
            TaskStatus::Running => "running",
            TaskStatus::Complete => "complete",
            TaskStatus::Error => "error",
            TaskStatus::TimedOut => "timed-out",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One automation task. Descriptive fields are public; lifecycle fields only
/// change through the transition methods in `transitions.rs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub target_url: String,
    pub goal_text: String,
    pub source_url: String,
    pub label: String,
    pub category: String,

    pub(super) status: TaskStatus,
    pub(super) live_session: Option<String>,
    pub(super) step_log: Vec<String>,
    pub(super) result: Option<Value>,
    pub(super) error_message: Option<String>,
}

impl Task {
    pub fn new(
        id: TaskId,
        target_url: impl Into<String>,
        goal_text: impl Into<String>,
        source_url: impl Into<String>,
        label: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            target_url: target_url.into(),
            goal_text: goal_text.into(),
            source_url: source_url.into(),
            label: label.into(),
            category: category.into(),
            status: TaskStatus::Pending,
            live_session: None,
            step_log: Vec::new(),
            result: None,
            error_message: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn live_session(&self) -> Option<&str> {
        self.live_session.as_deref()
    }

    pub fn step_log(&self) -> &[String] {
        &self.step_log
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn outcome(&self) -> TaskOutcome {
        TaskOutcome {
            id: self.id.clone(),
            status: self.status,
            target_url: self.target_url.clone(),
            source_url: self.source_url.clone(),
            label: self.label.clone(),
            category: self.category.clone(),
            live_session: self.live_session.clone(),
            steps: self.step_log.len(),
            result: self.result.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// Snapshot of a task as carried by `batch-complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub id: TaskId,
    pub status: TaskStatus,
    pub target_url: String,
    pub source_url: String,
    pub label: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_session: Option<String>,
    #[serde(default)]
    pub steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
