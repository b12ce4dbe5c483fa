//! Folds the progress stream into a per-task table for presentation.

use serde::Serialize;
use serde_json::Value;

use crate::events::{ProgressEvent, Stage};
use crate::task::{TaskId, TaskOutcome, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: TaskId,
    pub label: String,
    pub category: String,
    pub target_url: String,
    pub status: TaskStatus,
    pub live_session: Option<String>,
    pub steps: Vec<String>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
}

impl TaskRow {
    fn from_outcome(outcome: &TaskOutcome) -> Self {
        Self {
            id: outcome.id.clone(),
            label: outcome.label.clone(),
            category: outcome.category.clone(),
            target_url: outcome.target_url.clone(),
            status: outcome.status,
            live_session: outcome.live_session.clone(),
            steps: Vec::new(),
            result: outcome.result.clone(),
            error_message: outcome.error_message.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn last_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    /// In `task-connecting` order.
    pub rows: Vec<TaskRow>,
    pub stage: Option<Stage>,
    pub finished: bool,
    pub pipeline_error: Option<String>,
}

impl ClientState {
    pub fn row(&self, id: &TaskId) -> Option<&TaskRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }
}

fn open_row_mut<'a>(rows: &'a mut [TaskRow], id: &TaskId) -> Option<&'a mut TaskRow> {
    rows.iter_mut().find(|r| &r.id == id && !r.is_terminal())
}

/// Pure: returns the next state and leaves `state` untouched.
///
/// Events for unknown ids and for rows already terminal are ignored, as is
/// everything after the run finished.
pub fn reduce(state: &ClientState, event: &ProgressEvent) -> ClientState {
    let mut next = state.clone();
    if next.finished {
        return next;
    }

    match event {
        ProgressEvent::StageChanged { stage, .. } => {
            next.stage = Some(*stage);
        }
        ProgressEvent::TaskConnecting {
            task_id,
            target_url,
            label,
            category,
        } => {
            if next.row(task_id).is_none() {
                next.rows.push(TaskRow {
                    id: task_id.clone(),
                    label: label.clone(),
                    category: category.clone(),
                    target_url: target_url.clone(),
                    status: TaskStatus::Connecting,
                    live_session: None,
                    steps: Vec::new(),
                    result: None,
                    error_message: None,
                });
            }
        }
        ProgressEvent::TaskStep { task_id, step } => {
            if let Some(row) = open_row_mut(&mut next.rows, task_id) {
                row.steps.push(step.clone());
                if matches!(row.status, TaskStatus::Pending | TaskStatus::Connecting) {
                    row.status = TaskStatus::Running;
                }
            }
        }
        ProgressEvent::TaskLiveSession { task_id, url } => {
            if let Some(row) = open_row_mut(&mut next.rows, task_id) {
                if row.live_session.is_none() {
                    row.live_session = Some(url.clone());
                }
            }
        }
        ProgressEvent::TaskComplete { task_id, result } => {
            if let Some(row) = open_row_mut(&mut next.rows, task_id) {
                row.status = TaskStatus::Complete;
                row.result = Some(result.clone());
            }
        }
        ProgressEvent::TaskError {
            task_id,
            status,
            message,
        } => {
            if let Some(row) = open_row_mut(&mut next.rows, task_id) {
                row.status = match status {
                    TaskStatus::TimedOut => TaskStatus::TimedOut,
                    _ => TaskStatus::Error,
                };
                row.error_message = Some(message.clone());
            }
        }
        ProgressEvent::BatchComplete { results } => {
            for outcome in results {
                match next.rows.iter_mut().find(|r| r.id == outcome.id) {
                    Some(row) if !row.is_terminal() => {
                        row.status = outcome.status;
                        row.result = outcome.result.clone();
                        row.error_message = outcome.error_message.clone();
                    }
                    Some(_) => {}
                    None => next.rows.push(TaskRow::from_outcome(outcome)),
                }
            }
            next.stage = Some(Stage::Complete);
            next.finished = true;
        }
        ProgressEvent::PipelineError { message } => {
            next.pipeline_error = Some(message.clone());
            next.finished = true;
        }
    }
    next
}
