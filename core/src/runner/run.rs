use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::classify::{classify_line, ProviderEvent};
use super::traits::{AutomationProvider, AutomationRequest};
use crate::events::{EventSink, ProgressEvent};
use crate::task::{Task, TaskStatus};
use crate::util::{LineBuffer, MAX_LINE_BYTES};

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub timeout: Duration,
    pub timeout_message: String,
    pub browser_profile: Option<String>,
    pub max_line_bytes: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        let cfg = crate::config::PipelineConfig::default();
        Self {
            timeout: cfg.task_timeout(),
            timeout_message: cfg.timeout_message,
            browser_profile: None,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

enum Verdict {
    Settled,
    TimedOut,
    Cancelled,
}

/// Drives exactly one task from `pending` to a terminal state.
pub struct TaskRunner {
    task: Task,
    provider: Arc<dyn AutomationProvider>,
    sink: EventSink,
    settings: RunnerSettings,
}

impl TaskRunner {
    pub fn new(
        task: Task,
        provider: Arc<dyn AutomationProvider>,
        sink: EventSink,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            task,
            provider,
            sink,
            settings,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Runs to a terminal state and hands the task back.
    ///
    /// The provider call races the timeout and `cancel`; the loser is dropped,
    /// which closes the provider stream. Cancellation emits nothing.
    #[tracing::instrument(name = "task", skip_all, fields(task_id = %self.task.id, category = %self.task.category))]
    pub async fn run(mut self, cancel: CancellationToken) -> Task {
        if cancel.is_cancelled() {
            self.task.cancel();
            return self.task;
        }

        self.task.begin_connecting();
        self.sink.emit(ProgressEvent::TaskConnecting {
            task_id: self.task.id.clone(),
            target_url: self.task.target_url.clone(),
            label: self.task.label.clone(),
            category: self.task.category.clone(),
        });
        tracing::debug!(target_url = %self.task.target_url, "task connecting");

        let request = AutomationRequest {
            target_url: self.task.target_url.clone(),
            goal: self.task.goal_text.clone(),
            browser_profile: self.settings.browser_profile.clone(),
        };

        let verdict = {
            let drive = drive(
                &mut self.task,
                self.provider.as_ref(),
                &self.sink,
                &request,
                self.settings.max_line_bytes,
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Verdict::Cancelled,
                _ = tokio::time::sleep(self.settings.timeout) => Verdict::TimedOut,
                _ = drive => Verdict::Settled,
            }
        };

        match verdict {
            Verdict::Settled => {}
            Verdict::Cancelled => {
                if self.task.cancel() {
                    tracing::info!("task cancelled");
                }
            }
            Verdict::TimedOut => {
                if self.task.time_out(self.settings.timeout_message.clone()) {
                    tracing::warn!(timeout_ms = self.settings.timeout.as_millis() as u64, "task timed out");
                    self.sink.emit(ProgressEvent::TaskError {
                        task_id: self.task.id.clone(),
                        status: TaskStatus::TimedOut,
                        message: self.settings.timeout_message.clone(),
                    });
                }
            }
        }

        self.task
    }
}

async fn drive(
    task: &mut Task,
    provider: &dyn AutomationProvider,
    sink: &EventSink,
    request: &AutomationRequest,
    max_line_bytes: usize,
) {
    let mut stream = match provider.start(request).await {
        Ok(s) => s,
        Err(e) => {
            fail(task, sink, e.to_string());
            return;
        }
    };

    let mut lines = LineBuffer::with_limit(max_line_bytes);
    while let Some(chunk) = stream.next().await {
        let completed = match chunk {
            Ok(bytes) => lines.push(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let completed = match completed {
            Ok(c) => c,
            Err(message) => {
                fail(task, sink, message);
                return;
            }
        };
        for line in completed {
            if apply_line(task, sink, &line) {
                return;
            }
        }
    }

    if let Some(line) = lines.finish() {
        if apply_line(task, sink, &line) {
            return;
        }
    }
    fail(task, sink, "stream ended without completion");
}

/// Applies one line; `true` once the task is terminal.
fn apply_line(task: &mut Task, sink: &EventSink, line: &str) -> bool {
    for event in classify_line(line) {
        match event {
            ProviderEvent::LiveSession { url } => {
                if task.record_live_session(url.clone()) {
                    sink.emit(ProgressEvent::TaskLiveSession {
                        task_id: task.id.clone(),
                        url,
                    });
                }
            }
            ProviderEvent::Step { message } => {
                if task.record_step(message.clone()) {
                    sink.emit(ProgressEvent::TaskStep {
                        task_id: task.id.clone(),
                        step: message,
                    });
                }
            }
            ProviderEvent::Completed { result } => {
                let result = normalize_result(result, task);
                if task.complete(result.clone()) {
                    tracing::info!(steps = task.step_log().len(), "task complete");
                    sink.emit(ProgressEvent::TaskComplete {
                        task_id: task.id.clone(),
                        result,
                    });
                }
                return true;
            }
            ProviderEvent::Failed { message } => {
                fail(task, sink, message);
                return true;
            }
            ProviderEvent::Unrecognized => {
                tracing::trace!(line, "unrecognized provider line");
            }
        }
    }
    false
}

fn fail(task: &mut Task, sink: &EventSink, message: impl Into<String>) {
    let message = message.into();
    if task.fail(message.clone()) {
        tracing::warn!(error = %message, "task failed");
        sink.emit(ProgressEvent::TaskError {
            task_id: task.id.clone(),
            status: TaskStatus::Error,
            message,
        });
    }
}

/// Object results take `sourceUrl` and `title` from the task when those are
/// absent, null or blank; `category` always comes from the task.
fn normalize_result(result: Value, task: &Task) -> Value {
    match result {
        Value::Object(mut map) => {
            fill_blank(&mut map, "sourceUrl", &task.source_url);
            fill_blank(&mut map, "title", &task.label);
            map.insert("category".into(), Value::String(task.category.clone()));
            Value::Object(map)
        }
        other => other,
    }
}

fn fill_blank(map: &mut serde_json::Map<String, Value>, key: &str, fallback: &str) {
    let blank = match map.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        map.insert(key.to_string(), Value::String(fallback.to_string()));
    }
}
