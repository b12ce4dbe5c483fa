use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use fanline_core::api::{reduce, ClientState, ProgressEvent, TaskId, TaskRow, TaskStatus};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Terminal view of one run: a stage line plus one spinner per task.
///
/// All display state is derived from the folded [`ClientState`], so bars
/// never disagree with what `reduce` decided.
pub struct ProgressRenderer {
    multi: MultiProgress,
    stage: ProgressBar,
    task_bars: HashMap<TaskId, ProgressBar>,
    state: ClientState,
    enabled: bool,
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_TICKS)
}

fn icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Complete => "✅",
        TaskStatus::Error => "❌",
        TaskStatus::TimedOut => "⏱",
        TaskStatus::Cancelled => "⏹",
        TaskStatus::Pending | TaskStatus::Connecting | TaskStatus::Running => "⏳",
    }
}

fn row_message(row: &TaskRow) -> String {
    if row.is_terminal() {
        let detail = row
            .error_message
            .as_deref()
            .unwrap_or_else(|| row.status.as_str());
        return format!("{} {} ({})", icon(row.status), row.label, detail);
    }
    match row.last_step() {
        Some(step) => format!("{} {} › {}", icon(row.status), row.label, step),
        None => format!("{} {} [{}]", icon(row.status), row.label, row.status),
    }
}

impl ProgressRenderer {
    /// `enabled = false` folds events without drawing anything.
    pub fn new(enabled: bool) -> Self {
        let multi = MultiProgress::new();
        let stage = if enabled {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(spinner_style("[{elapsed_precise}] {spinner:.cyan} {msg}"));
            bar.set_message("starting");
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            stage,
            task_bars: HashMap::new(),
            state: ClientState::default(),
            enabled,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        self.state = reduce(&self.state, event);
        if self.enabled {
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        if let Some(stage) = self.state.stage {
            let done = self.state.rows.iter().filter(|r| r.is_terminal()).count();
            self.stage.set_message(format!(
                "{} · {}/{} tasks settled",
                stage.as_str(),
                done,
                self.state.rows.len()
            ));
        }

        for row in &self.state.rows {
            let bar = self.task_bars.entry(row.id.clone()).or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style("  {spinner:.green} {msg}"));
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            });
            if bar.is_finished() {
                continue;
            }
            if row.is_terminal() {
                bar.finish_with_message(row_message(row));
            } else {
                bar.set_message(row_message(row));
            }
        }

        if self.state.finished {
            let msg = match &self.state.pipeline_error {
                Some(err) => format!("❌ {err}"),
                None => format!(
                    "✅ {} complete, {} failed",
                    self.state.count(TaskStatus::Complete),
                    self.state.rows.len() - self.state.count(TaskStatus::Complete)
                ),
            };
            self.stage.finish_with_message(msg);
        }
    }

    pub fn finish(mut self) -> ClientState {
        for (_, bar) in self.task_bars.drain() {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
        if !self.stage.is_finished() {
            self.stage.finish_and_clear();
        }
        std::mem::take(&mut self.state)
    }
}

/// Plain-text report of a folded run, one block per task.
pub fn summary(state: &ClientState) -> String {
    let mut out = String::new();
    if let Some(err) = &state.pipeline_error {
        let _ = writeln!(out, "pipeline error: {err}");
        return out;
    }

    for row in &state.rows {
        let _ = writeln!(out, "[{}] {} <{}>", row.status, row.label, row.target_url);
        if let Some(url) = &row.live_session {
            let _ = writeln!(out, "    live: {url}");
        }
        match (&row.result, &row.error_message) {
            (Some(result), _) => {
                let _ = writeln!(out, "    result: {result}");
            }
            (None, Some(err)) => {
                let _ = writeln!(out, "    error: {err}");
            }
            (None, None) => {}
        }
    }
    let _ = writeln!(
        out,
        "{} tasks: {} complete, {} error, {} timed out, {} cancelled",
        state.rows.len(),
        state.count(TaskStatus::Complete),
        state.count(TaskStatus::Error),
        state.count(TaskStatus::TimedOut),
        state.count(TaskStatus::Cancelled),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanline_core::api::Stage;
    use serde_json::json;

    fn connecting(id: &str, label: &str) -> ProgressEvent {
        ProgressEvent::TaskConnecting {
            task_id: TaskId::from(id),
            target_url: format!("https://example.com/{id}"),
            label: label.into(),
            category: "github".into(),
        }
    }

    #[test]
    fn hidden_renderer_still_folds_events() {
        let mut r = ProgressRenderer::new(false);
        r.apply(&ProgressEvent::StageChanged {
            stage: Stage::Execute,
            detail: None,
        });
        r.apply(&connecting("a", "tokio"));
        r.apply(&ProgressEvent::TaskStep {
            task_id: TaskId::from("a"),
            step: "reading README".into(),
        });
        r.apply(&ProgressEvent::TaskComplete {
            task_id: TaskId::from("a"),
            result: json!({"stars": 1}),
        });

        let state = r.finish();
        assert_eq!(state.stage, Some(Stage::Execute));
        assert_eq!(state.rows[0].status, TaskStatus::Complete);
        assert_eq!(state.rows[0].steps, vec!["reading README".to_string()]);
    }

    #[test]
    fn enabled_renderer_handles_a_full_run() {
        let mut r = ProgressRenderer::new(true);
        r.apply(&connecting("a", "tokio"));
        r.apply(&connecting("b", "smol"));
        r.apply(&ProgressEvent::TaskError {
            task_id: TaskId::from("b"),
            status: TaskStatus::TimedOut,
            message: "Agent timed out after 6 minutes".into(),
        });
        r.apply(&ProgressEvent::PipelineError {
            message: "late".into(),
        });
        let state = r.finish();
        assert!(state.finished);
        assert_eq!(state.rows[1].status, TaskStatus::TimedOut);
    }

    #[test]
    fn row_messages_reflect_status() {
        let mut r = ProgressRenderer::new(false);
        r.apply(&connecting("a", "tokio"));
        assert_eq!(row_message(&r.state().rows[0]), "⏳ tokio [connecting]");

        r.apply(&ProgressEvent::TaskStep {
            task_id: TaskId::from("a"),
            step: "scrolling".into(),
        });
        assert_eq!(row_message(&r.state().rows[0]), "⏳ tokio › scrolling");

        r.apply(&ProgressEvent::TaskError {
            task_id: TaskId::from("a"),
            status: TaskStatus::Error,
            message: "boom".into(),
        });
        assert_eq!(row_message(&r.state().rows[0]), "❌ tokio (boom)");
    }

    #[test]
    fn summary_lists_rows_and_totals() {
        let mut r = ProgressRenderer::new(false);
        r.apply(&connecting("a", "tokio"));
        r.apply(&ProgressEvent::TaskLiveSession {
            task_id: TaskId::from("a"),
            url: "https://live.example/1".into(),
        });
        r.apply(&ProgressEvent::TaskComplete {
            task_id: TaskId::from("a"),
            result: json!({"ok": true}),
        });
        let text = summary(r.state());
        assert!(text.contains("[complete] tokio <https://example.com/a>"));
        assert!(text.contains("live: https://live.example/1"));
        assert!(text.contains("result: {\"ok\":true}"));
        assert!(text.contains("1 tasks: 1 complete, 0 error"));
    }

    #[test]
    fn summary_of_failed_run_is_the_error() {
        let state = reduce(
            &ClientState::default(),
            &ProgressEvent::PipelineError {
                message: "planning failed: empty plan".into(),
            },
        );
        assert_eq!(summary(&state), "pipeline error: planning failed: empty plan\n");
    }
}
