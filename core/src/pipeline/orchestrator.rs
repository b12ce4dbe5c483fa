use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::Instrument;

use super::goal::GoalBuilder;
use super::plan::{Plan, Planner};
use crate::error::PipelineError;
use crate::events::{EventSink, ProgressEvent, Stage};
use crate::runner::{launch, AutomationProvider, RunControl, RunnerSettings, TaskRunner};
use crate::search::{SearchAggregator, SearchResult};
use crate::task::{Task, TaskId, TaskOutcome};

/// Per-run knobs. The batch size lives on the [`SearchAggregator`], which
/// balances categories against it.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub runner: RunnerSettings,
}

/// Summary of a finished run. The same outcomes were already streamed in
/// `batch-complete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub query_count: usize,
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn count(&self, status: crate::task::TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Plan → Search → Execute → Complete for one request.
pub struct Pipeline {
    planner: Arc<dyn Planner>,
    search: SearchAggregator,
    automation: Arc<dyn AutomationProvider>,
    goals: Arc<dyn GoalBuilder>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        planner: Arc<dyn Planner>,
        search: SearchAggregator,
        automation: Arc<dyn AutomationProvider>,
        goals: Arc<dyn GoalBuilder>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            planner,
            search,
            automation,
            goals,
            settings,
        }
    }

    /// Runs one request to completion.
    ///
    /// Every run ends with exactly one `batch-complete` or `pipeline-error`
    /// on `sink`. Only planning failures and a cancel before Execute return
    /// `Err`; task and search failures are reported as data.
    pub async fn run(
        &self,
        request: &str,
        sink: &EventSink,
        control: &RunControl,
    ) -> Result<BatchReport, PipelineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.run_with_id(run_id, request, sink, control).await
    }

    /// Same as [`Pipeline::run`], for callers that must know the id before
    /// the run starts.
    pub async fn run_with_id(
        &self,
        run_id: String,
        request: &str,
        sink: &EventSink,
        control: &RunControl,
    ) -> Result<BatchReport, PipelineError> {
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_inner(run_id, request, sink, control)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: String,
        request: &str,
        sink: &EventSink,
        control: &RunControl,
    ) -> Result<BatchReport, PipelineError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let prepared = self.prepare(request, sink, control).await;
        let (plan, tasks) = match prepared {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "run aborted before execute");
                sink.emit(ProgressEvent::PipelineError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        sink.emit(ProgressEvent::StageChanged {
            stage: Stage::Execute,
            detail: Some(json!({ "tasks": tasks.len() })),
        });
        tracing::info!(stage = "execute", tasks = tasks.len(), "launching tasks");

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let runner = TaskRunner::new(
                    task,
                    self.automation.clone(),
                    sink.clone(),
                    self.settings.runner.clone(),
                );
                launch(runner, control)
            })
            .collect();

        // fan-in barrier; join never fails and keeps launch order
        let settled: Vec<Task> = join_all(handles.into_iter().map(|h| h.join())).await;
        let outcomes: Vec<TaskOutcome> = settled.iter().map(Task::outcome).collect();

        sink.emit(ProgressEvent::StageChanged {
            stage: Stage::Complete,
            detail: None,
        });
        sink.emit(ProgressEvent::BatchComplete {
            results: outcomes.clone(),
        });

        let report = BatchReport {
            run_id,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            query_count: plan.queries.len(),
            outcomes,
        };
        tracing::info!(
            stage = "complete",
            tasks = report.outcomes.len(),
            complete = report.count(crate::task::TaskStatus::Complete),
            duration_ms = report.duration_ms,
            dropped_events = sink.dropped_count(),
            "run finished"
        );
        Ok(report)
    }

    async fn prepare(
        &self,
        request: &str,
        sink: &EventSink,
        control: &RunControl,
    ) -> Result<(Plan, Vec<Task>), PipelineError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(PipelineError::Plan("request is empty".into()));
        }

        sink.emit(ProgressEvent::StageChanged {
            stage: Stage::Plan,
            detail: None,
        });
        let categories = self.search.categories();
        let plan = until_cancelled(control, self.planner.plan(request, &categories)).await??;

        sink.emit(ProgressEvent::StageChanged {
            stage: Stage::Search,
            detail: Some(json!({
                "brief": plan.brief,
                "queries": plan.queries,
            })),
        });
        tracing::info!(stage = "search", queries = plan.queries.len(), "searching");
        let mut results = until_cancelled(control, self.search.execute(&plan.queries)).await?;
        results.truncate(self.search.max_tasks());

        let tasks = results
            .iter()
            .enumerate()
            .map(|(i, r)| self.task_for(i, r, &plan))
            .collect();
        Ok((plan, tasks))
    }

    fn task_for(&self, index: usize, result: &SearchResult, plan: &Plan) -> Task {
        let spec = self.goals.build(result, &plan.brief);
        Task::new(
            TaskId::new(&result.category, index),
            spec.target_url,
            spec.goal,
            result.source_url.clone(),
            result.title.clone(),
            result.category.clone(),
        )
    }
}

async fn until_cancelled<F: Future>(control: &RunControl, fut: F) -> Result<F::Output, PipelineError> {
    if control.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = control.token().cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}
