//! HTTP route handlers.

use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use fanline_core::api::{EventSink, RunControl, TaskId};

use crate::http::{models::*, state::AppState};

/// Response header carrying the id of a started run.
pub const RUN_ID_HEADER: &str = "x-run-id";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/runs", post(start_run_handler))
        .route("/api/v1/runs/:run_id/cancel", post(cancel_run_handler))
        .route(
            "/api/v1/runs/:run_id/tasks/:task_id/cancel",
            post(cancel_task_handler),
        )
        .route("/health", get(health_handler))
        .with_state(state)
}

/// POST /api/v1/runs - start a run and stream its progress as SSE.
///
/// The run is detached from the response: a client that disconnects stops
/// receiving events but the run finishes and leaves the registry on its own.
async fn start_run_handler(
    State(state): State<AppState>,
    Json(req): Json<StartRunRequest>,
) -> Result<impl IntoResponse, HttpServerError> {
    let request = req.request.trim().to_string();
    if request.is_empty() {
        return Err(HttpServerError::InvalidRequest("request is empty".into()));
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let control = RunControl::new();
    state.runs.insert(run_id.clone(), control.clone());
    {
        let mut stats = state.stats.write().unwrap_or_else(|e| e.into_inner());
        stats.runs_started += 1;
    }

    let (sink, mut rx) = EventSink::channel();
    let pipeline = state.pipeline.clone();
    let runs = state.runs.clone();
    let id = run_id.clone();
    tokio::spawn(async move {
        if let Err(e) = pipeline
            .run_with_id(id.clone(), &request, &sink, &control)
            .await
        {
            tracing::warn!(run_id = %id, error = %e, "run ended without a batch");
        }
        runs.remove(&id);
        if sink.dropped_count() > 0 {
            tracing::debug!(run_id = %id, dropped = sink.dropped_count(), "client left before the run finished");
        }
    });

    let events = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Event::default().event(event.kind()).json_data(&event);
        }
    };

    Ok((
        [(RUN_ID_HEADER, run_id)],
        Sse::new(events).keep_alive(KeepAlive::default()),
    ))
}

/// POST /api/v1/runs/:run_id/cancel
async fn cancel_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<CancelResponse>, HttpServerError> {
    let control = state
        .runs
        .get(&run_id)
        .ok_or_else(|| HttpServerError::NotFound(format!("run {run_id} is not active")))?;
    control.cancel_all();
    tracing::info!(run_id = %run_id, "run cancelled by client");

    Ok(Json(CancelResponse {
        success: true,
        run_id,
        task_id: None,
    }))
}

/// POST /api/v1/runs/:run_id/tasks/:task_id/cancel
async fn cancel_task_handler(
    State(state): State<AppState>,
    Path((run_id, task_id)): Path<(String, String)>,
) -> Result<Json<CancelResponse>, HttpServerError> {
    let control = state
        .runs
        .get(&run_id)
        .ok_or_else(|| HttpServerError::NotFound(format!("run {run_id} is not active")))?;
    if !control.cancel_task(&TaskId::from(task_id.as_str())) {
        return Err(HttpServerError::NotFound(format!(
            "task {task_id} is not active"
        )));
    }

    Ok(Json(CancelResponse {
        success: true,
        run_id,
        task_id: Some(task_id),
    }))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.stats.read().unwrap_or_else(|e| e.into_inner());

    Json(HealthResponse {
        status: "healthy".into(),
        uptime_seconds: stats.uptime_seconds(),
        active_runs: state.runs.len(),
        runs_started: stats.runs_started,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use fanline_core::api::{
        AutomationProvider, AutomationRequest, BackoffRetrier, EventByteStream, Pacing, Pipeline,
        PipelineError, PipelineSettings, Plan, Planner, ProviderError, SearchAggregator,
        SearchPage, SearchProvider, SearchQuery, SearchResult, TemplateGoalBuilder,
    };
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct OnePlan;

    #[async_trait]
    impl Planner for OnePlan {
        async fn plan(&self, _request: &str, _categories: &[String]) -> Result<Plan, PipelineError> {
            Ok(Plan {
                brief: json!({"subject": "web frameworks"}),
                queries: vec![SearchQuery::new("axum", "github")],
            })
        }
    }

    struct OneRepo;

    #[async_trait]
    impl SearchProvider for OneRepo {
        fn category(&self) -> &str {
            "github"
        }

        fn pacing(&self) -> Pacing {
            Pacing::Parallel
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<SearchPage, ProviderError> {
            Ok(SearchPage::Results(vec![SearchResult {
                source_url: "https://github.com/tokio-rs/axum".into(),
                title: "tokio-rs/axum".into(),
                category: "github".into(),
                snippet: String::new(),
                metadata: json!({}),
            }]))
        }
    }

    struct Agent {
        hang: bool,
    }

    #[async_trait]
    impl AutomationProvider for Agent {
        fn name(&self) -> &str {
            "agent"
        }

        async fn start(&self, _request: &AutomationRequest) -> Result<EventByteStream, ProviderError> {
            if self.hang {
                return Ok(Box::pin(futures::stream::pending::<Result<Bytes, ProviderError>>()));
            }
            let body = "data: {\"type\":\"STEP\",\"purpose\":\"open repo\"}\n\n\
                        data: {\"type\":\"COMPLETE\",\"resultJson\":{\"stars\":1}}\n\n";
            Ok(Box::pin(futures::stream::iter(vec![Ok(Bytes::from_static(
                body.as_bytes(),
            ))])))
        }
    }

    fn app(hang: bool) -> (Router, AppState) {
        let providers: Vec<Arc<dyn SearchProvider>> = vec![Arc::new(OneRepo)];
        let search = SearchAggregator::new(providers, BackoffRetrier::default(), 4);
        let pipeline = Pipeline::new(
            Arc::new(OnePlan),
            search,
            Arc::new(Agent { hang }),
            Arc::new(TemplateGoalBuilder::new()),
            PipelineSettings::default(),
        );
        let state = AppState::new(pipeline);
        (create_router(state.clone()), state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn run_streams_events_until_batch_complete() {
        let (router, state) = app(false);
        let resp = router
            .oneshot(post_json("/api/v1/runs", json!({"request": "compare web frameworks"})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(RUN_ID_HEADER));
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let connecting = text.find("event: task-connecting").unwrap();
        let step = text.find("event: task-step").unwrap();
        let done = text.find("event: batch-complete").unwrap();
        assert!(connecting < step && step < done);
        assert!(text.contains("\"stars\":1"));

        // The stream closes only after the run left the registry.
        assert!(state.runs.is_empty());
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let (router, state) = app(false);
        let resp = router
            .oneshot(post_json("/api/v1/runs", json!({"request": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.stats.read().unwrap().runs_started, 0);
    }

    #[tokio::test]
    async fn cancelling_a_run_settles_its_tasks() {
        let (router, _state) = app(true);
        let resp = router
            .clone()
            .oneshot(post_json("/api/v1/runs", json!({"request": "watch forever"})))
            .await
            .unwrap();
        let run_id = resp.headers()[RUN_ID_HEADER].to_str().unwrap().to_string();

        let mut body = resp.into_body().into_data_stream();
        let mut text = String::new();
        while !text.contains("event: task-connecting") {
            let chunk = body.next().await.unwrap().unwrap();
            text.push_str(&String::from_utf8_lossy(&chunk));
        }

        let cancel = router
            .clone()
            .oneshot(post_empty(&format!("/api/v1/runs/{run_id}/cancel")))
            .await
            .unwrap();
        assert_eq!(cancel.status(), StatusCode::OK);

        while let Some(chunk) = body.next().await {
            text.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
        }
        assert!(text.contains("event: batch-complete"));
        assert!(text.contains("\"status\":\"cancelled\""));
        assert!(!text.contains("event: task-error"));
    }

    #[tokio::test]
    async fn unknown_run_or_task_is_not_found() {
        let (router, state) = app(false);
        let resp = router
            .clone()
            .oneshot(post_empty("/api/v1/runs/nope/cancel"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        state.runs.insert("r1".into(), RunControl::new());
        let resp = router
            .oneshot(post_empty("/api/v1/runs/r1/tasks/github-0-deadbeef/cancel"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_active_runs() {
        let (router, state) = app(false);
        state.runs.insert("r1".into(), RunControl::new());
        let resp = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.active_runs, 1);
    }
}
