#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};

use fanline_core::api::{
    AutomationProvider, AutomationRequest, BackoffRetrier, EventByteStream, GoalMode, LlmPlanner,
    Pacing, Pipeline, PipelineSettings, ProgressEvent, ProviderError, RunnerSettings,
    SearchAggregator, SearchPage, SearchProvider, SearchResult, TemplateGoalBuilder,
    TextGenerator,
};

/// One scripted automation session: lines delivered after their delay, then
/// the stream either closes or stays open forever.
#[derive(Clone, Default)]
pub struct Script {
    pub lines: Vec<(Duration, String)>,
    pub hang: bool,
}

impl Script {
    pub fn completes(steps: &[&str], result: Value) -> Self {
        let mut lines: Vec<(Duration, String)> = steps
            .iter()
            .map(|s| (Duration::from_millis(100), json!({"type": "STEP", "purpose": s}).to_string()))
            .collect();
        lines.push((
            Duration::from_millis(100),
            json!({"type": "COMPLETE", "resultJson": result}).to_string(),
        ));
        Self { lines, hang: false }
    }

    pub fn errors(message: &str) -> Self {
        Self {
            lines: vec![(
                Duration::from_millis(50),
                json!({"type": "ERROR", "message": message}).to_string(),
            )],
            hang: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            lines: Vec::new(),
            hang: true,
        }
    }
}

/// Automation fake keyed by target URL. Unknown targets fail to start.
#[derive(Default)]
pub struct ScriptedAutomation {
    scripts: HashMap<String, Script>,
    pub started: Mutex<Vec<String>>,
}

impl ScriptedAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target_url: &str, script: Script) -> Self {
        self.scripts.insert(target_url.to_string(), script);
        self
    }
}

#[async_trait]
impl AutomationProvider for ScriptedAutomation {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start(&self, request: &AutomationRequest) -> Result<EventByteStream, ProviderError> {
        self.started
            .lock()
            .unwrap()
            .push(request.target_url.clone());
        let script = self
            .scripts
            .get(&request.target_url)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                url: request.target_url.clone(),
                body: "no script".into(),
            })?;

        let body = futures::stream::iter(script.lines).then(|(delay, line)| async move {
            tokio::time::sleep(delay).await;
            Ok::<Bytes, ProviderError>(Bytes::from(format!("data: {line}\n")))
        });
        if script.hang {
            Ok(Box::pin(body.chain(futures::stream::pending())))
        } else {
            Ok(Box::pin(body))
        }
    }
}

/// Replies in order; runs dry with an error.
pub struct CannedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl CannedLlm {
    pub fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }

    /// A brief followed by `queries` for the given `(text, target)` pairs.
    pub fn planning(queries: &[(&str, &str)]) -> Arc<Self> {
        let items: Vec<Value> = queries
            .iter()
            .map(|(q, t)| json!({"query": q, "target": t, "heuristic": "relevance"}))
            .collect();
        Self::new(vec![
            json!({"subject": "demo", "keywords": ["demo"]}).to_string(),
            json!({ "queries": items }).to_string(),
        ])
    }
}

#[async_trait]
impl TextGenerator for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Other("no canned reply left".into()))
    }
}

/// Returns the same URLs for every query.
pub struct FixedSearch {
    pub category: String,
    pub pacing: Pacing,
    pub urls: Vec<String>,
}

impl FixedSearch {
    pub fn new(category: &str, urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            category: category.to_string(),
            pacing: Pacing::Parallel,
            urls: urls.iter().map(|u| u.to_string()).collect(),
        })
    }
}

#[async_trait]
impl SearchProvider for FixedSearch {
    fn category(&self) -> &str {
        &self.category
    }

    fn pacing(&self) -> Pacing {
        self.pacing
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<SearchPage, ProviderError> {
        Ok(SearchPage::Results(
            self.urls
                .iter()
                .map(|u| SearchResult {
                    source_url: u.clone(),
                    title: u.trim_start_matches("https://").to_string(),
                    category: self.category.clone(),
                    snippet: String::new(),
                    metadata: json!({"url": u}),
                })
                .collect(),
        ))
    }
}

pub fn pipeline(
    llm: Arc<CannedLlm>,
    search: Vec<Arc<dyn SearchProvider>>,
    automation: Arc<ScriptedAutomation>,
    max_tasks: usize,
) -> Pipeline {
    let aggregator = SearchAggregator::new(search, BackoffRetrier::default(), max_tasks);
    let goals = TemplateGoalBuilder::new().with_mode(
        "forum",
        GoalMode::Reason {
            target_url: "https://example.com".into(),
        },
    );
    Pipeline::new(
        Arc::new(LlmPlanner::new(llm, 5)),
        aggregator,
        automation,
        Arc::new(goals),
        PipelineSettings {
            runner: RunnerSettings {
                timeout: Duration::from_secs(360),
                timeout_message: "Agent timed out after 6 minutes".into(),
                browser_profile: None,
                ..RunnerSettings::default()
            },
        },
    )
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn kinds(events: &[ProgressEvent]) -> Vec<&'static str> {
    events.iter().map(ProgressEvent::kind).collect()
}
