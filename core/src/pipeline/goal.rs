use std::collections::HashMap;

use serde_json::Value;

use crate::search::SearchResult;

/// What the automation agent is sent for one search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalSpec {
    pub target_url: String,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalMode {
    /// Visit the result URL and read it.
    Navigate,
    /// Reason over the result metadata; the agent is parked on `target_url`.
    Reason { target_url: String },
}

pub trait GoalBuilder: Send + Sync {
    fn build(&self, result: &SearchResult, brief: &Value) -> GoalSpec;
}

/// Default templates, one mode per category. Unlisted categories navigate.
#[derive(Debug, Clone, Default)]
pub struct TemplateGoalBuilder {
    modes: HashMap<String, GoalMode>,
}

impl TemplateGoalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, category: impl Into<String>, mode: GoalMode) -> Self {
        self.modes.insert(category.into(), mode);
        self
    }

    fn mode_for(&self, category: &str) -> GoalMode {
        self.modes
            .get(category)
            .cloned()
            .unwrap_or(GoalMode::Navigate)
    }
}

impl GoalBuilder for TemplateGoalBuilder {
    fn build(&self, result: &SearchResult, brief: &Value) -> GoalSpec {
        match self.mode_for(&result.category) {
            GoalMode::Navigate => GoalSpec {
                target_url: result.source_url.clone(),
                goal: navigate_goal(result, brief),
            },
            GoalMode::Reason { target_url } => GoalSpec {
                target_url,
                goal: reason_goal(result, brief),
            },
        }
    }
}

fn brief_lines(brief: &Value) -> String {
    let list = |key: &str| -> String {
        brief
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "none".to_string())
    };
    let subject = brief
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or("unspecified");
    format!(
        "SUBJECT: {subject}\nENTITIES: {}\nKEYWORDS: {}\nCRITERIA: {}",
        list("entities"),
        list("keywords"),
        list("criteria")
    )
}

const RESULT_SHAPE: &str = r#"Return a JSON object with these exact keys:
{
  "title": "page title",
  "sourceUrl": "the page URL",
  "relevanceScore": 0-100,
  "summary": "2-3 sentences explaining how this page relates to the request",
  "highlights": ["short relevant excerpts, max 500 chars each"]
}"#;

fn navigate_goal(result: &SearchResult, brief: &Value) -> String {
    format!(
        "You are evaluating a web page for how well it matches a request.\n\n\
         {brief}\n\n\
         INSTRUCTIONS:\n\
         1. Open {url} and read ONLY the main content. Do NOT follow links to other pages.\n\
         2. Extract what the page covers and any examples it shows.\n\
         3. Score relevance 0-100 against the criteria above.\n\n\
         {RESULT_SHAPE}\n\n\
         If nothing on the page is relevant, set relevanceScore to 0.",
        brief = brief_lines(brief),
        url = result.source_url,
    )
}

fn reason_goal(result: &SearchResult, brief: &Value) -> String {
    let snippet = if result.snippet.trim().is_empty() {
        "No excerpt available"
    } else {
        result.snippet.trim()
    };
    format!(
        "You are a reasoning agent judging a search result for how well it matches a request.\n\n\
         You do NOT need to navigate anywhere. All the information you need is below.\n\n\
         RESULT:\n\
         - Title: {title}\n\
         - URL: {url}\n\
         - Excerpt: {snippet}\n\
         - Metadata: {meta}\n\n\
         {brief}\n\n\
         Score relevance 0-100 from the data above.\n\n\
         {RESULT_SHAPE}",
        title = result.title,
        url = result.source_url,
        meta = result.metadata,
        brief = brief_lines(brief),
    )
}
