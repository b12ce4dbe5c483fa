use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PipelineError, ProviderError};
use crate::search::SearchQuery;
use crate::util::extract_json;

/// Remote text generation: one prompt pair in, one raw completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Structured analysis of the request, handed to goal templates.
    pub brief: Value,
    pub queries: Vec<SearchQuery>,
}

#[async_trait]
pub trait Planner: Send + Sync {
    /// Any error is fatal to the run.
    async fn plan(&self, request: &str, categories: &[String]) -> Result<Plan, PipelineError>;
}

const ANALYZE_PROMPT: &str = r#"You are an analysis assistant.
Read the user's request and describe what they are looking for.

Identify:
1. The main subject or technology
2. Key libraries, products, or entities mentioned
3. Concrete keywords a search engine would match
4. What a strong result must demonstrate

Do NOT return any URLs. Only analyze the request.

Return ONLY a JSON object with this exact shape (no markdown, no explanation):
{
  "subject": "...",
  "entities": ["..."],
  "keywords": ["..."],
  "criteria": ["..."]
}"#;

fn queries_prompt(categories: &[String], per_category: usize) -> String {
    let targets = categories
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"You are a search query strategist.
Given the structured analysis of a request, generate keyword search queries.

Requirements:
- Generate exactly {per_category} queries for each target: {targets}
- Keep queries SHORT (2-4 words). Shorter queries return more results.
- Do NOT write full sentences.
- For each query give the target and a ranking heuristic.

Do NOT return any URLs.

Return ONLY a JSON object with this exact shape (no markdown, no explanation):
{{
  "queries": [
    {{ "query": "search terms", "target": "one of the targets", "heuristic": "what makes a good result" }}
  ]
}}"#
    )
}

/// Maps a model-supplied target onto a known category, comparing lowercase
/// names without spaces, underscores, or hyphens. Unknown targets fall back to
/// the first category.
pub fn normalize_target(target: &str, categories: &[String]) -> Option<String> {
    fn squash(s: &str) -> String {
        s.chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect()
    }

    let wanted = squash(target);
    let hit = categories.iter().find(|c| squash(c) == wanted).or_else(|| {
        categories.iter().find(|c| {
            let known = squash(c);
            !wanted.is_empty() && (wanted.contains(&known) || known.contains(&wanted))
        })
    });
    hit.or_else(|| categories.first()).cloned()
}

/// Two-call planner: analyze the request into a brief, then derive
/// `per_category` queries for every category from that brief.
pub struct LlmPlanner {
    generator: Arc<dyn TextGenerator>,
    per_category: usize,
}

impl LlmPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>, per_category: usize) -> Self {
        Self {
            generator,
            per_category: per_category.max(1),
        }
    }

    async fn analyze(&self, request: &str) -> Result<Value, PipelineError> {
        let raw = self.generator.generate(ANALYZE_PROMPT, request).await?;
        let brief = extract_json(&raw)
            .map_err(|e| PipelineError::Plan(format!("analysis response unusable: {e}")))?;
        if !brief.is_object() {
            return Err(PipelineError::Plan(
                "analysis response is not a JSON object".into(),
            ));
        }
        Ok(brief)
    }

    async fn queries(
        &self,
        brief: &Value,
        categories: &[String],
    ) -> Result<Vec<SearchQuery>, PipelineError> {
        let system = queries_prompt(categories, self.per_category);
        let user = serde_json::to_string_pretty(brief)
            .map_err(|e| PipelineError::Plan(e.to_string()))?;
        let raw = self.generator.generate(&system, &user).await?;
        let parsed = extract_json(&raw)
            .map_err(|e| PipelineError::Plan(format!("query response unusable: {e}")))?;

        let items = parsed
            .get("queries")
            .and_then(Value::as_array)
            .ok_or_else(|| PipelineError::Plan("response has no queries array".into()))?;

        let mut kept: Vec<SearchQuery> = Vec::new();
        for item in items {
            let Some(text) = item
                .get("query")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
            else {
                continue;
            };
            let target = item.get("target").and_then(Value::as_str).unwrap_or_default();
            let Some(category) = normalize_target(target, categories) else {
                continue;
            };
            let taken = kept.iter().filter(|q| q.category == category).count();
            if taken < self.per_category {
                kept.push(SearchQuery::new(text, category));
            }
        }

        if kept.is_empty() {
            return Err(PipelineError::Plan("response contains no usable query".into()));
        }
        // group by category, in category order
        kept.sort_by_key(|q| categories.iter().position(|c| *c == q.category));
        Ok(kept)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, request: &str, categories: &[String]) -> Result<Plan, PipelineError> {
        if categories.is_empty() {
            return Err(PipelineError::Plan("no search categories registered".into()));
        }
        let brief = self.analyze(request).await?;
        tracing::debug!(generator = self.generator.name(), "analysis brief ready");
        let queries = self.queries(&brief, categories).await?;
        tracing::info!(queries = queries.len(), "plan ready");
        Ok(Plan { brief, queries })
    }
}
