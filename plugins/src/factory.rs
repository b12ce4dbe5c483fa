//! Builds a ready-to-run `Pipeline` from `AppConfig`.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use fanline_core::api::{
    AppConfig, AutomationProvider, BackoffPolicy, BackoffRetrier, GoalMode, GoalModeKind,
    LlmPlanner, Pacing, PacingKind, Pipeline, PipelineSettings, Planner, RunnerSettings,
    SearchAggregator, SearchProvider, TemplateGoalBuilder,
};

use crate::automation::TinyfishAutomation;
use crate::llm::OpenRouterGenerator;
use crate::search::{GithubSearch, StackExchangeSearch};

pub fn pacing_for(kind: PacingKind, sequential_delay_ms: u64) -> Pacing {
    match kind {
        PacingKind::Parallel => Pacing::Parallel,
        PacingKind::Sequential => Pacing::Sequential {
            delay: Duration::from_millis(sequential_delay_ms),
        },
    }
}

/// Enabled providers in a fixed order: github, then stackoverflow.
pub fn build_search_providers(cfg: &AppConfig) -> Result<Vec<Arc<dyn SearchProvider>>> {
    let search = &cfg.search;
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
    if search.github.enabled {
        let pacing = pacing_for(search.github.pacing, search.sequential_delay_ms);
        providers.push(Arc::new(GithubSearch::new(&search.github, pacing)?));
    }
    if search.stackexchange.enabled {
        let pacing = pacing_for(search.stackexchange.pacing, search.sequential_delay_ms);
        providers.push(Arc::new(StackExchangeSearch::new(&search.stackexchange, pacing)?));
    }
    Ok(providers)
}

pub fn build_retrier(cfg: &AppConfig) -> BackoffRetrier {
    BackoffRetrier::new(BackoffPolicy::from(&cfg.retry))
}

pub fn build_planner(cfg: &AppConfig) -> Result<Arc<dyn Planner>> {
    let generator = Arc::new(OpenRouterGenerator::new(&cfg.llm)?);
    Ok(Arc::new(LlmPlanner::new(
        generator,
        cfg.pipeline.queries_per_category,
    )))
}

pub fn build_automation(cfg: &AppConfig) -> Result<Arc<dyn AutomationProvider>> {
    Ok(Arc::new(TinyfishAutomation::new(
        cfg.automation.base_url.clone(),
        cfg.automation.api_key.clone(),
    )?))
}

pub fn build_goal_builder(cfg: &AppConfig) -> TemplateGoalBuilder {
    let mode = |kind: GoalModeKind| match kind {
        GoalModeKind::Navigate => GoalMode::Navigate,
        GoalModeKind::Reason => GoalMode::Reason {
            target_url: cfg.automation.reasoning_target_url.clone(),
        },
    };
    TemplateGoalBuilder::new()
        .with_mode("github", mode(cfg.search.github.goal_mode))
        .with_mode("stackoverflow", mode(cfg.search.stackexchange.goal_mode))
}

pub fn pipeline_settings(cfg: &AppConfig) -> PipelineSettings {
    PipelineSettings {
        runner: RunnerSettings {
            timeout: cfg.pipeline.task_timeout(),
            timeout_message: cfg.pipeline.timeout_message.clone(),
            browser_profile: cfg.automation.browser_profile.clone(),
            ..RunnerSettings::default()
        },
    }
}

pub fn build_pipeline(cfg: &AppConfig) -> Result<Pipeline> {
    let providers = build_search_providers(cfg)?;
    if providers.is_empty() {
        anyhow::bail!("no search provider is enabled");
    }
    let search = SearchAggregator::new(providers, build_retrier(cfg), cfg.pipeline.max_tasks);
    tracing::debug!(
        target: "fanline.factory",
        categories = ?search.categories(),
        max_tasks = cfg.pipeline.max_tasks,
        "pipeline assembled"
    );

    Ok(Pipeline::new(
        build_planner(cfg)?,
        search,
        build_automation(cfg)?,
        Arc::new(build_goal_builder(cfg)),
        pipeline_settings(cfg),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanline_core::api::{GoalBuilder, SearchResult};
    use serde_json::json;

    fn result(category: &str) -> SearchResult {
        SearchResult {
            source_url: format!("https://{category}.example/item"),
            title: "item".into(),
            category: category.into(),
            snippet: String::new(),
            metadata: json!({}),
        }
    }

    #[test]
    fn default_config_registers_both_categories_in_order() {
        let providers = build_search_providers(&AppConfig::default()).unwrap();
        let cats: Vec<&str> = providers.iter().map(|p| p.category()).collect();
        assert_eq!(cats, vec!["github", "stackoverflow"]);
        assert_eq!(
            providers[0].pacing(),
            Pacing::Sequential {
                delay: Duration::from_millis(2_000)
            }
        );
        assert_eq!(providers[1].pacing(), Pacing::Parallel);
    }

    #[test]
    fn disabled_provider_is_skipped() {
        let mut cfg = AppConfig::default();
        cfg.search.github.enabled = false;
        let providers = build_search_providers(&cfg).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].category(), "stackoverflow");
    }

    #[test]
    fn no_providers_is_an_error() {
        let mut cfg = AppConfig::default();
        cfg.search.github.enabled = false;
        cfg.search.stackexchange.enabled = false;
        assert!(build_pipeline(&cfg).is_err());
    }

    #[test]
    fn goal_modes_follow_config() {
        let mut cfg = AppConfig::default();
        cfg.automation.reasoning_target_url = "https://neutral.example".into();
        let goals = build_goal_builder(&cfg);

        let gh = goals.build(&result("github"), &json!({}));
        assert_eq!(gh.target_url, "https://github.example/item");

        let so = goals.build(&result("stackoverflow"), &json!({}));
        assert_eq!(so.target_url, "https://neutral.example");
    }

    #[test]
    fn settings_carry_timeout_and_profile() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.task_timeout_secs = 90;
        cfg.automation.browser_profile = Some("stealth".into());
        let settings = pipeline_settings(&cfg);
        assert_eq!(settings.runner.timeout, Duration::from_secs(90));
        assert_eq!(settings.runner.browser_profile.as_deref(), Some("stealth"));
    }
}
