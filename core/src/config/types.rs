use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub automation: AutomationConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "fanline_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on concurrently launched tasks per run.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Queries requested from the planner for every search category.
    #[serde(default = "default_queries_per_category")]
    pub queries_per_category: usize,

    #[serde(default = "default_timeout_message")]
    pub timeout_message: String,
}

fn default_max_tasks() -> usize {
    10
}

fn default_task_timeout_secs() -> u64 {
    360
}

fn default_queries_per_category() -> usize {
    5
}

fn default_timeout_message() -> String {
    "Agent timed out after 6 minutes".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            task_timeout_secs: default_task_timeout_secs(),
            queries_per_category: default_queries_per_category(),
            timeout_message: default_timeout_message(),
        }
    }
}

impl PipelineConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Linear step: attempt N waits N × base_delay_ms when no hint is given.
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    5_000
}

fn default_retry_max_delay_ms() -> u64 {
    120_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingKind {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalModeKind {
    /// The agent visits the search result itself.
    Navigate,
    /// The agent reasons over result metadata from a neutral page.
    Reason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Gap between calls in a sequential category.
    #[serde(default = "default_sequential_delay_ms")]
    pub sequential_delay_ms: u64,

    #[serde(default)]
    pub github: GithubSearchConfig,

    #[serde(default)]
    pub stackexchange: StackExchangeSearchConfig,
}

fn default_sequential_delay_ms() -> u64 {
    2_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sequential_delay_ms: default_sequential_delay_ms(),
            github: GithubSearchConfig::default(),
            stackexchange: StackExchangeSearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub token: String,

    #[serde(default = "default_github_results_per_query")]
    pub results_per_query: usize,

    #[serde(default = "default_github_pacing")]
    pub pacing: PacingKind,

    #[serde(default = "default_github_goal_mode")]
    pub goal_mode: GoalModeKind,
}

fn default_true() -> bool {
    true
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_results_per_query() -> usize {
    8
}

fn default_github_pacing() -> PacingKind {
    PacingKind::Sequential
}

fn default_github_goal_mode() -> GoalModeKind {
    GoalModeKind::Navigate
}

impl Default for GithubSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_github_base_url(),
            token: String::new(),
            results_per_query: default_github_results_per_query(),
            pacing: default_github_pacing(),
            goal_mode: default_github_goal_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackExchangeSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_stackexchange_base_url")]
    pub base_url: String,

    #[serde(default = "default_stackexchange_site")]
    pub site: String,

    #[serde(default)]
    pub key: String,

    #[serde(default = "default_stackexchange_results_per_query")]
    pub results_per_query: usize,

    #[serde(default = "default_stackexchange_pacing")]
    pub pacing: PacingKind,

    #[serde(default = "default_stackexchange_goal_mode")]
    pub goal_mode: GoalModeKind,
}

fn default_stackexchange_base_url() -> String {
    "https://api.stackexchange.com/2.3".to_string()
}

fn default_stackexchange_site() -> String {
    "stackoverflow".to_string()
}

fn default_stackexchange_results_per_query() -> usize {
    10
}

fn default_stackexchange_pacing() -> PacingKind {
    PacingKind::Parallel
}

fn default_stackexchange_goal_mode() -> GoalModeKind {
    GoalModeKind::Reason
}

impl Default for StackExchangeSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_stackexchange_base_url(),
            site: default_stackexchange_site(),
            key: String::new(),
            results_per_query: default_stackexchange_results_per_query(),
            pacing: default_stackexchange_pacing(),
            goal_mode: default_stackexchange_goal_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_automation_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Forwarded as `browser_profile` when set (e.g. "stealth").
    #[serde(default)]
    pub browser_profile: Option<String>,

    /// Target used by `reason` goals, which need no real navigation.
    #[serde(default = "default_reasoning_target_url")]
    pub reasoning_target_url: String,
}

fn default_automation_url() -> String {
    "https://agent.tinyfish.ai/v1/automation/run-sse".to_string()
}

fn default_reasoning_target_url() -> String {
    "https://example.com".to_string()
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            base_url: default_automation_url(),
            api_key: String::new(),
            browser_profile: None,
            reasoning_target_url: default_reasoning_target_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_llm_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_llm_temperature() -> f32 {
    0.2
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}
