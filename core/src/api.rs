//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `fanline_core::api` instead of reaching into internal modules.

pub use crate::config::{
    get_fanline_data_dir, load_default, load_explicit, load_from_path, AppConfig, AutomationConfig,
    GithubSearchConfig, GoalModeKind, HttpServerConfig, LlmConfig, LoggingConfig, PacingKind,
    PipelineConfig, RetryConfig, SearchConfig, StackExchangeSearchConfig,
};
pub use crate::error::{CliError, ConfigError, PipelineError, ProviderError};
pub use crate::events::{EventSink, ProgressEvent, Stage};
pub use crate::pipeline::{
    normalize_target, BatchReport, GoalBuilder, GoalMode, GoalSpec, LlmPlanner, Pipeline,
    PipelineSettings, Plan, Planner, TemplateGoalBuilder, TextGenerator,
};
pub use crate::reducer::{reduce, ClientState, TaskRow};
pub use crate::retry::{BackoffPolicy, BackoffRetrier, RateLimitSignal};
pub use crate::runner::{
    classify, classify_line, launch, parse_event_line, AutomationProvider, AutomationRequest,
    EventByteStream, ProviderEvent, RunControl, RunnerSettings, TaskHandle, TaskRunner,
};
pub use crate::search::{
    dedupe_by_source_url, Pacing, SearchAggregator, SearchPage, SearchProvider, SearchQuery,
    SearchResult,
};
pub use crate::task::{Task, TaskId, TaskOutcome, TaskStatus};
pub use crate::util::{extract_json, LineBuffer, LineTooLong, MAX_LINE_BYTES};
