mod goal;
mod orchestrator;
mod plan;

pub use goal::{GoalBuilder, GoalMode, GoalSpec, TemplateGoalBuilder};
pub use orchestrator::{BatchReport, Pipeline, PipelineSettings};
pub use plan::{normalize_target, LlmPlanner, Plan, Planner, TextGenerator};
