mod transitions;
mod types;

pub use transitions::{TaskTransition, TransitionError};
pub use types::{Task, TaskId, TaskOutcome, TaskStatus};
