//! 任务状态转换规则

use serde_json::Value;
use thiserror::Error;

use super::types::{Task, TaskStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("cannot transition from terminal state {state}")]
    FromTerminalState { state: TaskStatus },
}

/// 状态转换
pub struct TaskTransition;

impl TaskTransition {
    /// 验证状态转换是否合法
    pub fn validate(from: TaskStatus, to: TaskStatus) -> Result<(), TransitionError> {
        // 终态不能转换
        if from.is_terminal() {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = match (from, to) {
            (TaskStatus::Pending, TaskStatus::Connecting) => true,
            (TaskStatus::Connecting, TaskStatus::Running) => true,
            // 任意非终态都可以进入终态
            (_, to) if to.is_terminal() => true,
            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }
}

/// Every method returns `true` when the task changed. Once the task is
/// terminal all of them are no-ops returning `false`.
impl Task {
    fn advance(&mut self, to: TaskStatus) -> bool {
        match TaskTransition::validate(self.status, to) {
            Ok(()) => {
                self.status = to;
                true
            }
            Err(e) => {
                tracing::trace!(task_id = %self.id, error = %e, "transition ignored");
                false
            }
        }
    }

    pub fn begin_connecting(&mut self) -> bool {
        self.advance(TaskStatus::Connecting)
    }

    /// 追加步骤；首个步骤将 connecting 推进到 running
    pub fn record_step(&mut self, step: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        if self.status == TaskStatus::Connecting {
            self.advance(TaskStatus::Running);
        }
        self.step_log.push(step.into());
        true
    }

    /// 首个 live-session 句柄生效，之后的忽略
    pub fn record_live_session(&mut self, url: impl Into<String>) -> bool {
        if self.is_terminal() || self.live_session.is_some() {
            return false;
        }
        self.live_session = Some(url.into());
        true
    }

    pub fn complete(&mut self, result: Value) -> bool {
        if !self.advance(TaskStatus::Complete) {
            return false;
        }
        self.result = Some(result);
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.advance(TaskStatus::Error) {
            return false;
        }
        self.error_message = Some(message.into());
        true
    }

    pub fn time_out(&mut self, message: impl Into<String>) -> bool {
        if !self.advance(TaskStatus::TimedOut) {
            return false;
        }
        self.error_message = Some(message.into());
        true
    }

    pub fn cancel(&mut self) -> bool {
        self.advance(TaskStatus::Cancelled)
    }
}
