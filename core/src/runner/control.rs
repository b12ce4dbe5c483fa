use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::run::TaskRunner;
use crate::task::{Task, TaskId};

/// Cancellation handle for one run: a root token plus one child token per
/// launched task. Holds no task state.
#[derive(Clone, Debug, Default)]
pub struct RunControl {
    root: CancellationToken,
    tasks: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<TaskId, CancellationToken>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.root
    }

    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancels the run and, through the token hierarchy, every task in it.
    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    /// Returns `false` when the task is unknown or already finished.
    pub fn cancel_task(&self, id: &TaskId) -> bool {
        match self.registry().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_tasks(&self) -> usize {
        self.registry().len()
    }

    fn register(&self, id: &TaskId) -> CancellationToken {
        let token = self.root.child_token();
        self.registry().insert(id.clone(), token.clone());
        token
    }

    fn forget(&self, id: &TaskId) {
        self.registry().remove(id);
    }
}

/// A launched runner.
pub struct TaskHandle {
    id: TaskId,
    cancel: CancellationToken,
    join: JoinHandle<Task>,
    fallback: Task,
    control: RunControl,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Cancels this task only; the rest of the run is untouched.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the runner to settle. Never fails: a runner that panicked
    /// settles as an error built from its pre-launch snapshot.
    pub async fn join(self) -> Task {
        let TaskHandle {
            id,
            join,
            mut fallback,
            control,
            ..
        } = self;
        let task = match join.await {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "task runner did not finish");
                fallback.fail(format!("task runner failed: {e}"));
                fallback
            }
        };
        control.forget(&id);
        task
    }
}

/// Spawns `runner` on its own tokio task under a child token of `control`.
pub fn launch(runner: TaskRunner, control: &RunControl) -> TaskHandle {
    let fallback = runner.task().clone();
    let id = fallback.id.clone();
    let cancel = control.register(&id);
    let join = tokio::spawn(runner.run(cancel.clone()));
    TaskHandle {
        id,
        cancel,
        join,
        fallback,
        control: control.clone(),
    }
}
