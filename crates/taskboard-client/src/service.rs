use async_trait::async_trait;
use taskboard_core::BoardResult;
use taskboard_domain::{Task, TaskId, TaskPatch};

/// The task persistence API the board talks to.
///
/// `update_task` is the single point of truth for whether a move actually
/// happened: it returns the full authoritative task, including the
/// recomputed sprint membership, or an error carrying a message for the
/// user.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Apply `patch` to a task and return the server's version of it.
    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> BoardResult<Task>;

    /// Fetch every task the board shows. Used when a board opens and to
    /// re-sync after drift.
    async fn fetch_tasks(&self) -> BoardResult<Vec<Task>>;
}
