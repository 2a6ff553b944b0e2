//! Optimistic reducer.
//!
//! Applies a closed set of tagged actions to a [`TaskStore`], producing the
//! speculative view the board renders while a server call is in flight.
//! The reducer is pure: it never mutates its input and never talks to the
//! network. Unknown task ids are ignored.

use serde::{Deserialize, Serialize};

use crate::sprint::{SprintId, SprintRef};
use crate::store::TaskStore;
use crate::task::{TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OptimisticAction {
    /// Set the task's status.
    UpdateStatus { task_id: TaskId, status: TaskStatus },
    /// Put the task and its listed subtasks into the sprint. Subtasks in
    /// `BACKLOG` are promoted to `TODO`; other statuses are untouched.
    AddToSprint {
        task_id: TaskId,
        subtask_ids: Vec<TaskId>,
        sprint_id: SprintId,
        sprint_name: String,
    },
    /// Clear sprint membership. Status is left for the server to decide.
    RemoveFromSprint { task_ids: Vec<TaskId> },
}

impl OptimisticAction {
    /// Every task id the action may touch.
    pub fn task_ids(&self) -> Vec<TaskId> {
        match self {
            OptimisticAction::UpdateStatus { task_id, .. } => vec![*task_id],
            OptimisticAction::AddToSprint {
                task_id,
                subtask_ids,
                ..
            } => std::iter::once(*task_id)
                .chain(subtask_ids.iter().copied())
                .collect(),
            OptimisticAction::RemoveFromSprint { task_ids } => task_ids.clone(),
        }
    }
}

/// Apply `action` to `store`, returning the speculative store.
pub fn apply(store: &TaskStore, action: &OptimisticAction) -> TaskStore {
    let mut next = store.clone();
    apply_in_place(&mut next, action);
    next
}

/// Apply `actions` in order.
pub fn apply_all<'a>(
    store: &TaskStore,
    actions: impl IntoIterator<Item = &'a OptimisticAction>,
) -> TaskStore {
    let mut next = store.clone();
    for action in actions {
        apply_in_place(&mut next, action);
    }
    next
}

fn apply_in_place(store: &mut TaskStore, action: &OptimisticAction) {
    match action {
        OptimisticAction::UpdateStatus { task_id, status } => {
            if let Some(task) = store.get_mut(*task_id) {
                task.status = *status;
            }
        }
        OptimisticAction::AddToSprint {
            task_id,
            subtask_ids,
            sprint_id,
            sprint_name,
        } => {
            let sprint = SprintRef::new(*sprint_id, sprint_name.clone());
            if let Some(task) = store.get_mut(*task_id) {
                task.active_sprints = vec![sprint.clone()];
            }
            for subtask_id in subtask_ids {
                if let Some(subtask) = store.get_mut(*subtask_id) {
                    subtask.active_sprints = vec![sprint.clone()];
                    if subtask.status == TaskStatus::Backlog {
                        subtask.status = TaskStatus::Todo;
                    }
                }
            }
        }
        OptimisticAction::RemoveFromSprint { task_ids } => {
            for task_id in task_ids {
                if let Some(task) = store.get_mut(*task_id) {
                    task.active_sprints.clear();
                }
            }
        }
    }
}
