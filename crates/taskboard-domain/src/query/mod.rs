//! Board selectors.
//!
//! Pure derivations from a [`TaskStore`], recomputed on every render. Each
//! selector is a single pass over the store (or the given task set) and
//! returns borrowed tasks ordered by id.

pub mod board;

pub use board::{select_board_rows, select_stories, BoardRow};

use std::collections::BTreeMap;

use crate::sprint::SprintId;
use crate::store::TaskStore;
use crate::task::{Task, TaskId};

/// Tasks in no sprint. Subtasks of a story are left out: they are shown
/// nested under their story's card, not as rows of their own.
pub fn select_backlog_tasks(store: &TaskStore) -> Vec<&Task> {
    store
        .iter()
        .filter(|task| task.is_in_backlog())
        .filter(|task| !has_story_parent(store, task))
        .collect()
}

/// Tasks whose sprint membership includes `sprint_id`.
pub fn select_sprint_tasks(store: &TaskStore, sprint_id: SprintId) -> Vec<&Task> {
    store
        .iter()
        .filter(|task| task.is_in_sprint(sprint_id))
        .collect()
}

/// Story id → its subtasks, ordered by id.
pub fn select_subtask_map(store: &TaskStore) -> BTreeMap<TaskId, Vec<&Task>> {
    let mut map: BTreeMap<TaskId, Vec<&Task>> = BTreeMap::new();
    for task in store.iter() {
        if let Some(parent_id) = task.parent_task_id {
            map.entry(parent_id).or_default().push(task);
        }
    }
    map
}

/// Total estimation points of a set of tasks.
pub fn story_points(tasks: &[&Task]) -> u32 {
    tasks.iter().filter_map(|task| task.estimation_points).sum()
}

fn has_story_parent(store: &TaskStore, task: &Task) -> bool {
    task.parent_task_id
        .and_then(|parent_id| store.get(parent_id))
        .is_some_and(|parent| parent.is_story())
}
