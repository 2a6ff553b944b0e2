use std::collections::BTreeMap;

use crate::task::{Task, TaskId};

/// In-memory task snapshots for one board, ordered by id.
///
/// Rendering reads this through the selectors in [`crate::query`]. It is
/// changed only by the optimistic reducer and by reconciliation with
/// server responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Child tasks of a story, ordered by id.
    pub fn children_of(&self, story_id: TaskId) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(move |t| t.parent_task_id == Some(story_id))
    }

    /// Insert or replace a task, returning the previous snapshot.
    pub fn upsert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id, task)
    }

    /// Replace the whole contents, as after a full re-fetch.
    pub fn replace_all(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.tasks = tasks.into_iter().map(|t| (t.id, t)).collect();
    }

    /// Snapshots of the given ids, skipping unknown ones.
    pub fn snapshot(&self, ids: &[TaskId]) -> Vec<Task> {
        ids.iter().filter_map(|id| self.get(*id)).cloned().collect()
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }
}

impl FromIterator<Task> for TaskStore {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self::from_tasks(iter)
    }
}
