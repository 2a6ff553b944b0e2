use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use taskboard_core::{BoardError, BoardResult};
use taskboard_domain::{
    FieldUpdate, Sprint, SprintId, SprintRef, Task, TaskId, TaskPatch, TaskStatus,
};

use crate::service::TaskService;

/// In-process stand-in for the task API.
///
/// Patches are applied the way the backend applies them: adding a story to
/// a sprint brings its backlog subtasks along, removing a task from its
/// sprint sends it (and a story's subtasks) back to `BACKLOG`, and a
/// story's sprint membership is recomputed from its subtasks.
///
/// The state change happens when the request arrives; any configured delay
/// is spent before the response is returned. Queued delays therefore let
/// tests deliver responses out of order.
#[derive(Debug, Default)]
pub struct InMemoryTaskService {
    state: Mutex<ServerState>,
}

#[derive(Debug, Default)]
struct ServerState {
    tasks: BTreeMap<TaskId, Task>,
    sprints: BTreeMap<SprintId, Sprint>,
    failures: VecDeque<BoardError>,
    delays: VecDeque<Duration>,
    latency: Duration,
    calls: Vec<(TaskId, TaskPatch)>,
}

impl InMemoryTaskService {
    pub fn new(
        sprints: impl IntoIterator<Item = Sprint>,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Self {
        let state = ServerState {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            sprints: sprints.into_iter().map(|s| (s.id, s)).collect(),
            ..ServerState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Delay applied to every response.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = latency;
        self
    }

    /// Fail the next request with `error` without changing any state.
    pub fn fail_next(&self, error: BoardError) {
        self.state.lock().failures.push_back(error);
    }

    /// Delay the response of the next request by `delay` instead of the
    /// default latency.
    pub fn delay_next(&self, delay: Duration) {
        self.state.lock().delays.push_back(delay);
    }

    /// Every `update_task` call received, in arrival order.
    pub fn calls(&self) -> Vec<(TaskId, TaskPatch)> {
        self.state.lock().calls.clone()
    }

    pub fn task(&self, task_id: TaskId) -> Option<Task> {
        self.state.lock().tasks.get(&task_id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.values().cloned().collect()
    }

    pub fn sprints(&self) -> Vec<Sprint> {
        self.state.lock().sprints.values().cloned().collect()
    }

    /// Change server-side data behind the board's back.
    pub fn put_task(&self, task: Task) {
        self.state.lock().tasks.insert(task.id, task);
    }
}

#[async_trait]
impl TaskService for InMemoryTaskService {
    async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> BoardResult<Task> {
        let (result, delay) = {
            let mut state = self.state.lock();
            state.calls.push((task_id, patch.clone()));
            let delay = state.delays.pop_front().unwrap_or(state.latency);
            let failure = state.failures.pop_front();
            let result = match failure {
                Some(error) => Err(error),
                None => state.apply_patch(task_id, &patch),
            };
            (result, delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match &result {
            Ok(task) => tracing::debug!("Server updated task {}: {:?}", task_id, task.status),
            Err(e) => tracing::debug!("Server rejected update of task {}: {}", task_id, e),
        }
        result
    }

    async fn fetch_tasks(&self) -> BoardResult<Vec<Task>> {
        let (tasks, delay) = {
            let mut state = self.state.lock();
            let delay = state.delays.pop_front().unwrap_or(state.latency);
            let failure = state.failures.pop_front();
            match failure {
                Some(error) => return Err(error),
                None => (state.tasks.values().cloned().collect::<Vec<_>>(), delay),
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(tasks)
    }
}

impl ServerState {
    fn apply_patch(&mut self, task_id: TaskId, patch: &TaskPatch) -> BoardResult<Task> {
        let task = self
            .tasks
            .get(&task_id)
            .ok_or_else(|| BoardError::NotFound(format!("Task {} not found", task_id)))?;
        let is_story = task.is_story();
        let parent_id = task.parent_task_id;

        match patch.sprint_id {
            FieldUpdate::Set(sprint_id) => {
                let sprint = self.sprints.get(&sprint_id).ok_or_else(|| {
                    BoardError::NotFound(format!("Sprint {} not found", sprint_id))
                })?;
                if sprint.is_closed() {
                    return Err(BoardError::Rejected(format!(
                        "Sprint {} is closed",
                        sprint.name
                    )));
                }
                let sprint_ref = sprint.sprint_ref();
                if is_story {
                    for child in self.children_mut(task_id) {
                        if child.active_sprints.is_empty() {
                            join_sprint(child, sprint_ref.clone());
                        }
                    }
                }
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    join_sprint(task, sprint_ref);
                }
            }
            FieldUpdate::Clear => {
                if is_story {
                    for child in self.children_mut(task_id) {
                        if !child.active_sprints.is_empty() {
                            leave_sprint(child);
                        }
                    }
                }
                if let Some(task) = self.tasks.get_mut(&task_id) {
                    leave_sprint(task);
                }
            }
            FieldUpdate::NoChange => {}
        }

        if let Some(status) = patch.status {
            if let Some(task) = self.tasks.get_mut(&task_id) {
                task.status = status;
            }
        }

        if is_story {
            self.recompute_story(task_id);
        } else if let Some(parent_id) = parent_id {
            self.recompute_story(parent_id);
        }

        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| BoardError::Internal(format!("Task {} vanished", task_id)))
    }

    fn children_mut(&mut self, story_id: TaskId) -> impl Iterator<Item = &mut Task> {
        self.tasks
            .values_mut()
            .filter(move |t| t.parent_task_id == Some(story_id))
    }

    /// A story with subtasks belongs to exactly the sprints its subtasks
    /// belong to.
    fn recompute_story(&mut self, story_id: TaskId) {
        let mut sprints: Vec<SprintRef> = Vec::new();
        let mut has_children = false;
        for child in self.tasks.values().filter(|t| t.parent_task_id == Some(story_id)) {
            has_children = true;
            for sprint in &child.active_sprints {
                if !sprints.iter().any(|s| s.id == sprint.id) {
                    sprints.push(sprint.clone());
                }
            }
        }
        if !has_children {
            return;
        }

        if let Some(story) = self.tasks.get_mut(&story_id) {
            story.active_sprints = sprints;
            if story.active_sprints.is_empty() {
                story.status = TaskStatus::Backlog;
            } else if story.status == TaskStatus::Backlog {
                story.status = TaskStatus::Todo;
            }
        }
    }
}

fn join_sprint(task: &mut Task, sprint: SprintRef) {
    task.active_sprints = vec![sprint];
    if task.status == TaskStatus::Backlog {
        task.status = TaskStatus::Todo;
    }
}

fn leave_sprint(task: &mut Task) {
    task.active_sprints.clear();
    task.status = TaskStatus::Backlog;
}
