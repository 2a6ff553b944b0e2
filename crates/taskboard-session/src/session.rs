use std::collections::BTreeMap;
use std::sync::Arc;

use taskboard_client::TaskService;
use taskboard_core::{BoardConfig, BoardResult, Notification, NotificationLog};
use taskboard_domain::{
    select_backlog_tasks, select_board_rows, select_sprint_tasks, select_subtask_map, BoardRow,
    DragEvent, DragMachine, DropOutcome, Sprint, Task, TaskId, TaskStore,
};

use crate::orchestrator::TransitionOrchestrator;

/// One open sprint board.
///
/// Owns the task store, the drag state, the in-flight server calls and the
/// pending notifications. Dropping the session discards every result that
/// has not been applied yet.
pub struct BoardSession {
    sprint: Sprint,
    store: TaskStore,
    drag: DragMachine,
    orchestrator: TransitionOrchestrator,
    notifications: NotificationLog,
}

impl BoardSession {
    pub fn new(
        sprint: Sprint,
        tasks: impl IntoIterator<Item = Task>,
        service: Arc<dyn TaskService>,
        config: &BoardConfig,
    ) -> Self {
        Self {
            sprint,
            store: TaskStore::from_tasks(tasks),
            drag: DragMachine::new(),
            orchestrator: TransitionOrchestrator::new(service, config),
            notifications: NotificationLog::new(),
        }
    }

    /// Open a board, loading its tasks from the service.
    pub async fn load(
        sprint: Sprint,
        service: Arc<dyn TaskService>,
        config: &BoardConfig,
    ) -> BoardResult<Self> {
        let tasks = service.fetch_tasks().await?;
        tracing::info!(
            "Loaded {} tasks for sprint {} ({:?})",
            tasks.len(),
            sprint.name,
            sprint.status
        );
        Ok(Self::new(sprint, tasks, service, config))
    }

    pub fn sprint(&self) -> &Sprint {
        &self.sprint
    }

    /// The sprint's status changed elsewhere (started, closed, ...).
    pub fn set_sprint(&mut self, sprint: Sprint) {
        self.sprint = sprint;
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.store.get(task_id)
    }

    pub fn drag_state(&self) -> &DragMachine {
        &self.drag
    }

    pub fn backlog(&self) -> Vec<&Task> {
        select_backlog_tasks(&self.store)
    }

    pub fn sprint_tasks(&self) -> Vec<&Task> {
        select_sprint_tasks(&self.store, self.sprint.id)
    }

    pub fn board_rows(&self) -> Vec<BoardRow<'_>> {
        select_board_rows(&self.store, self.sprint.id)
    }

    pub fn subtask_map(&self) -> BTreeMap<TaskId, Vec<&Task>> {
        select_subtask_map(&self.store)
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    pub fn in_flight(&self) -> usize {
        self.orchestrator.in_flight()
    }

    /// Feed one drag event.
    ///
    /// An accepted drop is applied to the store immediately and sent to the
    /// server. A rejection that carries a message raises a notification.
    /// Must be called from within a Tokio runtime.
    pub fn handle_drag(&mut self, event: DragEvent) -> Option<DropOutcome> {
        let outcome = self.drag.handle(event, &self.store, &self.sprint)?;
        match &outcome {
            DropOutcome::Accepted(intent) => {
                self.orchestrator.dispatch(&mut self.store, intent.clone());
            }
            DropOutcome::Rejected(rejection) => {
                if let Some(message) = rejection.user_message() {
                    self.notifications.push(Notification::error(message));
                }
            }
        }
        Some(outcome)
    }

    /// Apply every completion that has already arrived. Returns how many
    /// were applied.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.orchestrator.try_next() {
            self.orchestrator
                .apply(&mut self.store, completion, &mut self.notifications);
            applied += 1;
        }
        applied
    }

    /// Wait for the next completion and apply it. Returns `false` when
    /// nothing is in flight.
    pub async fn next_completion(&mut self) -> bool {
        match self.orchestrator.next().await {
            Some(completion) => {
                self.orchestrator
                    .apply(&mut self.store, completion, &mut self.notifications);
                true
            }
            None => false,
        }
    }

    /// Wait until every in-flight call has been applied.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    /// Replace the store with the server's current tasks.
    pub async fn refresh(&mut self) -> BoardResult<()> {
        let tasks = self.orchestrator.service().fetch_tasks().await?;
        tracing::info!("Refreshed board with {} tasks", tasks.len());
        self.store.replace_all(tasks);
        Ok(())
    }
}
