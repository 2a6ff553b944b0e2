//! Optimistic apply, server dispatch and reconciliation for accepted drops.
//!
//! Every accepted move is applied to the store synchronously, then sent to
//! the [`TaskService`] from a spawned task. Results come back as
//! [`Completion`]s over an unbounded channel and are applied by the owner
//! of the store, so the store itself is never shared across tasks.

use std::collections::HashMap;
use std::sync::Arc;

use taskboard_client::TaskService;
use taskboard_core::{
    BoardConfig, BoardError, BoardResult, FailurePolicy, Notification, NotificationLog,
};
use taskboard_domain::{apply_all, Cascade, MoveIntent, Task, TaskId, TaskStore};
use tokio::sync::mpsc;

use crate::versions::{RequestVersion, RequestVersions};

/// A finished server call.
#[derive(Debug)]
pub enum Completion {
    /// Result of the `update_task` call for a drop.
    Updated {
        version: RequestVersion,
        task_id: TaskId,
        result: BoardResult<Task>,
    },
    /// Result of the re-fetch that follows a failed drop under
    /// [`FailurePolicy::Refetch`].
    Refetched {
        version: RequestVersion,
        result: BoardResult<Vec<Task>>,
    },
}

impl Completion {
    pub fn version(&self) -> RequestVersion {
        match self {
            Completion::Updated { version, .. } | Completion::Refetched { version, .. } => *version,
        }
    }
}

/// Bookkeeping for one in-flight drop.
#[derive(Debug)]
struct PendingMove {
    affected: Vec<TaskId>,
    snapshot: Vec<Task>,
    cascade: Option<Cascade>,
}

pub struct TransitionOrchestrator {
    service: Arc<dyn TaskService>,
    failure_policy: FailurePolicy,
    discard_stale_responses: bool,
    versions: RequestVersions,
    pending: HashMap<RequestVersion, PendingMove>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl TransitionOrchestrator {
    pub fn new(service: Arc<dyn TaskService>, config: &BoardConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            service,
            failure_policy: config.failure_policy,
            discard_stale_responses: config.discard_stale_responses,
            versions: RequestVersions::new(),
            pending: HashMap::new(),
            completion_tx,
            completion_rx,
        }
    }

    pub fn service(&self) -> &Arc<dyn TaskService> {
        &self.service
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Number of server calls whose results have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Apply `intent` optimistically and send its patch to the server.
    ///
    /// Returns as soon as the request is spawned. Must be called from
    /// within a Tokio runtime.
    pub fn dispatch(&mut self, store: &mut TaskStore, intent: MoveIntent) -> RequestVersion {
        let task_id = intent.task_id();
        let affected = intent.affected_task_ids();
        let snapshot = store.snapshot(&affected);

        *store = apply_all(store, &intent.optimistic_actions());

        let version = self.versions.issue(&affected);
        self.pending.insert(
            version,
            PendingMove {
                affected,
                snapshot,
                cascade: intent.cascade(),
            },
        );

        let patch = intent.patch();
        tracing::info!(
            "Dispatching request {} for task {}: {:?}",
            version,
            task_id,
            patch
        );

        let service = Arc::clone(&self.service);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = service
                .update_task(task_id, patch)
                .await
                .and_then(|task| {
                    if task.id == task_id {
                        Ok(task)
                    } else {
                        Err(unexpected_task(task_id, task.id))
                    }
                });
            if tx
                .send(Completion::Updated {
                    version,
                    task_id,
                    result,
                })
                .is_err()
            {
                tracing::debug!("Board closed, discarding result of request {}", version);
            }
        });

        version
    }

    /// A completion that has already arrived, if any.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.completion_rx.try_recv().ok()
    }

    /// Wait for the next completion. Returns `None` when nothing is in
    /// flight.
    pub async fn next(&mut self) -> Option<Completion> {
        if self.pending.is_empty() {
            return None;
        }
        self.completion_rx.recv().await
    }

    /// Fold a completion into the store.
    pub fn apply(
        &mut self,
        store: &mut TaskStore,
        completion: Completion,
        notifications: &mut NotificationLog,
    ) {
        match completion {
            Completion::Updated {
                version,
                result: Ok(task),
                ..
            } => {
                let Some(pending) = self.pending.remove(&version) else {
                    tracing::error!("Completion for unknown request {}", version);
                    return;
                };
                self.reconcile(store, version, task, pending.cascade);
            }
            Completion::Updated {
                version,
                task_id,
                result: Err(error),
            } => {
                tracing::warn!("Update of task {} failed: {}", task_id, error);
                notifications.push(Notification::error(error.user_message()));
                self.recover(store, version);
            }
            Completion::Refetched { version, result } => {
                let Some(pending) = self.pending.remove(&version) else {
                    tracing::error!("Re-fetch for unknown request {}", version);
                    return;
                };
                match result {
                    Ok(tasks) => {
                        let restored = self.restore_from(store, version, &pending.affected, tasks);
                        notifications.push(Notification::info(format!(
                            "Restored {} tasks from server",
                            restored
                        )));
                    }
                    Err(error) => {
                        tracing::warn!("Re-fetch after request {} failed: {}", version, error);
                        notifications.push(Notification::error(error.user_message()));
                    }
                }
            }
        }
    }

    fn is_current(&self, task_id: TaskId, version: RequestVersion) -> bool {
        !self.discard_stale_responses || self.versions.is_latest(task_id, version)
    }

    fn reconcile(
        &self,
        store: &mut TaskStore,
        version: RequestVersion,
        task: Task,
        cascade: Option<Cascade>,
    ) {
        let task_id = task.id;
        if !self.is_current(task_id, version) {
            tracing::debug!(
                "Discarding stale response {} for task {} (latest {:?})",
                version,
                task_id,
                self.versions.latest(task_id)
            );
            return;
        }

        if let Some(mut cascade) = cascade {
            cascade
                .subtask_ids
                .retain(|subtask_id| self.is_current(*subtask_id, version));
            let updated = cascade.reconcile(store, &task);
            tracing::info!(
                "Reconciled subtasks {:?} of story {} from request {}",
                updated,
                task_id,
                version
            );
        }

        tracing::info!("Task {} confirmed by request {}", task_id, version);
        store.upsert(task);
    }

    fn recover(&mut self, store: &mut TaskStore, version: RequestVersion) {
        match self.failure_policy {
            FailurePolicy::Keep => {
                self.pending.remove(&version);
            }
            FailurePolicy::Rollback => {
                let Some(pending) = self.pending.remove(&version) else {
                    tracing::error!("Completion for unknown request {}", version);
                    return;
                };
                for task in pending.snapshot {
                    if self.versions.is_latest(task.id, version) {
                        tracing::info!("Rolling back task {}", task.id);
                        store.upsert(task);
                    }
                }
            }
            FailurePolicy::Refetch => {
                if !self.pending.contains_key(&version) {
                    tracing::error!("Completion for unknown request {}", version);
                    return;
                }
                let service = Arc::clone(&self.service);
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = service.fetch_tasks().await;
                    if tx.send(Completion::Refetched { version, result }).is_err() {
                        tracing::debug!("Board closed, discarding re-fetch {}", version);
                    }
                });
            }
        }
    }

    fn restore_from(
        &self,
        store: &mut TaskStore,
        version: RequestVersion,
        affected: &[TaskId],
        tasks: Vec<Task>,
    ) -> usize {
        let mut fetched: HashMap<TaskId, Task> = tasks.into_iter().map(|t| (t.id, t)).collect();
        let mut restored = 0;
        for task_id in affected {
            if !self.versions.is_latest(*task_id, version) {
                continue;
            }
            match fetched.remove(task_id) {
                Some(task) => {
                    tracing::info!("Restored task {} from server", task_id);
                    store.upsert(task);
                    restored += 1;
                }
                None => tracing::debug!("Task {} missing from re-fetch", task_id),
            }
        }
        restored
    }
}

fn unexpected_task(requested: TaskId, returned: TaskId) -> BoardError {
    BoardError::Internal(format!(
        "Requested task {} but server returned task {}",
        requested, returned
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use taskboard_core::NotificationLevel;
    use taskboard_domain::{BoardColumn, SprintRef, TaskPatch, TaskStatus, TaskType};

    mock! {
        pub Service {}

        #[async_trait]
        impl TaskService for Service {
            async fn update_task(&self, task_id: TaskId, patch: TaskPatch) -> BoardResult<Task>;
            async fn fetch_tasks(&self) -> BoardResult<Vec<Task>>;
        }
    }

    fn sprint() -> SprintRef {
        SprintRef::new(5, "Sprint 5")
    }

    fn sprint_task(status: TaskStatus) -> Task {
        Task::new(1, TaskType::Task, "task")
            .with_status(status)
            .in_sprint(sprint())
    }

    fn config(failure_policy: FailurePolicy) -> BoardConfig {
        BoardConfig {
            failure_policy,
            ..BoardConfig::default()
        }
    }

    fn status_move(column: BoardColumn) -> MoveIntent {
        MoveIntent::ChangeStatus { task_id: 1, column }
    }

    async fn collect(orchestrator: &mut TransitionOrchestrator, count: usize) -> Vec<Completion> {
        let mut completions = Vec::new();
        while completions.len() < count {
            match orchestrator.completion_rx.recv().await {
                Some(completion) => completions.push(completion),
                None => break,
            }
        }
        completions.sort_by_key(Completion::version);
        completions
    }

    #[tokio::test]
    async fn test_dispatch_applies_before_response() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .withf(|id, patch| *id == 1 && *patch == TaskPatch::status(TaskStatus::Done))
            .times(1)
            .returning(|_, _| Ok(sprint_task(TaskStatus::Done)));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &BoardConfig::default());
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));
        assert_eq!(store.get(1).unwrap().status, TaskStatus::Done);
        assert_eq!(orchestrator.in_flight(), 1);

        let completion = orchestrator.next().await.unwrap();
        orchestrator.apply(&mut store, completion, &mut notifications);

        assert_eq!(orchestrator.in_flight(), 0);
        assert_eq!(store.get(1), Some(&sprint_task(TaskStatus::Done)));
        assert!(notifications.is_empty());
        assert!(orchestrator.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, patch| Ok(sprint_task(patch.status.unwrap_or(TaskStatus::Todo))));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &BoardConfig::default());
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::InProgress));
        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));

        // Deliver the newer response first, as a slow network would
        let mut completions = collect(&mut orchestrator, 2).await;
        completions.reverse();
        for completion in completions {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }

        assert_eq!(store.get(1).unwrap().status, TaskStatus::Done);
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_last_response_wins_when_stale_discard_disabled() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, patch| Ok(sprint_task(patch.status.unwrap_or(TaskStatus::Todo))));

        let config = BoardConfig {
            discard_stale_responses: false,
            ..BoardConfig::default()
        };
        let mut orchestrator = TransitionOrchestrator::new(Arc::new(service), &config);
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::InProgress));
        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));

        let mut completions = collect(&mut orchestrator, 2).await;
        completions.reverse();
        for completion in completions {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }

        assert_eq!(store.get(1).unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_keep_policy_leaves_speculative_state() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, _| Err(BoardError::Rejected("Not allowed".to_string())));
        service.expect_fetch_tasks().never();

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Keep));
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::Verify));
        let completion = orchestrator.next().await.unwrap();
        orchestrator.apply(&mut store, completion, &mut notifications);

        assert_eq!(store.get(1).unwrap().status, TaskStatus::Verify);
        assert_eq!(notifications.entries()[0].message, "Not allowed");
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, _| Err(BoardError::Transport("connection reset".to_string())));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Rollback));
        let backlog_story = Task::new(10, TaskType::UserStory, "story");
        let backlog_subtask = Task::new(11, TaskType::Task, "sub").with_parent(10);
        let mut store = TaskStore::from_tasks(vec![backlog_story.clone(), backlog_subtask.clone()]);
        let before = store.clone();
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(
            &mut store,
            MoveIntent::AddToSprint {
                task_id: 10,
                subtask_ids: vec![11],
                sprint: sprint(),
                promote_task: true,
            },
        );
        assert_ne!(store, before);

        let completion = orchestrator.next().await.unwrap();
        orchestrator.apply(&mut store, completion, &mut notifications);

        assert_eq!(store, before);
        assert_eq!(notifications.len(), 1);
        assert!(notifications.entries()[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_rollback_skips_tasks_moved_again() {
        let mut service = MockService::new();
        let mut calls = 0;
        service.expect_update_task().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(BoardError::Transport("timeout".to_string()))
            } else {
                Ok(sprint_task(TaskStatus::Done))
            }
        });

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Rollback));
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::InProgress));
        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));

        // The failure of the first drop arrives after the second settled
        let mut completions = collect(&mut orchestrator, 2).await;
        completions.reverse();
        for completion in completions {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }

        assert_eq!(store.get(1).unwrap().status, TaskStatus::Done);
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_replaces_affected_tasks() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, _| Err(BoardError::Rejected("Sprint is closed".to_string())));
        service
            .expect_fetch_tasks()
            .times(1)
            .returning(|| Ok(vec![sprint_task(TaskStatus::Verify)]));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Refetch));
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));
        while let Some(completion) = orchestrator.next().await {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }

        assert_eq!(store.get(1).unwrap().status, TaskStatus::Verify);
        let entries = notifications.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, NotificationLevel::Error);
        assert_eq!(entries[1].level, NotificationLevel::Info);
        assert_eq!(entries[1].message, "Restored 1 tasks from server");
        assert_eq!(orchestrator.in_flight(), 0);
    }

    fn story_with_backlog_subtasks() -> Vec<Task> {
        vec![
            Task::new(10, TaskType::UserStory, "story"),
            Task::new(11, TaskType::Task, "a").with_parent(10),
            Task::new(12, TaskType::Task, "b").with_parent(10),
        ]
    }

    fn add_story() -> MoveIntent {
        MoveIntent::AddToSprint {
            task_id: 10,
            subtask_ids: vec![11, 12],
            sprint: sprint(),
            promote_task: true,
        }
    }

    fn start_subtask() -> MoveIntent {
        MoveIntent::ChangeStatus {
            task_id: 11,
            column: BoardColumn::InProgress,
        }
    }

    fn started_subtask() -> Task {
        Task::new(11, TaskType::Task, "a")
            .with_parent(10)
            .with_status(TaskStatus::InProgress)
            .in_sprint(sprint())
    }

    #[tokio::test]
    async fn test_cascade_skips_subtasks_moved_again() {
        let renamed = SprintRef::new(5, "Sprint 5 (renamed)");
        let story_sprint = renamed.clone();
        let mut service = MockService::new();
        service.expect_update_task().returning(move |id, _| match id {
            10 => Ok(Task::new(10, TaskType::UserStory, "story").in_sprint(story_sprint.clone())),
            _ => Ok(started_subtask()),
        });

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &BoardConfig::default());
        let mut store = TaskStore::from_tasks(story_with_backlog_subtasks());
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, add_story());
        orchestrator.dispatch(&mut store, start_subtask());

        // The subtask's own response lands before the story's
        let mut completions = collect(&mut orchestrator, 2).await;
        completions.reverse();
        for completion in completions {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }

        assert_eq!(store.get(11), Some(&started_subtask()));
        let untouched = store.get(12).unwrap();
        assert_eq!(untouched.status, TaskStatus::Todo);
        assert_eq!(untouched.active_sprints, vec![renamed.clone()]);
        assert_eq!(store.get(10).unwrap().active_sprints, vec![renamed]);
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn test_refetch_skips_tasks_moved_again() {
        let mut service = MockService::new();
        service.expect_update_task().returning(|id, _| match id {
            10 => Err(BoardError::Rejected("Sprint is full".to_string())),
            _ => Ok(started_subtask()),
        });
        service
            .expect_fetch_tasks()
            .times(1)
            .returning(|| Ok(story_with_backlog_subtasks()));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Refetch));
        let mut store = TaskStore::from_tasks(story_with_backlog_subtasks());
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, add_story());
        orchestrator.dispatch(&mut store, start_subtask());

        // Failure first, then the later drop succeeds before the re-fetch
        for completion in collect(&mut orchestrator, 2).await {
            orchestrator.apply(&mut store, completion, &mut notifications);
        }
        let refetched = orchestrator.next().await.unwrap();
        assert!(matches!(refetched, Completion::Refetched { .. }));
        orchestrator.apply(&mut store, refetched, &mut notifications);

        let server = story_with_backlog_subtasks();
        assert_eq!(store.get(10), Some(&server[0]));
        assert_eq!(store.get(12), Some(&server[2]));
        assert_eq!(store.get(11), Some(&started_subtask()));
        assert_eq!(notifications.entries()[0].message, "Sprint is full");
        assert_eq!(
            notifications.entries()[1].message,
            "Restored 2 tasks from server"
        );
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_response_is_a_failure() {
        let mut service = MockService::new();
        service
            .expect_update_task()
            .returning(|_, _| Ok(Task::new(2, TaskType::Task, "other")));

        let mut orchestrator =
            TransitionOrchestrator::new(Arc::new(service), &config(FailurePolicy::Rollback));
        let mut store = TaskStore::from_tasks(vec![sprint_task(TaskStatus::Todo)]);
        let mut notifications = NotificationLog::new();

        orchestrator.dispatch(&mut store, status_move(BoardColumn::Done));
        let completion = orchestrator.next().await.unwrap();
        orchestrator.apply(&mut store, completion, &mut notifications);

        assert_eq!(store.get(1).unwrap().status, TaskStatus::Todo);
        assert!(!store.contains(2));
        assert_eq!(notifications.len(), 1);
    }
}
