//! Turning a validated move into optimistic actions and a server patch.

use crate::patch::TaskPatch;
use crate::reducer::OptimisticAction;
use crate::sprint::SprintId;
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskStatus};
use crate::validator::MoveIntent;

/// Subtasks whose sprint membership follows the dragged story. The server
/// is only asked about the story; subtasks are updated locally from its
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    pub sprint_id: SprintId,
    pub subtask_ids: Vec<TaskId>,
    pub kind: CascadeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeKind {
    /// Subtasks join the sprint; `BACKLOG` ones are promoted to `TODO`.
    Join,
    /// Subtasks leave every sprint with their story.
    Leave,
}

impl MoveIntent {
    /// Reducer actions giving the user immediate feedback for this move.
    pub fn optimistic_actions(&self) -> Vec<OptimisticAction> {
        match self {
            MoveIntent::ChangeStatus { task_id, column } => vec![OptimisticAction::UpdateStatus {
                task_id: *task_id,
                status: column.status(),
            }],
            MoveIntent::AddToSprint {
                task_id,
                subtask_ids,
                sprint,
                promote_task,
            } => {
                let mut actions = vec![OptimisticAction::AddToSprint {
                    task_id: *task_id,
                    subtask_ids: subtask_ids.clone(),
                    sprint_id: sprint.id,
                    sprint_name: sprint.name.clone(),
                }];
                if *promote_task {
                    actions.push(OptimisticAction::UpdateStatus {
                        task_id: *task_id,
                        status: TaskStatus::Todo,
                    });
                }
                actions
            }
            MoveIntent::ReturnToBacklog {
                task_id,
                subtask_ids,
                ..
            } => {
                let task_ids = std::iter::once(*task_id)
                    .chain(subtask_ids.iter().copied())
                    .collect();
                vec![OptimisticAction::RemoveFromSprint { task_ids }]
            }
        }
    }

    /// The single `updateTask` patch sent for the dragged task.
    pub fn patch(&self) -> TaskPatch {
        match self {
            MoveIntent::ChangeStatus { column, .. } => TaskPatch::status(column.status()),
            MoveIntent::AddToSprint {
                sprint,
                promote_task,
                ..
            } => {
                let patch = TaskPatch::add_to_sprint(sprint.id);
                if *promote_task {
                    patch.with_status(TaskStatus::Todo)
                } else {
                    patch
                }
            }
            MoveIntent::ReturnToBacklog { .. } => TaskPatch::remove_from_sprint(),
        }
    }

    /// Every task the optimistic actions touch.
    pub fn affected_task_ids(&self) -> Vec<TaskId> {
        match self {
            MoveIntent::ChangeStatus { task_id, .. } => vec![*task_id],
            MoveIntent::AddToSprint {
                task_id,
                subtask_ids,
                ..
            }
            | MoveIntent::ReturnToBacklog {
                task_id,
                subtask_ids,
                ..
            } => std::iter::once(*task_id)
                .chain(subtask_ids.iter().copied())
                .collect(),
        }
    }

    pub fn cascade(&self) -> Option<Cascade> {
        match self {
            MoveIntent::ChangeStatus { .. } => None,
            MoveIntent::AddToSprint {
                subtask_ids,
                sprint,
                ..
            } if !subtask_ids.is_empty() => Some(Cascade {
                sprint_id: sprint.id,
                subtask_ids: subtask_ids.clone(),
                kind: CascadeKind::Join,
            }),
            MoveIntent::ReturnToBacklog {
                subtask_ids,
                sprint_id,
                ..
            } if !subtask_ids.is_empty() => Some(Cascade {
                sprint_id: *sprint_id,
                subtask_ids: subtask_ids.clone(),
                kind: CascadeKind::Leave,
            }),
            _ => None,
        }
    }
}

impl Cascade {
    /// Bring each cascaded subtask in line with the story the server
    /// returned.
    ///
    /// A join gives subtasks the story's confirmed membership in the
    /// cascade's sprint and promotes `BACKLOG` ones to `TODO`. A leave sends
    /// subtasks to the backlog once the story has left every sprint; if the
    /// story is still planned somewhere the optimistic removal stands.
    ///
    /// Returns the ids that were updated.
    pub fn reconcile(&self, store: &mut TaskStore, story: &Task) -> Vec<TaskId> {
        let membership: Vec<_> = story
            .active_sprints
            .iter()
            .filter(|s| s.id == self.sprint_id)
            .cloned()
            .collect();

        let mut updated = Vec::with_capacity(self.subtask_ids.len());
        for subtask_id in &self.subtask_ids {
            let Some(subtask) = store.get_mut(*subtask_id) else {
                continue;
            };
            match self.kind {
                CascadeKind::Join => {
                    subtask.active_sprints = membership.clone();
                    if !membership.is_empty() && subtask.status == TaskStatus::Backlog {
                        subtask.status = TaskStatus::Todo;
                    }
                }
                CascadeKind::Leave => {
                    subtask.active_sprints.clear();
                    if story.active_sprints.is_empty() {
                        subtask.status = TaskStatus::Backlog;
                    }
                }
            }
            updated.push(*subtask_id);
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_update::FieldUpdate;
    use crate::reducer::apply_all;
    use crate::sprint::SprintRef;
    use crate::task::{BoardColumn, TaskType};

    fn sprint() -> SprintRef {
        SprintRef::new(5, "Sprint 5")
    }

    #[test]
    fn test_change_status_plan() {
        let intent = MoveIntent::ChangeStatus {
            task_id: 1,
            column: BoardColumn::Done,
        };
        assert_eq!(
            intent.optimistic_actions(),
            vec![OptimisticAction::UpdateStatus {
                task_id: 1,
                status: TaskStatus::Done
            }]
        );
        assert_eq!(intent.patch(), TaskPatch::status(TaskStatus::Done));
        assert_eq!(intent.cascade(), None);
    }

    #[test]
    fn test_add_leaf_task_plan_promotes_task() {
        let intent = MoveIntent::AddToSprint {
            task_id: 1,
            subtask_ids: vec![],
            sprint: sprint(),
            promote_task: true,
        };
        let store = TaskStore::from_tasks(vec![Task::new(1, TaskType::Task, "t")]);
        let next = apply_all(&store, &intent.optimistic_actions());

        let task = next.get(1).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.active_sprints, vec![sprint()]);
        assert!(task.is_consistent());

        let patch = intent.patch();
        assert_eq!(patch.status, Some(TaskStatus::Todo));
        assert_eq!(patch.sprint_id, FieldUpdate::Set(5));
        assert_eq!(intent.cascade(), None);
    }

    #[test]
    fn test_return_story_plan() {
        let intent = MoveIntent::ReturnToBacklog {
            task_id: 1,
            subtask_ids: vec![2, 3],
            sprint_id: 5,
        };
        assert_eq!(
            intent.optimistic_actions(),
            vec![OptimisticAction::RemoveFromSprint {
                task_ids: vec![1, 2, 3]
            }]
        );
        assert_eq!(intent.patch(), TaskPatch::remove_from_sprint());
        assert_eq!(intent.affected_task_ids(), vec![1, 2, 3]);
        assert_eq!(
            intent.cascade(),
            Some(Cascade {
                sprint_id: 5,
                subtask_ids: vec![2, 3],
                kind: CascadeKind::Leave,
            })
        );
    }

    #[test]
    fn test_cascade_reconcile_add() {
        let mut store = TaskStore::from_tasks(vec![
            Task::new(2, TaskType::Task, "a").with_parent(1),
            Task::new(3, TaskType::Task, "b")
                .with_parent(1)
                .with_status(TaskStatus::Verify),
        ]);
        let story = Task::new(1, TaskType::UserStory, "story").in_sprint(sprint());
        let cascade = Cascade {
            sprint_id: 5,
            subtask_ids: vec![2, 3, 99],
            kind: CascadeKind::Join,
        };

        let updated = cascade.reconcile(&mut store, &story);

        assert_eq!(updated, vec![2, 3]);
        assert_eq!(store.get(2).unwrap().status, TaskStatus::Todo);
        assert_eq!(store.get(2).unwrap().active_sprints, vec![sprint()]);
        assert_eq!(store.get(3).unwrap().status, TaskStatus::Verify);
    }

    #[test]
    fn test_cascade_reconcile_leave_sends_subtasks_to_backlog() {
        let mut store = TaskStore::from_tasks(vec![
            Task::new(2, TaskType::Task, "a").with_parent(1),
            Task::new(3, TaskType::Task, "b").with_parent(1),
        ]);
        let story = Task::new(1, TaskType::UserStory, "story");
        let cascade = Cascade {
            sprint_id: 5,
            subtask_ids: vec![2, 3],
            kind: CascadeKind::Leave,
        };

        let updated = cascade.reconcile(&mut store, &story);

        assert_eq!(updated, vec![2, 3]);
        for id in [2, 3] {
            let subtask = store.get(id).unwrap();
            assert!(subtask.active_sprints.is_empty());
            assert_eq!(subtask.status, TaskStatus::Backlog);
        }
    }

    #[test]
    fn test_cascade_reconcile_leave_keeps_status_while_story_is_planned() {
        let mut store = TaskStore::from_tasks(vec![Task::new(2, TaskType::Task, "a")
            .with_parent(1)
            .in_sprint(sprint())]);
        let story = Task::new(1, TaskType::UserStory, "story")
            .with_status(TaskStatus::Todo)
            .in_sprint(SprintRef::new(4, "Sprint 4"));
        let cascade = Cascade {
            sprint_id: 5,
            subtask_ids: vec![2],
            kind: CascadeKind::Leave,
        };

        cascade.reconcile(&mut store, &story);

        let subtask = store.get(2).unwrap();
        assert!(subtask.active_sprints.is_empty());
        assert_eq!(subtask.status, TaskStatus::Todo);
    }
}
