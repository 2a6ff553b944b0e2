//! Move validation rules.
//!
//! Pure functions deciding whether a dragged task may land on a target.
//! Used twice per drag: [`is_potential_target`] is the cheap hover check
//! that only looks at source, column and sprint status, and
//! [`validate_move`] is the full check run on drop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sprint::{Sprint, SprintId, SprintRef, SprintStatus};
use crate::store::TaskStore;
use crate::story::StoryGroup;
use crate::task::{BoardColumn, Task, TaskId, TaskStatus};

/// Where a drag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragSource {
    Backlog,
    Sprint,
}

/// Where a drag can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DropTarget {
    /// A column cell inside a story row.
    Column {
        story: StoryGroup,
        column: BoardColumn,
    },
    Backlog,
}

/// A drop the validator refused.
///
/// Most rejections are silent: the card snaps back and nothing is said.
/// Business-rule rejections carry a message for the user, see
/// [`MoveRejection::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("task {0} is not on this board")]
    UnknownTask(TaskId),

    #[error("task {0} is not where the drag started")]
    SourceMismatch(TaskId),

    #[error("target is not droppable")]
    TargetNotDroppable,

    #[error("sprint does not accept this move while {0:?}")]
    SprintLocked(SprintStatus),

    #[error("stories are not column items")]
    StoryNotColumnItem,

    #[error("task already has this status")]
    SameStatus,

    #[error("task belongs to another story row")]
    ForeignStoryRow,

    #[error("story children must be TODO")]
    StoryChildrenNotTodo,

    #[error("subtask cannot move to backlog directly")]
    SubtaskToBacklog,

    #[error("subtask cannot leave the backlog without its story")]
    SubtaskFromBacklog,

    #[error("task already begun, cannot return to backlog")]
    TaskAlreadyStarted,
}

impl MoveRejection {
    /// The notification to show, or `None` for silent rejections.
    pub fn user_message(&self) -> Option<String> {
        match self {
            MoveRejection::StoryChildrenNotTodo
            | MoveRejection::SubtaskToBacklog
            | MoveRejection::SubtaskFromBacklog
            | MoveRejection::TaskAlreadyStarted => Some(self.to_string()),
            _ => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.user_message().is_none()
    }
}

/// A validated move, ready to be planned and dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MoveIntent {
    /// Move a leaf task between columns of the board.
    ChangeStatus { task_id: TaskId, column: BoardColumn },
    /// Bring a backlog task (and, for a story, its backlog subtasks) into
    /// the sprint's TODO column.
    AddToSprint {
        task_id: TaskId,
        subtask_ids: Vec<TaskId>,
        sprint: SprintRef,
        /// The dragged task itself is in `BACKLOG` and becomes `TODO`.
        promote_task: bool,
    },
    /// Take a task out of the sprint. A story takes every subtask that is
    /// planned in any sprint with it.
    ReturnToBacklog {
        task_id: TaskId,
        subtask_ids: Vec<TaskId>,
        sprint_id: SprintId,
    },
}

impl MoveIntent {
    pub fn task_id(&self) -> TaskId {
        match self {
            MoveIntent::ChangeStatus { task_id, .. }
            | MoveIntent::AddToSprint { task_id, .. }
            | MoveIntent::ReturnToBacklog { task_id, .. } => *task_id,
        }
    }
}

/// Hover pre-filter: could anything dragged from `source` land on `target`
/// while the sprint is in `sprint_status`?
pub fn is_potential_target(
    source: DragSource,
    target: &DropTarget,
    sprint_status: SprintStatus,
) -> bool {
    let closed = sprint_status == SprintStatus::Closed;
    let locked = closed || sprint_status == SprintStatus::Draft;
    match (source, target) {
        // Adding to a sprint is allowed on a DRAFT board, only its TODO column
        (DragSource::Backlog, DropTarget::Column { column, .. }) => {
            *column == BoardColumn::Todo && !closed
        }
        (DragSource::Backlog, DropTarget::Backlog) => false,
        (DragSource::Sprint, DropTarget::Column { .. }) => !locked,
        (DragSource::Sprint, DropTarget::Backlog) => !closed,
    }
}

/// Full drop validation.
pub fn validate_move(
    store: &TaskStore,
    task_id: TaskId,
    source: DragSource,
    target: &DropTarget,
    sprint: &Sprint,
) -> Result<MoveIntent, MoveRejection> {
    let task = store
        .get(task_id)
        .ok_or(MoveRejection::UnknownTask(task_id))?;

    match (source, target) {
        (DragSource::Backlog, DropTarget::Column { column, .. }) => {
            validate_add_to_sprint(store, task, *column, sprint)
        }
        (DragSource::Sprint, DropTarget::Column { story, column }) => {
            validate_status_change(task, *story, *column, sprint)
        }
        (DragSource::Sprint, DropTarget::Backlog) => {
            validate_return_to_backlog(store, task, sprint)
        }
        (DragSource::Backlog, DropTarget::Backlog) => Err(MoveRejection::TargetNotDroppable),
    }
}

/// Boolean form of [`validate_move`] for an already looked-up task.
pub fn can_move(
    store: &TaskStore,
    task: &Task,
    source: DragSource,
    target: &DropTarget,
    sprint: &Sprint,
) -> bool {
    validate_move(store, task.id, source, target, sprint).is_ok()
}

fn validate_add_to_sprint(
    store: &TaskStore,
    task: &Task,
    column: BoardColumn,
    sprint: &Sprint,
) -> Result<MoveIntent, MoveRejection> {
    if !task.is_in_backlog() {
        return Err(MoveRejection::SourceMismatch(task.id));
    }
    if column != BoardColumn::Todo {
        return Err(MoveRejection::TargetNotDroppable);
    }
    if sprint.is_closed() {
        return Err(MoveRejection::SprintLocked(sprint.status));
    }
    if task.is_subtask() {
        return Err(MoveRejection::SubtaskFromBacklog);
    }

    let subtask_ids = if task.is_story() {
        store
            .children_of(task.id)
            .filter(|child| child.is_in_backlog())
            .map(|child| child.id)
            .collect()
    } else {
        Vec::new()
    };

    Ok(MoveIntent::AddToSprint {
        task_id: task.id,
        subtask_ids,
        sprint: sprint.sprint_ref(),
        promote_task: task.status == TaskStatus::Backlog,
    })
}

fn validate_status_change(
    task: &Task,
    story: StoryGroup,
    column: BoardColumn,
    sprint: &Sprint,
) -> Result<MoveIntent, MoveRejection> {
    if !task.is_in_sprint(sprint.id) {
        return Err(MoveRejection::SourceMismatch(task.id));
    }
    if task.is_story() {
        return Err(MoveRejection::StoryNotColumnItem);
    }
    if sprint.is_board_locked() {
        return Err(MoveRejection::SprintLocked(sprint.status));
    }
    if task.story_group() != story {
        return Err(MoveRejection::ForeignStoryRow);
    }
    if task.status == column.status() {
        return Err(MoveRejection::SameStatus);
    }

    Ok(MoveIntent::ChangeStatus {
        task_id: task.id,
        column,
    })
}

fn validate_return_to_backlog(
    store: &TaskStore,
    task: &Task,
    sprint: &Sprint,
) -> Result<MoveIntent, MoveRejection> {
    if !task.is_in_sprint(sprint.id) {
        return Err(MoveRejection::SourceMismatch(task.id));
    }
    if sprint.is_closed() {
        return Err(MoveRejection::SprintLocked(sprint.status));
    }

    if task.is_story() {
        // Children still in the backlog do not hold the story back
        let children_ready = store
            .children_of(task.id)
            .filter(|child| !child.is_in_backlog())
            .all(|child| child.status == TaskStatus::Todo);
        if !children_ready {
            return Err(MoveRejection::StoryChildrenNotTodo);
        }
        let subtask_ids = store
            .children_of(task.id)
            .filter(|child| !child.is_in_backlog())
            .map(|child| child.id)
            .collect();
        return Ok(MoveIntent::ReturnToBacklog {
            task_id: task.id,
            subtask_ids,
            sprint_id: sprint.id,
        });
    }

    if task.is_subtask() {
        return Err(MoveRejection::SubtaskToBacklog);
    }
    if task.status != TaskStatus::Todo {
        return Err(MoveRejection::TaskAlreadyStarted);
    }

    Ok(MoveIntent::ReturnToBacklog {
        task_id: task.id,
        subtask_ids: Vec::new(),
        sprint_id: sprint.id,
    })
}
