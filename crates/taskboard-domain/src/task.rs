use serde::{Deserialize, Serialize};

use crate::sprint::{SprintId, SprintRef};
use crate::story::StoryGroup;

pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    UserStory,
    Task,
    Bug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "BACKLOG")]
    Backlog,
    #[serde(rename = "TODO")]
    Todo,
    #[serde(rename = "INPROGRESS")]
    InProgress,
    #[serde(rename = "VERIFY")]
    Verify,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    /// The board column showing tasks in this status, `None` for the backlog.
    pub fn column(self) -> Option<BoardColumn> {
        match self {
            TaskStatus::Backlog => None,
            TaskStatus::Todo => Some(BoardColumn::Todo),
            TaskStatus::InProgress => Some(BoardColumn::InProgress),
            TaskStatus::Verify => Some(BoardColumn::Verify),
            TaskStatus::Done => Some(BoardColumn::Done),
        }
    }
}

/// One of the four sprint board columns. `BACKLOG` is deliberately not a
/// column, so a drop can never set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoardColumn {
    #[serde(rename = "TODO")]
    Todo,
    #[serde(rename = "INPROGRESS")]
    InProgress,
    #[serde(rename = "VERIFY")]
    Verify,
    #[serde(rename = "DONE")]
    Done,
}

impl BoardColumn {
    pub const ALL: [BoardColumn; 4] = [
        BoardColumn::Todo,
        BoardColumn::InProgress,
        BoardColumn::Verify,
        BoardColumn::Done,
    ];

    pub fn status(self) -> TaskStatus {
        self.into()
    }
}

impl From<BoardColumn> for TaskStatus {
    fn from(column: BoardColumn) -> Self {
        match column {
            BoardColumn::Todo => TaskStatus::Todo,
            BoardColumn::InProgress => TaskStatus::InProgress,
            BoardColumn::Verify => TaskStatus::Verify,
            BoardColumn::Done => TaskStatus::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub active_sprints: Vec<SprintRef>,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub estimation_points: Option<u32>,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl Task {
    /// A new task sitting in the backlog.
    pub fn new(id: TaskId, task_type: TaskType, title: impl Into<String>) -> Self {
        Self {
            id,
            task_type,
            title: title.into(),
            status: TaskStatus::Backlog,
            active_sprints: Vec::new(),
            parent_task_id: None,
            estimation_points: None,
            assignee: None,
        }
    }

    pub fn with_parent(mut self, parent_task_id: TaskId) -> Self {
        self.parent_task_id = Some(parent_task_id);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Place the task in `sprint`. A backlog task is promoted to `TODO`.
    pub fn in_sprint(mut self, sprint: SprintRef) -> Self {
        self.active_sprints = vec![sprint];
        if self.status == TaskStatus::Backlog {
            self.status = TaskStatus::Todo;
        }
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.estimation_points = Some(points);
        self
    }

    pub fn is_story(&self) -> bool {
        self.task_type == TaskType::UserStory
    }

    /// A leaf task nested under a story.
    pub fn is_subtask(&self) -> bool {
        self.parent_task_id.is_some()
    }

    pub fn is_in_backlog(&self) -> bool {
        self.active_sprints.is_empty()
    }

    pub fn is_in_sprint(&self, sprint_id: SprintId) -> bool {
        self.active_sprints.iter().any(|s| s.id == sprint_id)
    }

    /// `BACKLOG` status exactly when the task belongs to no sprint.
    pub fn is_consistent(&self) -> bool {
        (self.status == TaskStatus::Backlog) == self.active_sprints.is_empty()
    }

    /// The board row this task is rendered in.
    pub fn story_group(&self) -> StoryGroup {
        match self.parent_task_id {
            Some(parent) => StoryGroup::Grouped(parent),
            None => StoryGroup::Ungrouped,
        }
    }
}
