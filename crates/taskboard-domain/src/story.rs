use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// The board row a leaf task belongs to.
///
/// Variant order matters: grouped stories sort by id and `Ungrouped` sorts
/// after all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "storyId")]
pub enum StoryGroup {
    Grouped(TaskId),
    Ungrouped,
}

impl StoryGroup {
    pub fn story_id(self) -> Option<TaskId> {
        match self {
            StoryGroup::Grouped(id) => Some(id),
            StoryGroup::Ungrouped => None,
        }
    }
}

/// A story row: the story task (when it is part of the selected set) and
/// its leaf tasks ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Story<'a> {
    pub group: StoryGroup,
    pub story: Option<&'a Task>,
    pub subtasks: Vec<&'a Task>,
}

impl Story<'_> {
    pub fn title(&self) -> &str {
        match (self.group, self.story) {
            (_, Some(story)) => &story.title,
            (StoryGroup::Grouped(_), None) => "",
            (StoryGroup::Ungrouped, None) => "Other tasks",
        }
    }
}
