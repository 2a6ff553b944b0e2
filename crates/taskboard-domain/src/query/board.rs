//! Story grouping for the sprint board.

use std::collections::BTreeMap;

use crate::sprint::SprintId;
use crate::store::TaskStore;
use crate::story::{Story, StoryGroup};
use crate::task::{BoardColumn, Task};

use super::select_sprint_tasks;

/// One story row of the board with its leaf tasks bucketed by column.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow<'a> {
    pub story: Story<'a>,
    pub columns: BTreeMap<BoardColumn, Vec<&'a Task>>,
}

impl<'a> BoardRow<'a> {
    pub fn cell(&self, column: BoardColumn) -> &[&'a Task] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Group leaf tasks into stories by parent id.
///
/// Leaf tasks without a parent land in the [`StoryGroup::Ungrouped`] story,
/// which sorts last. Story tasks present in `tasks` become the header of
/// their row. Subtasks are ordered by id.
pub fn select_stories<'a>(tasks: &[&'a Task]) -> Vec<Story<'a>> {
    let mut groups: BTreeMap<StoryGroup, Story<'a>> = BTreeMap::new();

    for task in tasks {
        if task.is_story() {
            let group = StoryGroup::Grouped(task.id);
            groups
                .entry(group)
                .or_insert_with(|| empty_story(group))
                .story = Some(*task);
        } else {
            let group = task.story_group();
            groups
                .entry(group)
                .or_insert_with(|| empty_story(group))
                .subtasks
                .push(*task);
        }
    }

    groups
        .into_values()
        .map(|mut story| {
            story.subtasks.sort_by_key(|t| t.id);
            story
        })
        .collect()
}

/// Rows of the sprint board: the sprint's stories with each leaf task in
/// the column matching its status.
pub fn select_board_rows(store: &TaskStore, sprint_id: SprintId) -> Vec<BoardRow<'_>> {
    let tasks = select_sprint_tasks(store, sprint_id);
    select_stories(&tasks)
        .into_iter()
        .map(|story| {
            let mut columns: BTreeMap<BoardColumn, Vec<&Task>> = BoardColumn::ALL
                .iter()
                .map(|column| (*column, Vec::new()))
                .collect();
            for task in &story.subtasks {
                match task.status.column() {
                    Some(column) => columns.entry(column).or_default().push(*task),
                    None => tracing::debug!(
                        "Task {} is in sprint {} with BACKLOG status; not placed in a column",
                        task.id,
                        sprint_id
                    ),
                }
            }
            BoardRow { story, columns }
        })
        .collect()
}

fn empty_story<'a>(group: StoryGroup) -> Story<'a> {
    Story {
        group,
        story: None,
        subtasks: Vec::new(),
    }
}
