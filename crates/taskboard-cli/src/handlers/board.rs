use std::collections::BTreeMap;

use serde::Serialize;
use taskboard_domain::{story_points, BoardColumn, BoardRow, Sprint, StoryGroup, Task};

use crate::context::CliContext;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RowView<'a> {
    story: StoryGroup,
    title: String,
    points: u32,
    columns: BTreeMap<BoardColumn, Vec<&'a Task>>,
}

impl<'a> From<BoardRow<'a>> for RowView<'a> {
    fn from(row: BoardRow<'a>) -> Self {
        Self {
            story: row.story.group,
            title: row.story.title().to_string(),
            points: story_points(&row.story.subtasks),
            columns: row.columns,
        }
    }
}

#[derive(Serialize)]
struct BacklogItem<'a> {
    task: &'a Task,
    subtasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct BoardView<'a> {
    sprint: &'a Sprint,
    rows: Vec<RowView<'a>>,
    backlog: Vec<BacklogItem<'a>>,
}

fn backlog_items(ctx: &CliContext) -> Vec<BacklogItem<'_>> {
    let mut subtasks = ctx.session.subtask_map();
    ctx.session
        .backlog()
        .into_iter()
        .map(|task| BacklogItem {
            task,
            subtasks: subtasks.remove(&task.id).unwrap_or_default(),
        })
        .collect()
}

pub fn show(ctx: &CliContext) -> anyhow::Result<()> {
    let view = BoardView {
        sprint: ctx.session.sprint(),
        rows: ctx
            .session
            .board_rows()
            .into_iter()
            .map(RowView::from)
            .collect(),
        backlog: backlog_items(ctx),
    };
    output::output_success(view)
}

pub fn backlog(ctx: &CliContext) -> anyhow::Result<()> {
    output::output_list(backlog_items(ctx))
}
