use serde::Serialize;
use taskboard_core::{BoardError, Notification};
use taskboard_domain::{DragEvent, DropOutcome, DropTarget, MoveIntent, StoryGroup, Task};

use crate::cli::MoveArgs;
use crate::context::CliContext;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveReport {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<MoveIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<String>,
    notifications: Vec<Notification>,
    task: Option<Task>,
}

pub async fn handle_move(ctx: &mut CliContext, args: MoveArgs) -> anyhow::Result<()> {
    let target = match args.to.column() {
        None => DropTarget::Backlog,
        Some(column) => {
            let story = match args.story {
                Some(story_id) => StoryGroup::Grouped(story_id),
                None => ctx
                    .session
                    .task(args.task)
                    .map(Task::story_group)
                    .unwrap_or(StoryGroup::Ungrouped),
            };
            DropTarget::Column { story, column }
        }
    };

    if let Some(message) = args.fail {
        ctx.service.fail_next(BoardError::Rejected(message));
    }

    let events = [
        DragEvent::Start {
            task_id: args.task,
            source: args.from.into(),
        },
        DragEvent::Over { target },
        DragEvent::Drop { target },
    ];
    let mut outcome = None;
    for event in events {
        outcome = ctx.session.handle_drag(event).or(outcome);
    }

    let report = match outcome {
        Some(DropOutcome::Accepted(intent)) => {
            ctx.session.settle().await;
            ctx.save().await?;
            tracing::info!("Move of task {} settled", args.task);
            MoveReport {
                accepted: true,
                intent: Some(intent),
                rejection: None,
                notifications: ctx.session.take_notifications(),
                task: ctx.session.task(args.task).cloned(),
            }
        }
        Some(DropOutcome::Rejected(rejection)) => MoveReport {
            accepted: false,
            intent: None,
            rejection: Some(rejection.to_string()),
            notifications: ctx.session.take_notifications(),
            task: ctx.session.task(args.task).cloned(),
        },
        None => anyhow::bail!("Drag of task {} did not end in a drop", args.task),
    };

    output::output_success(report)
}
