use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use taskboard_domain::{BoardColumn, DragSource, TaskId};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Drive a sprint board from the command line", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the board data file (or set TASKBOARD_FILE env var)
    #[arg(long, short, value_name = "FILE", env = "TASKBOARD_FILE")]
    pub file: PathBuf,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "CONFIG", env = "TASKBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the board rows and the backlog
    Show,
    /// Print the backlog
    Backlog,
    /// Drag a task onto a target and wait for the server
    Move(MoveArgs),
}

#[derive(Args)]
pub struct MoveArgs {
    #[arg(long)]
    pub task: TaskId,
    /// Where the drag starts
    #[arg(long, value_enum)]
    pub from: SourceArg,
    /// Where the task is dropped
    #[arg(long, value_enum)]
    pub to: TargetArg,
    /// Story row of the target column (defaults to the task's own row)
    #[arg(long)]
    pub story: Option<TaskId>,
    /// Make the server reject the request with this message
    #[arg(long, value_name = "MESSAGE")]
    pub fail: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Backlog,
    Sprint,
}

impl From<SourceArg> for DragSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Backlog => DragSource::Backlog,
            SourceArg::Sprint => DragSource::Sprint,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TargetArg {
    Backlog,
    Todo,
    Inprogress,
    Verify,
    Done,
}

impl TargetArg {
    /// The board column, or `None` for the backlog panel.
    pub fn column(self) -> Option<BoardColumn> {
        match self {
            TargetArg::Backlog => None,
            TargetArg::Todo => Some(BoardColumn::Todo),
            TargetArg::Inprogress => Some(BoardColumn::InProgress),
            TargetArg::Verify => Some(BoardColumn::Verify),
            TargetArg::Done => Some(BoardColumn::Done),
        }
    }
}
