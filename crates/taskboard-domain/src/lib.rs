pub mod drag;
pub mod field_update;
pub mod patch;
pub mod plan;
pub mod query;
pub mod reducer;
pub mod sprint;
pub mod store;
pub mod story;
pub mod task;
pub mod validator;

pub use drag::{DragEvent, DragMachine, Dragging, DropOutcome, Idle};
pub use field_update::FieldUpdate;
pub use patch::TaskPatch;
pub use plan::{Cascade, CascadeKind};
pub use query::{
    select_backlog_tasks, select_board_rows, select_sprint_tasks, select_stories,
    select_subtask_map, story_points, BoardRow,
};
pub use reducer::{apply, apply_all, OptimisticAction};
pub use sprint::{Sprint, SprintId, SprintRef, SprintStatus};
pub use store::TaskStore;
pub use story::{Story, StoryGroup};
pub use task::{BoardColumn, Task, TaskId, TaskStatus, TaskType};
pub use validator::{
    can_move, is_potential_target, validate_move, DragSource, DropTarget, MoveIntent,
    MoveRejection,
};
