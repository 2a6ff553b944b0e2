use serde::{Deserialize, Serialize};

use crate::field_update::FieldUpdate;
use crate::sprint::SprintId;
use crate::task::TaskStatus;

/// Body of an `updateTask` call. Untouched fields are left out of the JSON;
/// `"sprintId": null` takes the task out of its sprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub sprint_id: FieldUpdate<SprintId>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn add_to_sprint(sprint_id: SprintId) -> Self {
        Self {
            sprint_id: FieldUpdate::Set(sprint_id),
            ..Self::default()
        }
    }

    pub fn remove_from_sprint() -> Self {
        Self {
            sprint_id: FieldUpdate::Clear,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.sprint_id.is_no_change()
    }
}
