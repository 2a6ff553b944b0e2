use std::collections::HashMap;

use taskboard_domain::TaskId;

/// Identifies one dispatched server request. Strictly increasing within a
/// session.
pub type RequestVersion = u64;

/// The latest request issued for each task.
///
/// A response may only overwrite a task when it answers that task's latest
/// request; anything older lost the race to a later drop.
#[derive(Debug, Default)]
pub struct RequestVersions {
    next: RequestVersion,
    latest: HashMap<TaskId, RequestVersion>,
}

impl RequestVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new version and record it as the latest for every task in
    /// `task_ids`.
    pub fn issue(&mut self, task_ids: &[TaskId]) -> RequestVersion {
        self.next += 1;
        for task_id in task_ids {
            self.latest.insert(*task_id, self.next);
        }
        self.next
    }

    pub fn latest(&self, task_id: TaskId) -> Option<RequestVersion> {
        self.latest.get(&task_id).copied()
    }

    pub fn is_latest(&self, task_id: TaskId, version: RequestVersion) -> bool {
        self.latest(task_id) == Some(version)
    }
}
