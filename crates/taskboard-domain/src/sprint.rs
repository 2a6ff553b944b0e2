use serde::{Deserialize, Serialize};

pub type SprintId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    Draft,
    Future,
    Active,
    Closed,
}

/// A sprint membership entry as carried on a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SprintRef {
    pub id: SprintId,
    pub name: String,
}

impl SprintRef {
    pub fn new(id: SprintId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The sprint a board is showing. Its lifecycle is managed elsewhere; the
/// board only reads the status to gate moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub name: String,
    pub status: SprintStatus,
}

impl Sprint {
    pub fn new(id: SprintId, name: impl Into<String>, status: SprintStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
        }
    }

    pub fn sprint_ref(&self) -> SprintRef {
        SprintRef::new(self.id, self.name.clone())
    }

    /// Columns are rendered disabled: no status moves within the board.
    pub fn is_board_locked(&self) -> bool {
        matches!(self.status, SprintStatus::Closed | SprintStatus::Draft)
    }

    pub fn is_closed(&self) -> bool {
        self.status == SprintStatus::Closed
    }
}
