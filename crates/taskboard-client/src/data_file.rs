use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskboard_core::{BoardError, BoardResult};
use taskboard_domain::{Sprint, Task};

/// Contents of a board data file: the sprint shown on the board and every
/// task the board knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    pub sprint: Sprint,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// JSON board data on disk, written with a temp-file-and-rename so a crash
/// mid-write never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct BoardDataFile {
    path: PathBuf,
}

impl BoardDataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> BoardResult<BoardData> {
        let bytes = tokio::fs::read(&self.path).await?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        serde_json::from_slice(&bytes).map_err(|e| {
            BoardError::Serialization(format!("{}: {}", self.path.display(), e))
        })
    }

    pub async fn save(&self, data: &BoardData) -> BoardResult<()> {
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| BoardError::Serialization(e.to_string()))?;

        // Same directory as the target so the rename stays on one filesystem
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp_file = tempfile::NamedTempFile::new_in(parent)?;
        let temp_path = temp_file.into_temp_path();

        tokio::fs::write(&temp_path, &json).await?;
        temp_path
            .persist(&self.path)
            .map_err(|e| BoardError::Io(e.error.to_string()))?;

        tracing::debug!(
            "Atomically wrote {} bytes to {}",
            json.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_domain::{SprintRef, SprintStatus, TaskStatus, TaskType};
    use tempfile::tempdir;

    fn sample() -> BoardData {
        let sprint = Sprint::new(5, "Sprint 5", SprintStatus::Active);
        BoardData {
            tasks: vec![
                Task::new(1, TaskType::Task, "Write tests"),
                Task::new(2, TaskType::Bug, "Fix login")
                    .with_status(TaskStatus::Verify)
                    .in_sprint(sprint.sprint_ref()),
            ],
            sprint,
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let file = BoardDataFile::new(dir.path().join("board.json"));

        file.save(&sample()).await.unwrap();
        let loaded = file.load().await.unwrap();

        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let file = BoardDataFile::new(dir.path().join("board.json"));
        file.save(&sample()).await.unwrap();

        let mut data = sample();
        data.tasks.truncate(1);
        file.save(&data).await.unwrap();

        assert_eq!(file.load().await.unwrap().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_load_reads_wire_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(
            &path,
            r#"{
                "sprint": {"id": 5, "name": "Sprint 5", "status": "ACTIVE"},
                "tasks": [{
                    "id": 7, "type": "USER_STORY", "title": "Checkout",
                    "status": "INPROGRESS",
                    "activeSprints": [{"id": 5, "name": "Sprint 5"}]
                }]
            }"#,
        )
        .unwrap();

        let data = BoardDataFile::new(&path).load().await.unwrap();
        assert_eq!(data.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(data.tasks[0].active_sprints, vec![SprintRef::new(5, "Sprint 5")]);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = BoardDataFile::new(dir.path().join("missing.json"));
        assert!(matches!(missing.load().await, Err(BoardError::Io(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            BoardDataFile::new(&path).load().await,
            Err(BoardError::Serialization(_))
        ));
    }
}
