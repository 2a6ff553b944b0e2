use std::path::Path;
use std::sync::Arc;

use taskboard_client::{BoardData, BoardDataFile, InMemoryTaskService};
use taskboard_core::{BoardConfig, BoardResult};
use taskboard_session::BoardSession;

/// A board session backed by a data file.
///
/// The file plays the server: an in-memory service is seeded from it, the
/// session loads through that service, and after a move the service's
/// state is written back.
pub struct CliContext {
    pub session: BoardSession,
    pub service: Arc<InMemoryTaskService>,
    file: BoardDataFile,
}

impl CliContext {
    pub async fn load(file_path: &Path, config_path: Option<&Path>) -> BoardResult<Self> {
        let config = match config_path {
            Some(path) => BoardConfig::from_path(path)?,
            None => BoardConfig::load(),
        };
        tracing::debug!("Using config {:?}", config);

        let file = BoardDataFile::new(file_path);
        let data = file.load().await?;
        let service = Arc::new(InMemoryTaskService::new(
            vec![data.sprint.clone()],
            data.tasks,
        ));
        let session = BoardSession::load(data.sprint, service.clone(), &config).await?;

        Ok(Self {
            session,
            service,
            file,
        })
    }

    pub async fn save(&self) -> BoardResult<()> {
        let data = BoardData {
            sprint: self.session.sprint().clone(),
            tasks: self.service.tasks(),
        };
        self.file.save(&data).await
    }
}
