//! A sprint board session: optimistic moves against a task service.
//!
//! [`BoardSession`] ties the pure pieces from `taskboard-domain` (store,
//! drag machine, validator, reducer) to an asynchronous [`TaskService`]
//! through the [`TransitionOrchestrator`].
//!
//! [`TaskService`]: taskboard_client::TaskService

pub mod orchestrator;
pub mod session;
pub mod versions;

pub use orchestrator::{Completion, TransitionOrchestrator};
pub use session::BoardSession;
pub use versions::{RequestVersion, RequestVersions};
