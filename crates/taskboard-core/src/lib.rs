pub mod config;
pub mod error;
pub mod notification;
pub mod result;

pub use config::{BoardConfig, FailurePolicy};
pub use error::BoardError;
pub use notification::{Notification, NotificationLevel, NotificationLog};
pub use result::BoardResult;
