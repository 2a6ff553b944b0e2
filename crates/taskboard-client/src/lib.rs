pub mod data_file;
pub mod memory;
pub mod service;

pub use data_file::{BoardData, BoardDataFile};
pub use memory::InMemoryTaskService;
pub use service::TaskService;
