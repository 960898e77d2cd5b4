pub mod database;
pub mod in_memory_task_repository;

pub use database::*;
pub use in_memory_task_repository::InMemoryTaskRepository;
