//! HTTP request handlers.

mod events;
mod health;
mod invoke;
mod runs;
mod tasks;

pub use events::check_runs;
pub use health::{check_connection, health_check};
pub use invoke::{invoke, invoke_task};
pub use runs::{get_run, list_runs};
pub use tasks::{get_task, get_task_runs, list_tasks};
