//! Domain types shared by the scheduler, executor, and admission controller

mod id;
mod priority;
mod task;
mod work;

pub use id::generate_task_id;
pub use priority::Priority;
pub use task::{Task, TaskStatus};
pub use work::{WorkFn, work_fn};

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
