mod clock;
mod task;

pub use clock::Clock;
pub use task::{Task, TaskStatus};
