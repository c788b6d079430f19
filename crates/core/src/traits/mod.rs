pub mod collaborators;
pub mod dispatch;
pub mod task_queue;

pub use collaborators::*;
pub use dispatch::*;
pub use task_queue::*;
