pub mod state;
pub mod supervisor;
pub mod task;

pub use state::WatchState;
pub use supervisor::Supervisor;
pub use task::{WatchHandle, WatchTask};
