pub mod scheduler;
pub mod view;

pub use scheduler::{Poller, PollerCommand, PollerHandle, TaskKind};
pub use view::{DataSource, LiveView};
