pub mod dispatch;
pub mod state;
pub mod tracker;

pub use state::{Phase, SpreadState};
pub use tracker::SpreadTracker;
