pub mod pipeline;
pub mod runner;
pub mod slot;

pub use pipeline::{FrameOutcome, Pipeline};
pub use runner::{FrameSource, Session, SessionConfig, SessionReport};
pub use slot::LatestSlot;
