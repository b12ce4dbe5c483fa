mod sink;
mod types;

pub use sink::EventSink;
pub use types::{ProgressEvent, Stage};
