pub mod jsonl;
pub mod progress;

pub use jsonl::JsonlWriter;
pub use progress::{summary, ProgressRenderer};
