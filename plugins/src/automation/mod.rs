pub mod tinyfish;

pub use tinyfish::TinyfishAutomation;
