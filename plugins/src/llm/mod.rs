pub mod openrouter;

pub use openrouter::OpenRouterGenerator;
