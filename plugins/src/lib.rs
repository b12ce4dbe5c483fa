//! Concrete providers for fanline-core: Tinyfish automation, OpenRouter text
//! generation, GitHub and Stack Exchange search, and the config factory.
pub mod automation;
pub mod factory;
mod http;
pub mod llm;
pub mod search;
