#[allow(clippy::module_inception)]
pub mod error;
pub mod provider;

pub use error::{CliError, ConfigError, PipelineError};
pub use provider::ProviderError;
