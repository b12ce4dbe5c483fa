mod classify;
mod control;
mod run;
mod traits;

pub use classify::{classify, classify_line, parse_event_line, ProviderEvent};
pub use control::{launch, RunControl, TaskHandle};
pub use run::{RunnerSettings, TaskRunner};
pub use traits::{AutomationProvider, AutomationRequest, EventByteStream};
