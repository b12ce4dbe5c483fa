//! fanline-core: fan-out/fan-in orchestration of long-running automation tasks.
//!
//! ```text
//! Pipeline::run(request)
//!   ├─ Plan     → Planner (TextGenerator ×2) → Plan { brief, queries }
//!   ├─ Search   → SearchAggregator (SearchProvider per category, BackoffRetrier)
//!   ├─ Execute  → N × TaskRunner (AutomationProvider stream) ── fan-in barrier
//!   └─ Complete → batch-complete
//!
//! EventSink ──► ProgressEvent stream ──► reducer::reduce → ClientState
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod reducer;
pub mod retry;
pub mod runner;
pub mod search;
pub mod task;
pub mod util;
