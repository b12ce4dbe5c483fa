mod aggregator;
mod types;

pub use aggregator::{dedupe_by_source_url, SearchAggregator};
pub use types::{Pacing, SearchPage, SearchProvider, SearchQuery, SearchResult};
