use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use super::types::{Pacing, SearchPage, SearchProvider, SearchQuery, SearchResult};
use crate::retry::BackoffRetrier;

/// Fans queries out to one provider per category and returns a balanced,
/// deduplicated batch.
pub struct SearchAggregator {
    providers: Vec<Arc<dyn SearchProvider>>,
    retrier: BackoffRetrier,
    max_tasks: usize,
}

impl SearchAggregator {
    pub fn new(
        providers: Vec<Arc<dyn SearchProvider>>,
        retrier: BackoffRetrier,
        max_tasks: usize,
    ) -> Self {
        Self {
            providers,
            retrier,
            max_tasks,
        }
    }

    /// Registered categories, in registration order.
    pub fn categories(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|p| p.category().to_string())
            .collect()
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    pub fn per_category_cap(&self) -> usize {
        if self.providers.is_empty() {
            return 0;
        }
        self.max_tasks.div_ceil(self.providers.len())
    }

    /// Never fails: failed or rate-limited queries contribute nothing and an
    /// empty batch is a valid answer.
    pub async fn execute(&self, queries: &[SearchQuery]) -> Vec<SearchResult> {
        for q in queries {
            if !self.providers.iter().any(|p| p.category() == q.category) {
                tracing::warn!(category = %q.category, query = %q.text, "no provider for category; query dropped");
            }
        }

        let cap = self.per_category_cap();
        let per_category = self.providers.iter().map(|provider| {
            let texts: Vec<&str> = queries
                .iter()
                .filter(|q| q.category == provider.category())
                .map(|q| q.text.as_str())
                .collect();
            async move {
                let raw = self.search_category(provider.as_ref(), &texts).await;
                let mut picked = dedupe_by_source_url(raw);
                picked.truncate(cap);
                tracing::info!(
                    category = provider.category(),
                    queries = texts.len(),
                    picked = picked.len(),
                    "category search finished"
                );
                picked
            }
        });

        let batch: Vec<SearchResult> = join_all(per_category).await.into_iter().flatten().collect();
        if batch.is_empty() {
            tracing::warn!(queries = queries.len(), "search produced no results");
        }
        batch
    }

    async fn search_category(&self, provider: &dyn SearchProvider, texts: &[&str]) -> Vec<SearchResult> {
        let limit = provider.result_limit();
        match provider.pacing() {
            Pacing::Parallel => {
                let calls = texts.iter().map(|text| async move {
                    let page = provider.search(text, limit).await;
                    page_results(provider.category(), text, page)
                });
                join_all(calls).await.into_iter().flatten().collect()
            }
            Pacing::Sequential { delay } => {
                let mut out = Vec::new();
                for (i, text) in texts.iter().enumerate() {
                    if i > 0 {
                        tokio::time::sleep(delay).await;
                    }
                    let page = self.retrier.call(|_| provider.search(text, limit)).await;
                    out.extend(page_results(provider.category(), text, page));
                }
                out
            }
        }
    }
}

fn page_results(
    category: &str,
    query: &str,
    page: Result<SearchPage, crate::error::ProviderError>,
) -> Vec<SearchResult> {
    match page {
        Ok(SearchPage::Results(results)) => results,
        Ok(SearchPage::RateLimited { retry_after }) => {
            tracing::warn!(
                category,
                query,
                retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                "query rate limited; no results"
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(category, query, error = %e, "query failed; no results");
            Vec::new()
        }
    }
}

/// Drops later results whose `source_url` was already seen.
pub fn dedupe_by_source_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.source_url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::retry::BackoffPolicy;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn result(category: &str, url: &str) -> SearchResult {
        SearchResult {
            source_url: url.to_string(),
            title: url.rsplit('/').next().unwrap_or(url).to_string(),
            category: category.to_string(),
            snippet: String::new(),
            metadata: json!({"raw": url}),
        }
    }

    /// Returns `per_query` distinct results for each query, except queries
    /// containing "fail" (error) or "limited" (always rate limited).
    struct Fake {
        category: &'static str,
        pacing: Pacing,
        per_query: usize,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl Fake {
        fn new(category: &'static str, pacing: Pacing, per_query: usize) -> Arc<Self> {
            Arc::new(Self {
                category,
                pacing,
                per_query,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SearchProvider for Fake {
        fn category(&self) -> &str {
            self.category
        }

        fn pacing(&self) -> Pacing {
            self.pacing
        }

        async fn search(&self, query: &str, _limit: usize) -> Result<SearchPage, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), Instant::now()));
            if query.contains("fail") {
                return Err(ProviderError::Other("boom".into()));
            }
            if query.contains("limited") {
                return Ok(SearchPage::RateLimited { retry_after: None });
            }
            let base = if query.contains("dup") { "shared" } else { query };
            Ok(SearchPage::Results(
                (0..self.per_query)
                    .map(|i| result(self.category, &format!("https://x.test/{base}/{i}")))
                    .collect(),
            ))
        }
    }

    fn dyns(providers: Vec<Arc<Fake>>) -> Vec<Arc<dyn SearchProvider>> {
        providers
            .into_iter()
            .map(|p| p as Arc<dyn SearchProvider>)
            .collect()
    }

    fn queries(category: &str, texts: &[&str]) -> Vec<SearchQuery> {
        texts.iter().map(|t| SearchQuery::new(*t, category)).collect()
    }

    #[tokio::test]
    async fn dedupes_within_category_preserving_first_seen_order() {
        let so = Fake::new("stackoverflow", Pacing::Parallel, 2);
        let agg = SearchAggregator::new(dyns(vec![so]), BackoffRetrier::default(), 10);

        let out = agg
            .execute(&queries("stackoverflow", &["dup one", "dup two"]))
            .await;
        let urls: Vec<&str> = out.iter().map(|r| r.source_url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.test/shared/0", "https://x.test/shared/1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn balances_categories_and_concatenates_in_registration_order() {
        let gh = Fake::new(
            "github",
            Pacing::Sequential {
                delay: Duration::from_secs(2),
            },
            8,
        );
        let so = Fake::new("stackoverflow", Pacing::Parallel, 10);
        let agg = SearchAggregator::new(dyns(vec![gh, so]), BackoffRetrier::default(), 10);

        let mut qs = queries("stackoverflow", &["s1", "s2", "s3", "s4", "s5"]);
        qs.extend(queries("github", &["g1", "g2", "g3", "g4", "g5"]));
        let out = agg.execute(&qs).await;

        assert_eq!(out.len(), 10);
        assert!(out[..5].iter().all(|r| r.category == "github"));
        assert!(out[5..].iter().all(|r| r.category == "stackoverflow"));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_category_spaces_calls_apart() {
        let gh = Fake::new(
            "github",
            Pacing::Sequential {
                delay: Duration::from_secs(2),
            },
            1,
        );
        let agg = SearchAggregator::new(dyns(vec![gh.clone()]), BackoffRetrier::default(), 10);
        let start = Instant::now();

        agg.execute(&queries("github", &["a", "b", "c"])).await;

        let calls = gh.calls.lock().unwrap();
        let offsets: Vec<Duration> = calls.iter().map(|(_, at)| *at - start).collect();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_and_rate_limits_contribute_nothing() {
        let gh = Fake::new(
            "github",
            Pacing::Sequential {
                delay: Duration::from_millis(10),
            },
            1,
        );
        let so = Fake::new("stackoverflow", Pacing::Parallel, 1);
        let retrier = BackoffRetrier::new(BackoffPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        });
        let agg = SearchAggregator::new(dyns(vec![gh.clone(), so]), retrier, 10);

        let mut qs = queries("github", &["limited", "ok-gh"]);
        qs.extend(queries("stackoverflow", &["fail", "ok-so"]));
        qs.push(SearchQuery::new("orphan", "reddit"));
        let out = agg.execute(&qs).await;

        let urls: Vec<&str> = out.iter().map(|r| r.source_url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.test/ok-gh/0", "https://x.test/ok-so/0"]);
        // three attempts for the rate-limited query, then one for the next
        assert_eq!(gh.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn total_failure_is_an_empty_batch() {
        let so = Fake::new("stackoverflow", Pacing::Parallel, 3);
        let agg = SearchAggregator::new(dyns(vec![so]), BackoffRetrier::default(), 10);
        assert!(agg
            .execute(&queries("stackoverflow", &["fail a", "fail b"]))
            .await
            .is_empty());
    }

    #[test]
    fn cap_rounds_up() {
        let a = Fake::new("a", Pacing::Parallel, 1);
        let b = Fake::new("b", Pacing::Parallel, 1);
        let c = Fake::new("c", Pacing::Parallel, 1);
        let agg = SearchAggregator::new(dyns(vec![a, b, c]), BackoffRetrier::default(), 10);
        assert_eq!(agg.per_category_cap(), 4);
    }
}
