//! Concurrent fan-out across every configured source.
//!
//! [`Aggregator::aggregate`] spawns one task per [`SourceAdapter`] and waits
//! for all of them against a single deadline. Each task only produces its
//! own result, so no state is shared between them. The call never fails: a
//! source error, a panic, or a missed deadline becomes a
//! [`SourceOutcome::Failed`] entry in the returned [`QueryBundle`], next to
//! whatever the other sources returned.
//!
//! No adapter task outlives the call. Tasks still running at the deadline
//! are aborted, and a drop guard aborts the rest if the aggregating future
//! itself is cancelled.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use crate::config::Config;
use crate::error::{FailureReason, SourceError};
use crate::models::{Paper, SearchFilters};
use crate::sources::{ArxivAdapter, OpenAlexAdapter, RawPayload, SourceAdapter};

const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Settled result of one source.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Ok {
        items: usize,
        elapsed_ms: u64,
        payload: RawPayload,
    },
    Failed {
        reason: FailureReason,
        detail: String,
        elapsed_ms: u64,
    },
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceOutcome::Ok { .. })
    }

    pub fn payload(&self) -> Option<&RawPayload> {
        match self {
            SourceOutcome::Ok { payload, .. } => Some(payload),
            SourceOutcome::Failed { .. } => None,
        }
    }

    fn failed(error: &SourceError, elapsed_ms: u64) -> Self {
        SourceOutcome::Failed {
            reason: error.reason(),
            detail: error.to_string(),
            elapsed_ms,
        }
    }
}

/// Per-source results of one aggregated query. Never a merged list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct QueryBundle {
    pub sources: BTreeMap<String, SourceOutcome>,
}

impl QueryBundle {
    pub fn get(&self, source: &str) -> Option<&SourceOutcome> {
        self.sources.get(source)
    }

    /// Normalized papers from every successful source, grouped by source
    /// name in key order.
    pub fn papers(&self) -> Vec<Paper> {
        self.sources
            .values()
            .filter_map(SourceOutcome::payload)
            .flat_map(RawPayload::papers)
            .collect()
    }

    /// Result ids per successful source.
    pub fn result_ids(&self) -> BTreeMap<String, Vec<String>> {
        self.sources
            .iter()
            .filter_map(|(name, outcome)| outcome.payload().map(|p| (name.clone(), p.ids())))
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        self.sources.values().all(|o| !o.is_ok())
    }
}

type AdapterResult = (Result<RawPayload, SourceError>, u64);

/// Aborts every held task when dropped.
struct AbortOnDrop(Vec<JoinHandle<AdapterResult>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, timeout: Duration) -> Self {
        Self { adapters, timeout }
    }

    /// Build the enabled adapters from configuration.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let sources = &config.sources;
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        if sources.openalex.enabled {
            adapters.push(Arc::new(OpenAlexAdapter::new(
                &sources.openalex,
                &sources.user_agent,
            )?));
        }
        if sources.arxiv.enabled {
            adapters.push(Arc::new(ArxivAdapter::new(
                &sources.arxiv,
                &sources.user_agent,
            )?));
        }
        Ok(Self::new(adapters, Duration::from_millis(sources.timeout_ms)))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Query every adapter concurrently and collect each settled outcome.
    pub async fn aggregate(&self, query: &str, filters: &SearchFilters) -> QueryBundle {
        let started = Instant::now();
        // overflowing timeouts fall back to a year-long deadline
        let deadline = started
            .checked_add(self.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let limit = filters.effective_limit();

        let names: Vec<String> = self.adapters.iter().map(|a| a.name().to_string()).collect();
        let mut tasks = AbortOnDrop(
            self.adapters
                .iter()
                .map(|adapter| {
                    let adapter = Arc::clone(adapter);
                    let query = query.to_string();
                    let filters = filters.clone();
                    tokio::spawn(async move {
                        let t0 = Instant::now();
                        let result = adapter.search(&query, &filters, limit).await;
                        (result, t0.elapsed().as_millis() as u64)
                    })
                })
                .collect(),
        );

        let mut bundle = QueryBundle::default();
        for (name, handle) in names.into_iter().zip(tasks.0.iter_mut()) {
            let outcome = match timeout_at(deadline, &mut *handle).await {
                Ok(Ok((Ok(payload), elapsed_ms))) => SourceOutcome::Ok {
                    items: payload.len(),
                    elapsed_ms,
                    payload,
                },
                Ok(Ok((Err(e), elapsed_ms))) => {
                    tracing::warn!(source = %name, error = %e, "source failed");
                    SourceOutcome::failed(&e, elapsed_ms)
                }
                Ok(Err(join_err)) => {
                    tracing::warn!(source = %name, error = %join_err, "source task aborted");
                    SourceOutcome::Failed {
                        reason: FailureReason::Aborted,
                        detail: join_err.to_string(),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                }
                Err(_) => {
                    handle.abort();
                    let e = SourceError::Timeout {
                        source_name: name.clone(),
                        after_ms: self.timeout.as_millis() as u64,
                    };
                    tracing::warn!(source = %name, error = %e, "source timed out");
                    SourceOutcome::failed(&e, started.elapsed().as_millis() as u64)
                }
            };
            bundle.sources.insert(name, outcome);
        }

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::{ArxivFeed, OpenAlexResponse, OpenAlexWork};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedAdapter {
        name: &'static str,
        items: usize,
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn name(&self) -> &str {
            self.name
        }
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: u32,
        ) -> Result<RawPayload, SourceError> {
            let results = (0..self.items)
                .map(|i| OpenAlexWork {
                    id: Some(format!("https://openalex.org/W{}", i)),
                    title: Some(format!("Work {}", i)),
                    ..Default::default()
                })
                .collect();
            Ok(RawPayload::OpenAlex(OpenAlexResponse {
                meta: None,
                results,
            }))
        }
    }

    struct FailingAdapter(SourceError);

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "arxiv"
        }
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: u32,
        ) -> Result<RawPayload, SourceError> {
            Err(self.0.clone())
        }
    }

    struct SlowAdapter {
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SourceAdapter for SlowAdapter {
        fn name(&self) -> &str {
            "slow"
        }
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: u32,
        ) -> Result<RawPayload, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(RawPayload::Arxiv(ArxivFeed::default()))
        }
    }

    struct PanickingAdapter;

    #[async_trait]
    impl SourceAdapter for PanickingAdapter {
        fn name(&self) -> &str {
            "panics"
        }
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: u32,
        ) -> Result<RawPayload, SourceError> {
            panic!("adapter bug");
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_results() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FixedAdapter {
                name: "openalex",
                items: 3,
            }),
            Arc::new(FailingAdapter(SourceError::unavailable(
                "arxiv",
                "connection refused",
            ))),
        ];
        let aggregator = Aggregator::new(adapters, Duration::from_secs(5));

        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert_eq!(bundle.sources.len(), 2);
        match bundle.get("openalex").unwrap() {
            SourceOutcome::Ok { items, .. } => assert_eq!(*items, 3),
            other => panic!("expected ok, got {:?}", other),
        }
        match bundle.get("arxiv").unwrap() {
            SourceOutcome::Failed { reason, detail, .. } => {
                assert_eq!(*reason, FailureReason::Unavailable);
                assert!(detail.contains("connection refused"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(bundle.papers().len(), 3);
        assert_eq!(bundle.result_ids()["openalex"].len(), 3);
        assert!(!bundle.result_ids().contains_key("arxiv"));
    }

    #[tokio::test]
    async fn test_rejected_is_recorded_not_raised() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(FailingAdapter(
            SourceError::Rejected {
                source_name: "arxiv".to_string(),
                status: 400,
                body: "bad query".to_string(),
            },
        ))];
        let aggregator = Aggregator::new(adapters, Duration::from_secs(5));
        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert!(bundle.all_failed());
        assert!(matches!(
            bundle.get("arxiv"),
            Some(SourceOutcome::Failed {
                reason: FailureReason::Rejected,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_timeout_marks_straggler_and_cancels_it() {
        let finished = Arc::new(AtomicBool::new(false));
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(FixedAdapter {
                name: "openalex",
                items: 1,
            }),
            Arc::new(SlowAdapter {
                delay: Duration::from_millis(300),
                finished: finished.clone(),
            }),
        ];
        let aggregator = Aggregator::new(adapters, Duration::from_millis(50));

        let t0 = std::time::Instant::now();
        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert!(t0.elapsed() < Duration::from_millis(250));

        assert!(bundle.get("openalex").unwrap().is_ok());
        assert!(matches!(
            bundle.get("slow"),
            Some(SourceOutcome::Failed {
                reason: FailureReason::Timeout,
                ..
            })
        ));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_adapter_is_aborted_outcome() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(PanickingAdapter),
            Arc::new(FixedAdapter {
                name: "openalex",
                items: 2,
            }),
        ];
        let aggregator = Aggregator::new(adapters, Duration::from_secs(5));
        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert!(matches!(
            bundle.get("panics"),
            Some(SourceOutcome::Failed {
                reason: FailureReason::Aborted,
                ..
            })
        ));
        assert!(bundle.get("openalex").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow_deadline() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(FixedAdapter {
            name: "openalex",
            items: 1,
        })];
        let aggregator = Aggregator::new(adapters, Duration::from_millis(u64::MAX));
        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert!(bundle.get("openalex").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_no_adapters_yields_empty_bundle() {
        let aggregator = Aggregator::new(Vec::new(), Duration::from_secs(1));
        let bundle = aggregator.aggregate("q", &SearchFilters::default()).await;
        assert!(bundle.sources.is_empty());
        assert!(bundle.papers().is_empty());
    }

    #[test]
    fn test_bundle_serializes_status_tag() {
        let mut bundle = QueryBundle::default();
        bundle.sources.insert(
            "arxiv".to_string(),
            SourceOutcome::Failed {
                reason: FailureReason::Timeout,
                detail: "late".to_string(),
                elapsed_ms: 7,
            },
        );
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["arxiv"]["status"], "failed");
        assert_eq!(json["arxiv"]["reason"], "timeout");
    }
}
