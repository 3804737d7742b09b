//! Generation orchestrator
//!
//! Manages calls to the external backend: read-through deduplication,
//! bounded retries with exponential backoff, per-attempt deadlines, and
//! per-fingerprint coalescing so the same request is never in flight twice.

use crate::backend::{BackendError, GenerationBackend};
use crate::request::{GenerationRequest, GenerationResult};
use ari_panel::Fingerprint;
use dashmap::DashMap;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum attempts per request (first try included)
    pub max_attempts: u32,
    /// Initial backoff between attempts
    pub base_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Deadline per attempt; expiry counts as a transient failure
    pub attempt_timeout: Duration,
    /// Dedup cache capacity (results)
    pub cache_capacity: u64,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With attempt limit
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// With per-attempt deadline
    #[inline]
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// With initial backoff
    #[inline]
    #[must_use]
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(30),
            cache_capacity: 10_000,
        }
    }
}

/// Terminal generation failure surfaced to the pipeline
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Transient failures exhausted the attempt budget
    #[error("generation failed after {attempts} attempts: {last}")]
    Failed {
        /// Attempts made
        attempts: u32,
        /// Last transient failure observed
        last: BackendError,
    },

    /// Backend rejected the request (content policy or malformed) — no retry
    #[error("generation rejected: {reason}")]
    Rejected {
        /// Backend-reported reason
        reason: String,
    },
}

/// Orchestrator call statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorStats {
    /// Backend calls actually made (retries included)
    pub backend_calls: u64,
    /// Requests answered from the dedup cache
    pub cache_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    backend_calls: AtomicU64,
    cache_hits: AtomicU64,
}

/// Orchestrates generation calls with dedup and bounded retries
///
/// Invariant: at most one in-flight backend call per fingerprint. Concurrent
/// submissions for the same fingerprint coalesce on a per-fingerprint mutex
/// and read the first caller's result through the cache.
pub struct GenerationOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    config: OrchestratorConfig,
    results: Cache<Fingerprint, GenerationResult>,
    locks: DashMap<Fingerprint, Arc<Mutex<()>>>,
    counters: Counters,
}

impl GenerationOrchestrator {
    /// Create an orchestrator around a backend
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>, config: OrchestratorConfig) -> Self {
        let results = Cache::new(config.cache_capacity);
        Self {
            backend,
            config,
            results,
            locks: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Submit a request, deduplicating on fingerprint
    ///
    /// Returns a cached result when one exists for the same fingerprint
    /// without re-invoking the backend.
    ///
    /// # Errors
    /// - [`GenerationError::Rejected`] on non-transient backend rejection
    /// - [`GenerationError::Failed`] after the attempt budget is exhausted
    pub async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        if let Some(hit) = self.results.get(&request.fingerprint).await {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(fingerprint = %request.fingerprint.short(), "dedup cache hit");
            return Ok(hit);
        }
        self.submit_inner(request, false).await
    }

    /// Submit a request, bypassing the dedup cache read
    ///
    /// Used for clinician-requested regeneration. Still holds the
    /// per-fingerprint lock, so a forced call never races a deduplicated one.
    ///
    /// # Errors
    /// Same as [`Self::submit`]
    pub async fn submit_forced(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        self.submit_inner(request, true).await
    }

    /// Current call statistics
    #[must_use]
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            backend_calls: self.counters.backend_calls.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
        }
    }

    async fn submit_inner(
        &self,
        request: &GenerationRequest,
        force: bool,
    ) -> Result<GenerationResult, GenerationError> {
        let lock = {
            let entry = self.locks.entry(request.fingerprint).or_default();
            entry.value().clone()
        };
        let outcome = self.locked_call(lock, request, force).await;

        // Our clone was consumed above; an entry only the map still holds
        // has no waiters left and can go. Coalesced submitters still queued
        // keep their clone alive, so the entry survives until the last one.
        self.locks
            .remove_if(&request.fingerprint, |_, entry| Arc::strong_count(entry) == 1);

        outcome
    }

    async fn locked_call(
        &self,
        lock: Arc<Mutex<()>>,
        request: &GenerationRequest,
        force: bool,
    ) -> Result<GenerationResult, GenerationError> {
        let _guard = lock.lock().await;

        // Read-through for callers that coalesced behind the first submitter
        if !force {
            if let Some(hit) = self.results.get(&request.fingerprint).await {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit);
            }
        }

        let result = self.call_with_retries(request).await?;
        self.results.insert(request.fingerprint, result.clone()).await;
        Ok(result)
    }

    async fn call_with_retries(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let mut attempt = 0u32;
        let mut backoff = self.config.base_backoff;

        loop {
            attempt += 1;
            self.counters.backend_calls.fetch_add(1, Ordering::Relaxed);

            let outcome = match tokio::time::timeout(
                self.config.attempt_timeout,
                self.backend.generate(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout),
            };

            match outcome {
                Ok(result) => {
                    tracing::info!(
                        fingerprint = %request.fingerprint.short(),
                        attempt,
                        artifact = %result.artifact,
                        "generation succeeded"
                    );
                    return Ok(result);
                }
                Err(error) if error.is_transient() => {
                    if attempt >= self.config.max_attempts {
                        tracing::error!(
                            fingerprint = %request.fingerprint.short(),
                            attempts = attempt,
                            %error,
                            "generation attempts exhausted"
                        );
                        return Err(GenerationError::Failed {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    tracing::warn!(
                        fingerprint = %request.fingerprint.short(),
                        attempt,
                        %error,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
                Err(error) => {
                    tracing::error!(
                        fingerprint = %request.fingerprint.short(),
                        %error,
                        "non-transient backend rejection"
                    );
                    return Err(GenerationError::Rejected {
                        reason: error.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ArtifactRef, ConditioningMode, ConditioningParams, EchoedParams};
    use parking_lot::Mutex as SyncMutex;
    use std::collections::VecDeque;

    struct ScriptedBackend {
        failures: SyncMutex<VecDeque<BackendError>>,
        calls: AtomicU64,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                failures: SyncMutex::new(VecDeque::new()),
                calls: AtomicU64::new(0),
                delay: None,
            }
        }

        fn with_failures(failures: Vec<BackendError>) -> Self {
            Self {
                failures: SyncMutex::new(failures.into()),
                calls: AtomicU64::new(0),
                delay: None,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                failures: SyncMutex::new(VecDeque::new()),
                calls: AtomicU64::new(0),
                delay: Some(delay),
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResult, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(failure) = self.failures.lock().pop_front() {
                return Err(failure);
            }
            Ok(GenerationResult {
                fingerprint: request.fingerprint,
                artifact: ArtifactRef::new(format!("stub://{}", request.fingerprint.short())),
                params: EchoedParams {
                    strength: request.conditioning.strength,
                    denoise: request.conditioning.denoise,
                    model_id: request.model_id.clone(),
                },
                generated_at: chrono::Utc::now(),
            })
        }

        fn model_id(&self) -> &str {
            "stub-model"
        }
    }

    fn request(tag: &str) -> GenerationRequest {
        GenerationRequest {
            fingerprint: Fingerprint::digest(tag.as_bytes()),
            positive_prompt: format!("prompt {tag}"),
            negative_prompt: "photorealistic".to_string(),
            conditioning: ConditioningParams {
                mode: ConditioningMode::Lineart,
                reference_panel: "INS_L1_P1_01".parse().unwrap(),
                strength: 0.8,
                denoise: 0.4,
            },
            model_id: "stub-model".to_string(),
        }
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_base_backoff(Duration::from_millis(1))
            .with_attempt_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn submit_returns_backend_result() {
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        let result = orchestrator.submit(&request("a")).await.unwrap();
        assert_eq!(result.fingerprint, request("a").fingerprint);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn duplicate_submits_hit_cache() {
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        let first = orchestrator.submit(&request("a")).await.unwrap();
        let second = orchestrator.submit(&request("a")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
        assert_eq!(orchestrator.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn concurrent_submits_coalesce_to_one_call() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_millis(20)));
        let orchestrator =
            Arc::new(GenerationOrchestrator::new(backend.clone(), fast_config()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.submit(&request("shared")).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(backend.calls(), 1);
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let backend = Arc::new(ScriptedBackend::with_failures(vec![
            BackendError::RateLimited,
            BackendError::Unavailable("503".to_string()),
        ]));
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        let result = orchestrator.submit(&request("a")).await;
        assert!(result.is_ok());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn attempts_exhausted_surfaces_failed() {
        let backend = Arc::new(ScriptedBackend::with_failures(vec![
            BackendError::Timeout,
            BackendError::Timeout,
            BackendError::Timeout,
        ]));
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        let result = orchestrator.submit(&request("a")).await;
        assert!(matches!(
            result,
            Err(GenerationError::Failed { attempts: 3, .. })
        ));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::with_failures(vec![BackendError::Rejected {
            reason: "content policy".to_string(),
        }]));
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        let result = orchestrator.submit(&request("a")).await;
        assert!(matches!(result, Err(GenerationError::Rejected { .. })));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_deadline_counts_as_transient() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_secs(60)));
        let config = OrchestratorConfig::new()
            .with_max_attempts(2)
            .with_base_backoff(Duration::from_millis(1))
            .with_attempt_timeout(Duration::from_millis(50));
        let orchestrator = GenerationOrchestrator::new(backend.clone(), config);

        let result = orchestrator.submit(&request("slow")).await;
        assert!(matches!(
            result,
            Err(GenerationError::Failed { attempts: 2, last: BackendError::Timeout })
        ));
    }

    #[tokio::test]
    async fn fingerprint_locks_are_released_after_submit() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_millis(10)));
        let orchestrator =
            Arc::new(GenerationOrchestrator::new(backend.clone(), fast_config()));

        orchestrator.submit(&request("a")).await.unwrap();
        orchestrator.submit_forced(&request("a")).await.unwrap();
        assert_eq!(orchestrator.locks.len(), 0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.submit(&request("shared")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // The last submitter out prunes the entry it coalesced on
        assert_eq!(orchestrator.locks.len(), 0);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn forced_submit_bypasses_cache() {
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = GenerationOrchestrator::new(backend.clone(), fast_config());

        orchestrator.submit(&request("a")).await.unwrap();
        orchestrator.submit_forced(&request("a")).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }
}
