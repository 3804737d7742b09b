//! Pipeline configuration

use ari_backend::OrchestratorConfig;
use ari_review::ValidatorConfig;
use std::time::Duration;

/// Tuning knobs for the variant pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target backend model identifier
    pub model_id: String,
    /// Generation attempts per job, regenerations included
    pub max_generation_attempts: u32,
    /// Concurrent jobs in the worker pool
    pub worker_concurrency: usize,
    /// Review SLA; exceeding it escalates priority once
    pub review_sla: Duration,
    /// Orchestrator configuration
    pub orchestrator: OrchestratorConfig,
    /// Validator thresholds
    pub validator: ValidatorConfig,
}

impl PipelineConfig {
    /// Create a configuration for the given model
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            max_generation_attempts: 3,
            worker_concurrency: 4,
            review_sla: Duration::from_secs(24 * 60 * 60),
            orchestrator: OrchestratorConfig::default(),
            validator: ValidatorConfig::default(),
        }
    }

    /// With generation attempt limit
    #[inline]
    #[must_use]
    pub fn with_max_generation_attempts(mut self, max: u32) -> Self {
        self.max_generation_attempts = max;
        self
    }

    /// With worker concurrency
    #[inline]
    #[must_use]
    pub fn with_worker_concurrency(mut self, workers: usize) -> Self {
        self.worker_concurrency = workers;
        self
    }

    /// With review SLA
    #[inline]
    #[must_use]
    pub fn with_review_sla(mut self, sla: Duration) -> Self {
        self.review_sla = sla;
        self
    }

    /// With orchestrator configuration
    #[inline]
    #[must_use]
    pub fn with_orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = config;
        self
    }

    /// With validator thresholds
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, config: ValidatorConfig) -> Self {
        self.validator = config;
        self
    }
}
