//! The variant pipeline
//!
//! Strictly ordered stages per job: derive spec, compile request, generate,
//! validate, route through the approval workflow, deliver. Every stage
//! transition is audited; cancellation is checked between stages.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job::{CancelToken, FallbackReason, JobOutcome, VariantJob};
use crate::resume::{resume_stage, ResumePoint};
use crate::review_queue::{ReviewCase, ReviewPriority, ReviewQueue};
use ari_audit::{AuditError, AuditLog, AuditRecord, PipelineStage};
use ari_backend::{
    ArtifactRef, GenerationBackend, GenerationError, GenerationOrchestrator, GenerationRequest,
    GenerationResult,
};
use ari_policy::{PromptBuilder, SpecGenerator, TransformationSpec};
use ari_review::{
    PanelScorer, ReviewDecision, ReviewWorkflow, ValidationReport, Validator, Verdict,
};
use chrono::Utc;
use std::sync::Arc;

/// Orchestrates the full life of a variant job
pub struct Pipeline {
    config: PipelineConfig,
    spec_generator: SpecGenerator,
    prompt_builder: PromptBuilder,
    orchestrator: GenerationOrchestrator,
    scorer: Arc<dyn PanelScorer>,
    validator: Validator,
    audit: Arc<AuditLog>,
    reviews: Arc<ReviewQueue>,
}

impl Pipeline {
    /// Assemble a pipeline around a backend and a scorer
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn GenerationBackend>,
        scorer: Arc<dyn PanelScorer>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let orchestrator = GenerationOrchestrator::new(backend, config.orchestrator.clone());
        let prompt_builder = PromptBuilder::new(config.model_id.clone());
        let validator = Validator::new(config.validator.clone());
        Self {
            config,
            spec_generator: SpecGenerator::new(),
            prompt_builder,
            orchestrator,
            scorer,
            validator,
            audit,
            reviews: Arc::new(ReviewQueue::new()),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The review queue clinicians work against
    #[inline]
    #[must_use]
    pub fn review_queue(&self) -> &Arc<ReviewQueue> {
        &self.reviews
    }

    /// The audit log
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Run one job to a terminal outcome
    ///
    /// # Errors
    /// Returns [`PipelineError`] only for fatal failures (bad metadata,
    /// unresolvable policy, scorer/audit infrastructure). Generation
    /// failures and rejections resolve to a fallback outcome instead.
    pub async fn run_job(
        &self,
        job: &VariantJob,
        cancel: &CancelToken,
    ) -> Result<JobOutcome, PipelineError> {
        tracing::info!(job = %job.id, panel = %job.panel.id, policy = %job.policy.id, "job started");

        if cancel.is_cancelled() {
            return self.cancelled(job, 0);
        }

        let spec = self.spec_generator.derive(&job.panel, &job.policy)?;
        self.record(
            job,
            1,
            PipelineStage::SpecDerived,
            serde_json::json!({
                "policy_version": spec.policy_version(),
                "slots": spec.slots().len(),
            }),
        )?;

        let request = self.prompt_builder.build(&spec)?;
        self.record(
            job,
            1,
            PipelineStage::RequestCompiled,
            serde_json::json!({
                "fingerprint": request.fingerprint.to_string(),
                "conditioning": request.conditioning.mode.as_str(),
                "model": request.model_id,
            }),
        )?;

        let mut attempt = 1u32;
        loop {
            if cancel.is_cancelled() {
                return self.cancelled(job, attempt);
            }

            let result = match self.generate(&request, attempt).await {
                Ok(result) => result,
                Err(GenerationError::Failed { attempts, last }) => {
                    self.record(
                        job,
                        attempt,
                        PipelineStage::Generated,
                        serde_json::json!({ "ok": false, "attempts": attempts, "error": last.to_string() }),
                    )?;
                    return self.fallback(job, attempt, FallbackReason::GenerationFailed);
                }
                Err(GenerationError::Rejected { reason }) => {
                    self.record(
                        job,
                        attempt,
                        PipelineStage::Generated,
                        serde_json::json!({ "ok": false, "rejected": reason }),
                    )?;
                    return self.fallback(job, attempt, FallbackReason::GenerationRejected);
                }
            };
            self.record(
                job,
                attempt,
                PipelineStage::Generated,
                serde_json::json!({ "ok": true, "artifact": result.artifact.as_str() }),
            )?;

            if cancel.is_cancelled() {
                // Result discarded; only the cache keeps it
                return self.cancelled(job, attempt);
            }

            let scores = self.scorer.score(&spec, &result).await?;
            let report = self.validator.evaluate(&spec, &scores);
            self.record(
                job,
                attempt,
                PipelineStage::Validated,
                serde_json::json!({ "verdict": report.verdict, "checks": report.checks }),
            )?;

            let mut workflow = ReviewWorkflow::new();
            workflow.apply_verdict(report.verdict)?;
            self.record(
                job,
                attempt,
                PipelineStage::ReviewTransition,
                serde_json::json!({ "state": workflow.state().as_str() }),
            )?;

            match report.verdict {
                Verdict::AutoPass => return self.approved(job, attempt, &result, report),
                Verdict::AutoReject => {
                    return self.fallback(job, attempt, FallbackReason::AutoRejected);
                }
                Verdict::Flagged => {
                    match self
                        .review(job, attempt, &spec, &result, report.clone(), &mut workflow)
                        .await?
                    {
                        ReviewResolution::Approved => {
                            return self.approved(job, attempt, &result, report);
                        }
                        ReviewResolution::Rejected => {
                            return self.fallback(job, attempt, FallbackReason::ClinicianRejected);
                        }
                        ReviewResolution::Regenerate => {
                            if attempt >= self.config.max_generation_attempts {
                                workflow.exhaust_attempts()?;
                                self.record(
                                    job,
                                    attempt,
                                    PipelineStage::ReviewTransition,
                                    serde_json::json!({ "state": workflow.state().as_str() }),
                                )?;
                                return self.fallback(
                                    job,
                                    attempt,
                                    FallbackReason::AttemptsExhausted,
                                );
                            }
                            workflow.restart()?;
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }

    /// Run a job against whatever its audit trail already records
    ///
    /// Folds the (panel, policy) trail to a resume point: a resolved trail
    /// replays its terminal outcome without touching the backend or the
    /// scorer; anything else re-runs [`Self::run_job`] from the top, where
    /// the dedup cache absorbs generation work that already completed.
    ///
    /// # Errors
    /// [`PipelineError::TrailIncomplete`] when a resolved trail lacks the
    /// records needed to reconstruct its outcome; otherwise as
    /// [`Self::run_job`].
    pub async fn resume_job(
        &self,
        job: &VariantJob,
        cancel: &CancelToken,
    ) -> Result<JobOutcome, PipelineError> {
        let trail = self.audit.records_for(&job.panel.id, &job.policy.id);
        match resume_stage(&trail) {
            ResumePoint::Resolved { stage } => {
                tracing::info!(job = %job.id, stage = stage.as_str(), "trail resolved, replaying outcome");
                self.replay_outcome(job, &trail)
            }
            ResumePoint::NotStarted => self.run_job(job, cancel).await,
            ResumePoint::InProgress { stage, attempt } => {
                tracing::info!(
                    job = %job.id,
                    stage = stage.as_str(),
                    attempt,
                    "trail interrupted mid-flight, re-running"
                );
                self.run_job(job, cancel).await
            }
        }
    }

    fn replay_outcome(
        &self,
        job: &VariantJob,
        trail: &[AuditRecord],
    ) -> Result<JobOutcome, PipelineError> {
        let incomplete = |detail| PipelineError::TrailIncomplete {
            panel: job.panel.id.clone(),
            detail,
        };
        let last = trail.last().ok_or_else(|| incomplete("no records"))?;
        if last.stage == PipelineStage::Cancelled {
            return Ok(JobOutcome::Cancelled);
        }

        match last.params.get("variant").and_then(serde_json::Value::as_bool) {
            Some(true) => {
                let artifact = last
                    .params
                    .get("artifact")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| incomplete("delivery record names no artifact"))?;
                let validated = trail
                    .iter()
                    .rev()
                    .find(|record| record.stage == PipelineStage::Validated)
                    .ok_or_else(|| incomplete("approved delivery without a validation record"))?;
                let report: ValidationReport = serde_json::from_value(validated.params.clone())
                    .map_err(AuditError::Serialization)?;
                Ok(JobOutcome::Approved {
                    artifact: ArtifactRef::new(artifact),
                    report,
                })
            }
            Some(false) => {
                let reason = last
                    .params
                    .get("fallback_reason")
                    .cloned()
                    .ok_or_else(|| incomplete("fallback delivery names no reason"))?;
                let reason: FallbackReason =
                    serde_json::from_value(reason).map_err(AuditError::Serialization)?;
                Ok(JobOutcome::Fallback {
                    canonical: job.panel.id.clone(),
                    reason,
                })
            }
            None => Err(incomplete("delivery record carries no variant flag")),
        }
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        attempt: u32,
    ) -> Result<GenerationResult, GenerationError> {
        if attempt == 1 {
            self.orchestrator.submit(request).await
        } else {
            // Regeneration must produce a fresh artifact, not the cached one
            self.orchestrator.submit_forced(request).await
        }
    }

    async fn review(
        &self,
        job: &VariantJob,
        attempt: u32,
        spec: &TransformationSpec,
        result: &GenerationResult,
        report: ValidationReport,
        workflow: &mut ReviewWorkflow,
    ) -> Result<ReviewResolution, PipelineError> {
        workflow.begin_review()?;
        self.record(
            job,
            attempt,
            PipelineStage::ReviewTransition,
            serde_json::json!({ "state": workflow.state().as_str() }),
        )?;

        let mut rx = self.reviews.enqueue(ReviewCase {
            job: job.id,
            panel: job.panel.id.clone(),
            policy: job.policy.id.clone(),
            attempt,
            artifact: result.artifact.clone(),
            spec: spec.clone(),
            report,
            enqueued_at: Utc::now(),
            priority: ReviewPriority::Normal,
        });

        let record = loop {
            match tokio::time::timeout(self.config.review_sla, &mut rx).await {
                Ok(Ok(record)) => break record,
                Ok(Err(_)) => return Err(PipelineError::ReviewAbandoned { job: job.id }),
                Err(_) => {
                    // SLA exceeded: escalate once, keep waiting
                    if self.reviews.escalate(job.id) {
                        self.record(
                            job,
                            attempt,
                            PipelineStage::ReviewEscalated,
                            serde_json::json!({ "sla_secs": self.config.review_sla.as_secs() }),
                        )?;
                    }
                }
            }
        };

        workflow.apply_decision(&record)?;
        self.record(
            job,
            attempt,
            PipelineStage::ReviewDecision,
            serde_json::json!({
                "decision": record.decision,
                "reviewer": record.reviewer,
                "rationale": record.rationale,
            }),
        )?;

        Ok(match record.decision {
            ReviewDecision::Approve => ReviewResolution::Approved,
            ReviewDecision::Reject => ReviewResolution::Rejected,
            ReviewDecision::RequestRegeneration => ReviewResolution::Regenerate,
        })
    }

    fn approved(
        &self,
        job: &VariantJob,
        attempt: u32,
        result: &GenerationResult,
        report: ValidationReport,
    ) -> Result<JobOutcome, PipelineError> {
        self.record(
            job,
            attempt,
            PipelineStage::Delivered,
            serde_json::json!({ "variant": true, "artifact": result.artifact.as_str() }),
        )?;
        tracing::info!(job = %job.id, artifact = %result.artifact, "variant approved and delivered");
        Ok(JobOutcome::Approved {
            artifact: result.artifact.clone(),
            report,
        })
    }

    fn fallback(
        &self,
        job: &VariantJob,
        attempt: u32,
        reason: FallbackReason,
    ) -> Result<JobOutcome, PipelineError> {
        self.record(
            job,
            attempt,
            PipelineStage::Delivered,
            serde_json::json!({ "variant": false, "fallback_reason": reason }),
        )?;
        tracing::warn!(job = %job.id, ?reason, "canonical panel delivered as fallback");
        Ok(JobOutcome::Fallback {
            canonical: job.panel.id.clone(),
            reason,
        })
    }

    fn cancelled(&self, job: &VariantJob, attempt: u32) -> Result<JobOutcome, PipelineError> {
        self.record(
            job,
            attempt.max(1),
            PipelineStage::Cancelled,
            serde_json::json!({}),
        )?;
        tracing::info!(job = %job.id, "job cancelled");
        Ok(JobOutcome::Cancelled)
    }

    fn record(
        &self,
        job: &VariantJob,
        attempt: u32,
        stage: PipelineStage,
        params: serde_json::Value,
    ) -> Result<(), PipelineError> {
        self.audit.append(AuditRecord::new(
            job.panel.id.clone(),
            job.policy.id.clone(),
            attempt,
            stage,
            params,
        ))?;
        Ok(())
    }
}

enum ReviewResolution {
    Approved,
    Rejected,
    Regenerate,
}
