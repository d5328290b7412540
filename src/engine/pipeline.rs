// src/engine/pipeline.rs
//
// Per-request lifecycle tracking.
//
//   Received -> Normalized -> Encrypted -> Decrypted -> MetricsComputed -> Responded
//        \___________\____________\___________\________________\______-> Failed
//
// Transitions are strictly forward. Each one is logged at debug level with
// the time spent in the stage it closes.

use crate::error::{EndcryptError, ErrorCategory, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Normalized,
    Encrypted,
    Decrypted,
    MetricsComputed,
    Responded,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Normalized => "normalized",
            Stage::Encrypted => "encrypted",
            Stage::Decrypted => "decrypted",
            Stage::MetricsComputed => "metrics_computed",
            Stage::Responded => "responded",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Responded | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time spent reaching each stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    /// Decode and resize.
    pub normalize: Duration,
    /// Key derivation, round scheduling and encryption.
    pub encrypt: Duration,
    pub decrypt: Duration,
    pub metrics: Duration,
    /// PNG encoding of the output images.
    pub encode: Duration,
    pub total: Duration,
}

impl StageTimings {
    fn slot(&mut self, stage: Stage) -> Option<&mut Duration> {
        match stage {
            Stage::Normalized => Some(&mut self.normalize),
            Stage::Encrypted => Some(&mut self.encrypt),
            Stage::Decrypted => Some(&mut self.decrypt),
            Stage::MetricsComputed => Some(&mut self.metrics),
            Stage::Responded => Some(&mut self.encode),
            Stage::Received | Stage::Failed => None,
        }
    }
}

/// Why a request ended in [`Stage::Failed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureReason {
    /// Last stage reached before the failure.
    pub stage: Stage,
    pub category: ErrorCategory,
    pub message: String,
}

#[derive(Debug)]
pub struct RequestPipeline {
    id: u64,
    stage: Stage,
    started: Instant,
    stage_started: Instant,
    timings: StageTimings,
    failure: Option<FailureReason>,
}

impl Default for RequestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestPipeline {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            stage: Stage::Received,
            started: now,
            stage_started: now,
            timings: StageTimings::default(),
            failure: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    /// Set once the pipeline reaches [`Stage::Failed`].
    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    /// Move to `next`. Skipping ahead is allowed, moving back or leaving a
    /// terminal stage is not.
    pub fn advance(&mut self, next: Stage) -> Result<()> {
        if self.stage.is_terminal() || next <= self.stage || next == Stage::Failed {
            return Err(EndcryptError::internal_panic(format!(
                "invalid pipeline transition {} -> {}",
                self.stage, next
            )));
        }
        let now = Instant::now();
        let elapsed = now.duration_since(self.stage_started);
        if let Some(slot) = self.timings.slot(next) {
            *slot = elapsed;
        }
        self.timings.total = now.duration_since(self.started);
        tracing::debug!(
            request_id = self.id,
            from = self.stage.as_str(),
            to = next.as_str(),
            elapsed_us = elapsed.as_micros() as u64,
            "stage transition"
        );
        self.stage = next;
        self.stage_started = now;
        Ok(())
    }

    /// Terminal failure. Idempotent once failed; ignored after `Responded`.
    pub fn fail(&mut self, err: &EndcryptError) {
        if self.stage.is_terminal() {
            return;
        }
        self.timings.total = self.started.elapsed();
        tracing::warn!(
            request_id = self.id,
            stage = self.stage.as_str(),
            category = err.category().as_str(),
            error = %err,
            "request failed"
        );
        self.failure = Some(FailureReason {
            stage: self.stage,
            category: err.category(),
            message: err.to_string(),
        });
        self.stage = Stage::Failed;
    }

    /// Run `f` and advance to `next` on success, or fail the request.
    pub fn run<T>(&mut self, next: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
        match f() {
            Ok(value) => {
                self.advance(next)?;
                Ok(value)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_record_timings() {
        let mut p = RequestPipeline::new();
        for stage in [
            Stage::Normalized,
            Stage::Encrypted,
            Stage::Decrypted,
            Stage::MetricsComputed,
            Stage::Responded,
        ] {
            p.advance(stage).unwrap();
            assert_eq!(p.stage(), stage);
        }
        let t = p.timings();
        assert!(t.total >= t.normalize + t.encrypt + t.decrypt + t.metrics + t.encode);
    }

    #[test]
    fn backward_and_repeated_transitions_are_rejected() {
        let mut p = RequestPipeline::new();
        p.advance(Stage::Encrypted).unwrap();
        assert!(p.advance(Stage::Normalized).is_err());
        assert!(p.advance(Stage::Encrypted).is_err());
        assert!(p.advance(Stage::Failed).is_err());
    }

    #[test]
    fn terminal_stages_are_final() {
        let mut p = RequestPipeline::new();
        p.fail(&EndcryptError::decode_failed("bad"));
        assert_eq!(p.stage(), Stage::Failed);
        assert!(p.advance(Stage::Responded).is_err());

        // a second failure keeps the first reason
        p.fail(&EndcryptError::invalid_key("later"));
        assert_eq!(p.failure().unwrap().category, ErrorCategory::CodecError);

        let mut done = RequestPipeline::new();
        done.advance(Stage::Responded).unwrap();
        done.fail(&EndcryptError::decode_failed("late"));
        assert_eq!(done.stage(), Stage::Responded);
        assert!(done.failure().is_none());
    }

    #[test]
    fn run_fails_pipeline_on_error() {
        let mut p = RequestPipeline::new();
        let out = p.run(Stage::Normalized, || Ok(3)).unwrap();
        assert_eq!(out, 3);
        let err = p
            .run::<()>(Stage::Encrypted, || Err(EndcryptError::invalid_key("empty")))
            .unwrap_err();
        assert!(matches!(err, EndcryptError::InvalidKey { .. }));
        assert_eq!(p.stage(), Stage::Failed);

        let reason = p.failure().unwrap();
        assert_eq!(reason.stage, Stage::Normalized);
        assert_eq!(reason.category, ErrorCategory::UserError);
        assert_eq!(reason.message, err.to_string());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestPipeline::new().id(), RequestPipeline::new().id());
    }
}
