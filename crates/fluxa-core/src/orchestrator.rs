//! Drives a generation backend until it yields a structurally valid action
//! sequence or the attempt budget runs out.
//!
//! ```text
//! Attempting(n) ──backend──▶ raw text ──extract──▶ candidate ──decode──▶ value ──validate──┐
//!      ▲                                                                                  │
//!      └──────────────── failure recorded, n < max ◀──────────────────────────────────────┤
//!                                                                                         ▼
//!                             Exhausted(history)  ◀── n == max        no fatal findings ──▶ Accepted
//! ```
//!
//! Advisory findings never trigger a retry; they travel with the result.

use crate::action::ActionSequence;
use crate::extract::extract_json_array;
use crate::validate::{ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Backend interface
// ---------------------------------------------------------------------------

/// Tutorial text handed to a backend for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub content: &'a str,
    pub source: &'a str,
    pub source_kind: &'a str,
}

/// Transport, auth or rate-limit failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Turns tutorial text into candidate action-sequence text.
///
/// Each call is one blocking round-trip. Timeouts belong to the
/// implementation's transport.
pub trait GenerationBackend {
    /// Identity recorded in the result provenance, e.g. `chat:gpt-5.1`.
    fn name(&self) -> String;

    fn complete(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// Attempt outcomes
// ---------------------------------------------------------------------------

/// Why a single attempt was not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    Backend { message: String },
    Extraction,
    Decode { message: String },
    Validation { errors: Vec<ValidationError> },
    Cancelled,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Backend { message } => write!(f, "backend error: {message}"),
            AttemptFailure::Extraction => f.write_str("could not extract JSON from response"),
            AttemptFailure::Decode { message } => write!(f, "invalid JSON: {message}"),
            AttemptFailure::Validation { errors } => {
                let joined = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation failed: {joined}")
            }
            AttemptFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal failure: no attempt produced an acceptable sequence.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to generate valid actions after {attempts} attempt(s); last error: {}", last_reason(.history))]
pub struct GenerationFailed {
    /// Backend invocations actually made.
    pub attempts: u32,
    /// One entry per failed attempt, oldest first. A trailing `Cancelled`
    /// entry does not correspond to a backend call.
    pub history: Vec<AttemptFailure>,
}

fn last_reason(history: &[AttemptFailure]) -> String {
    history
        .last()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no attempts were made".to_string())
}

impl GenerationFailed {
    pub fn last_reason(&self) -> Option<&AttemptFailure> {
        self.history.last()
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(self.history.last(), Some(AttemptFailure::Cancelled))
    }
}

// ---------------------------------------------------------------------------
// GenerationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub source_kind: String,
    pub backend: String,
}

/// Output of one successful orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub actions: ActionSequence,
    pub raw_response: String,
    /// 1-based attempt that was accepted.
    pub attempt: u32,
    /// Findings on the accepted attempt. Never contains fatal findings.
    pub findings: Vec<ValidationError>,
    pub provenance: Provenance,
}

impl GenerationResult {
    pub fn has_warnings(&self) -> bool {
        !self.findings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked before each attempt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// AttemptSink
// ---------------------------------------------------------------------------

/// Receives attempt progress. Injected into the orchestrator instead of a
/// process-wide logger.
pub trait AttemptSink: Send + Sync {
    fn attempt_started(&self, _attempt: u32, _max_attempts: u32) {}

    fn attempt_failed(&self, _attempt: u32, _max_attempts: u32, _failure: &AttemptFailure) {}

    fn accepted(&self, _result: &GenerationResult) {}
}

/// Forwards attempt progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AttemptSink for TracingSink {
    fn attempt_started(&self, attempt: u32, max_attempts: u32) {
        tracing::info!(attempt, max_attempts, "generation attempt");
    }

    fn attempt_failed(&self, attempt: u32, max_attempts: u32, failure: &AttemptFailure) {
        tracing::warn!(attempt, max_attempts, reason = %failure, "generation attempt failed");
    }

    fn accepted(&self, result: &GenerationResult) {
        tracing::info!(
            attempt = result.attempt,
            actions = result.actions.len(),
            findings = result.findings.len(),
            backend = %result.provenance.backend,
            "generated action sequence"
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AttemptSink for NullSink {}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

enum AttemptState {
    Attempting {
        attempt: u32,
        failures: Vec<AttemptFailure>,
    },
    Accepted(GenerationResult),
    Exhausted(GenerationFailed),
}

/// Retry loop around a [`GenerationBackend`].
///
/// Holds no per-request state: each `generate` call owns its attempt
/// counter and failure history, so one orchestrator can serve concurrent
/// requests.
pub struct Orchestrator {
    validator: Validator,
    max_attempts: u32,
    sink: Arc<dyn AttemptSink>,
    cancel: CancelToken,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}

impl Orchestrator {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sink: Arc::new(TracingSink),
            cancel: CancelToken::new(),
        }
    }

    /// Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn generate(
        &self,
        request: &GenerationRequest<'_>,
        backend: &dyn GenerationBackend,
    ) -> Result<GenerationResult, GenerationFailed> {
        let mut state = AttemptState::Attempting {
            attempt: 1,
            failures: Vec::new(),
        };

        loop {
            state = match state {
                AttemptState::Accepted(result) => {
                    self.sink.accepted(&result);
                    return Ok(result);
                }
                AttemptState::Exhausted(failed) => return Err(failed),
                AttemptState::Attempting {
                    attempt,
                    mut failures,
                } => {
                    if self.cancel.is_cancelled() {
                        failures.push(AttemptFailure::Cancelled);
                        AttemptState::Exhausted(GenerationFailed {
                            attempts: attempt - 1,
                            history: failures,
                        })
                    } else {
                        self.sink.attempt_started(attempt, self.max_attempts);
                        match self.attempt(request, backend, attempt) {
                            Ok(result) => AttemptState::Accepted(result),
                            Err(failure) => {
                                self.sink
                                    .attempt_failed(attempt, self.max_attempts, &failure);
                                failures.push(failure);
                                if attempt >= self.max_attempts {
                                    AttemptState::Exhausted(GenerationFailed {
                                        attempts: attempt,
                                        history: failures,
                                    })
                                } else {
                                    AttemptState::Attempting {
                                        attempt: attempt + 1,
                                        failures,
                                    }
                                }
                            }
                        }
                    }
                }
            };
        }
    }

    fn attempt(
        &self,
        request: &GenerationRequest<'_>,
        backend: &dyn GenerationBackend,
        attempt: u32,
    ) -> Result<GenerationResult, AttemptFailure> {
        let raw = backend
            .complete(request)
            .map_err(|e| AttemptFailure::Backend { message: e.message })?;

        let candidate = extract_json_array(&raw).ok_or(AttemptFailure::Extraction)?;

        let value: serde_json::Value =
            serde_json::from_str(candidate).map_err(|e| AttemptFailure::Decode {
                message: e.to_string(),
            })?;

        let report = self.validator.validate(&value);
        if !report.is_valid() {
            return Err(AttemptFailure::Validation {
                errors: report.errors,
            });
        }

        let actions = ActionSequence::from_value(value).ok_or_else(|| {
            AttemptFailure::Validation {
                errors: report.errors.clone(),
            }
        })?;

        Ok(GenerationResult {
            actions,
            raw_response: raw,
            attempt,
            findings: report.errors,
            provenance: Provenance {
                source: request.source.to_string(),
                source_kind: request.source_kind.to_string(),
                backend: backend.name(),
            },
        })
    }
}

/// One-shot convenience: default validator, tracing sink.
pub fn generate(
    request: &GenerationRequest<'_>,
    backend: &dyn GenerationBackend,
    max_attempts: u32,
) -> Result<GenerationResult, GenerationFailed> {
    Orchestrator::default()
        .with_max_attempts(max_attempts)
        .generate(request, backend)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
