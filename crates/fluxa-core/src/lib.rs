pub mod action;
pub mod config;
pub mod cost;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod io;
pub mod jsonc;
pub mod orchestrator;
pub mod rules;
pub mod source;
pub mod validate;

pub use action::{ActionRecord, ActionSequence, OperationRegistry};
pub use envelope::{assemble, strip_metadata, Envelope};
pub use error::{FluxaError, Result};
pub use extract::extract_json_array;
pub use orchestrator::{
    AttemptFailure, AttemptSink, BackendError, CancelToken, GenerationBackend, GenerationFailed,
    GenerationRequest, GenerationResult, Orchestrator,
};
pub use source::{ExtractedContent, SourceKind};
pub use validate::{validate, Severity, ValidationError, ValidationReport, Validator};
