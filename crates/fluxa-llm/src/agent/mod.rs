//! Agent backend: drives `claude --output-format stream-json` with read-only
//! access to a documentation folder.
//!
//! ```text
//! AgentOptions
//!     │
//!     ▼
//! AgentProcess    ← spawns `claude --print --output-format stream-json …`
//!     │
//!     ▼
//! MessageStream   ← background task + mpsc channel
//!     │
//!     ▼
//! runner::collect ← result text, tool calls, cost
//! ```

pub mod backend;
pub(crate) mod process;
pub mod runner;
pub mod stream;
pub mod types;

pub use backend::{resolve_docs_path, AgentBackend, DOCS_DIR};
pub use runner::{run, RunResult};
pub use types::{AgentOptions, PermissionMode};
