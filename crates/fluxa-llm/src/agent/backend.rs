use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fluxa_core::config::AgentConfig;
use fluxa_core::orchestrator::{BackendError, GenerationBackend, GenerationRequest};

use super::runner;
use super::types::{AgentOptions, PermissionMode};
use crate::error::{LlmError, Result};
use crate::prompt;

/// Documentation folder looked up in the working directory when none is
/// configured.
pub const DOCS_DIR: &str = "ps_action_docs";

/// The agent may only read the documentation tree.
pub const READ_ONLY_TOOLS: &[&str] = &["Read", "Glob", "Grep"];

/// `configured`, or `cwd/ps_action_docs`. The directory must exist.
pub fn resolve_docs_path(configured: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let path = match configured {
        Some(p) => p.to_path_buf(),
        None => cwd.join(DOCS_DIR),
    };
    if path.is_dir() {
        Ok(path)
    } else {
        Err(LlmError::DocsNotFound(path.display().to_string()))
    }
}

// ─── AgentBackend ─────────────────────────────────────────────────────────

/// Runs the `claude` CLI as a documentation-reading agent for each attempt.
pub struct AgentBackend {
    options: AgentOptions,
    timeout: Duration,
}

impl AgentBackend {
    pub fn new(config: &AgentConfig, docs_path: PathBuf) -> Result<Self> {
        if !docs_path.is_dir() {
            return Err(LlmError::DocsNotFound(docs_path.display().to_string()));
        }
        tracing::info!(docs = %docs_path.display(), "agent backend ready");

        let options = AgentOptions {
            model: config.model.clone(),
            max_turns: Some(config.max_turns),
            allowed_tools: READ_ONLY_TOOLS.iter().map(|s| s.to_string()).collect(),
            permission_mode: PermissionMode::DontAsk,
            system_prompt: Some(prompt::AGENT_SYSTEM_PROMPT.to_string()),
            cwd: Some(docs_path),
            path_to_executable: config.executable.clone(),
            ..Default::default()
        };

        Ok(Self {
            options,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    pub fn docs_path(&self) -> Option<&Path> {
        self.options.cwd.as_deref()
    }

    /// One agent run. Error subtypes and timeouts are errors.
    pub fn run_agent(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let prompt =
            prompt::agent_user_prompt(request.content, request.source, request.source_kind);
        let opts = self.options.clone();
        let timeout = self.timeout;

        let outcome = block_on(async move {
            tokio::time::timeout(timeout, runner::run(prompt, opts)).await
        })?;
        let result = outcome.map_err(|_| LlmError::Timeout(timeout.as_secs()))??;

        tracing::info!(
            session_id = %result.session_id,
            turns = result.num_turns,
            tools = result.tool_calls.len(),
            cost_usd = result.total_cost_usd,
            "agent run finished"
        );

        if result.is_error {
            return Err(LlmError::AgentFailed {
                subtype: result.subtype,
                num_turns: result.num_turns,
            });
        }
        Ok(result.result_text)
    }
}

impl GenerationBackend for AgentBackend {
    fn name(&self) -> String {
        format!(
            "agent:{}",
            self.options.model.as_deref().unwrap_or("default")
        )
    }

    fn complete(&self, request: &GenerationRequest<'_>) -> std::result::Result<String, BackendError> {
        self.run_agent(request).map_err(BackendError::new)
    }
}

/// Run `fut` to completion from synchronous code.
///
/// A multi-threaded ambient runtime is borrowed with `block_in_place`.
/// A current-thread runtime cannot block in place, so the future runs on a
/// scoped thread with its own runtime. Without an ambient runtime a fresh
/// one is built for the duration of the call.
fn block_on<F>(fut: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| -> Result<F::Output> {
                    let rt = Runtime::new()?;
                    Ok(rt.block_on(fut))
                })
                .join()
                .map_err(|_| LlmError::Process("agent runtime thread panicked".into()))?
        }),
        Err(_) => {
            let rt = Runtime::new()?;
            Ok(rt.block_on(fut))
        }
    }
}
