use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::types::{AgentOptions, Message, PermissionMode};
use crate::error::{LlmError, Result};

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running `claude` subprocess speaking stream-json in both directions.
///
/// The prompt goes in as one JSON user message on stdin, which is then
/// closed. Responses come back as JSONL on stdout. Stderr is buffered by a
/// background task and attached to exit errors.
pub(crate) struct AgentProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl AgentProcess {
    pub(crate) async fn spawn(prompt: &str, opts: &AgentOptions) -> Result<Self> {
        let mut cmd = build_command(opts);
        // Allow running from inside another claude session.
        cmd.env_remove("CLAUDECODE");
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }

        let mut process = Self::from_command(cmd)?;

        let user_msg = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }
        });
        process.send_message(&user_msg).await?;
        process.close_stdin();

        Ok(process)
    }

    /// Wrap an arbitrary command; tests use `cat` to replay captured output.
    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command) -> Result<Self> {
        Self::from_command(cmd)
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LlmError::Process("stdout not captured".into()))?;
        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stdin,
            stderr_buf,
        })
    }

    pub(crate) async fn send_message(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| LlmError::Process("stdin already closed".into()))?;

        let mut buf = serde_json::to_vec(msg)
            .map_err(|e| LlmError::Process(format!("failed to serialize stdin message: {e}")))?;
        buf.push(b'\n');

        stdin.write_all(&buf).await?;
        stdin.flush().await?;
        Ok(())
    }

    pub(crate) fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Next message from stdout, `Ok(None)` at EOF.
    ///
    /// Blank lines and well-formed JSON of a type we do not model are
    /// skipped.
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(trimmed) {
                Ok(msg) => return Ok(Some(msg)),
                Err(_) if is_unmodelled_message(trimmed) => continue,
                Err(e) => {
                    return Err(LlmError::Parse {
                        line: trimmed.to_owned(),
                        source: e,
                    })
                }
            }
        }
        Ok(None)
    }

    /// Exit error for a non-zero status or signal, with captured stderr.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<LlmError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(LlmError::Io(e)),
        };
        if status.success() {
            return None;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default();

        let mut msg = match status.code() {
            Some(code) => format!("agent exited with code {code}"),
            None => "agent terminated by signal".to_string(),
        };
        if !stderr.is_empty() {
            msg.push_str("\nstderr: ");
            msg.push_str(&stderr);
        }
        Some(LlmError::Process(msg))
    }

    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Valid JSON carrying a `type` we have no variant for.
fn is_unmodelled_message(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .map(|v| v.get("type").is_some())
        .unwrap_or(false)
}

// ─── Command builder ──────────────────────────────────────────────────────

pub(crate) fn build_command(opts: &AgentOptions) -> Command {
    let exe = opts
        .path_to_executable
        .as_deref()
        .unwrap_or_else(|| std::path::Path::new("claude"));
    let mut cmd = Command::new(exe);

    cmd.arg("--print")
        .arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--input-format")
        .arg("stream-json");

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }
    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }
    if !opts.allowed_tools.is_empty() {
        cmd.arg("--allowed-tools").args(&opts.allowed_tools);
    }
    if opts.permission_mode != PermissionMode::Default {
        cmd.arg("--permission-mode")
            .arg(opts.permission_mode.as_str());
    }
    if let Some(sp) = &opts.system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(opts: &AgentOptions) -> Vec<String> {
        build_command(opts)
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn command_carries_restrictions() {
        let opts = AgentOptions {
            model: Some("sonnet".into()),
            max_turns: Some(40),
            allowed_tools: vec!["Read".into(), "Glob".into(), "Grep".into()],
            permission_mode: PermissionMode::DontAsk,
            system_prompt: Some("be brief".into()),
            cwd: Some("/tmp".into()),
            ..Default::default()
        };
        let a = args(&opts);
        assert!(a.windows(2).any(|w| w == ["--output-format", "stream-json"]));
        assert!(a.windows(2).any(|w| w == ["--max-turns", "40"]));
        assert!(a.windows(4).any(|w| w == ["--allowed-tools", "Read", "Glob", "Grep"]));
        assert!(a.windows(2).any(|w| w == ["--permission-mode", "dontAsk"]));
        assert!(a.windows(2).any(|w| w == ["--system-prompt", "be brief"]));

        let cmd = build_command(&opts);
        assert_eq!(cmd.as_std().get_program(), OsStr::new("claude"));
        assert_eq!(cmd.as_std().get_current_dir(), Some(std::path::Path::new("/tmp")));
    }

    #[test]
    fn default_options_omit_optional_flags() {
        let a = args(&AgentOptions::default());
        assert!(!a.iter().any(|x| x == "--permission-mode"));
        assert!(!a.iter().any(|x| x == "--model"));
    }

    #[tokio::test]
    async fn reader_skips_unmodelled_and_blank_lines() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"type":"rate_limit_event","session_id":"s1"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(
            f,
            r#"{{"type":"result","subtype":"success","session_id":"s1","result":"[]"}}"#
        )
        .unwrap();

        let mut cmd = Command::new("cat");
        cmd.arg(f.path());
        let mut process = AgentProcess::spawn_command(cmd).unwrap();

        let msg = process.next_message().await.unwrap().unwrap();
        assert!(matches!(msg, Message::Result(_)));
        assert!(process.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reader_rejects_garbage() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "not json").unwrap();

        let mut cmd = Command::new("cat");
        cmd.arg(f.path());
        let mut process = AgentProcess::spawn_command(cmd).unwrap();

        let err = process.next_message().await.unwrap_err();
        assert!(matches!(err, LlmError::Parse { .. }));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo boom >&2; exit 3");
        let mut process = AgentProcess::spawn_command(cmd).unwrap();

        assert!(process.next_message().await.unwrap().is_none());
        let err = process.wait_exit_error().await.unwrap();
        let text = err.to_string();
        assert!(text.contains("code 3"));
    }
}
