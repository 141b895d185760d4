use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::process::AgentProcess;
use super::types::{AgentOptions, Message};
use crate::error::Result;

// ─── MessageStream ────────────────────────────────────────────────────────

/// Messages from one agent subprocess, in arrival order.
///
/// A background task owns the [`AgentProcess`] and forwards messages over an
/// mpsc channel until the terminal `Result` message or process exit.
/// Dropping the stream makes the task stop at its next send.
pub struct MessageStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl MessageStream {
    pub(crate) fn spawn(prompt: String, opts: AgentOptions) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let process = match AgentProcess::spawn(&prompt, &opts).await {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            pump(process, tx).await;
        });

        Self { rx }
    }

    /// Stream fed by an already-running process.
    #[cfg(test)]
    pub(crate) fn from_process(process: AgentProcess) -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(pump(process, tx));
        Self { rx }
    }

    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }
}

async fn pump(mut process: AgentProcess, tx: mpsc::Sender<Result<Message>>) {
    let mut got_result = false;
    loop {
        match process.next_message().await {
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
            Ok(None) => break,
            Ok(Some(msg)) => {
                let terminal = matches!(msg, Message::Result(_));
                got_result |= terminal;
                if tx.send(Ok(msg)).await.is_err() || terminal {
                    break;
                }
            }
        }
    }

    if !got_result {
        if let Some(exit_err) = process.wait_exit_error().await {
            let _ = tx.send(Err(exit_err)).await;
        }
    }

    process.kill().await;
}

impl Stream for MessageStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::process::Command;

    const INIT_LINE: &str = r#"{"type":"system","subtype":"init","session_id":"s1","model":"m","tools":["Read"],"cwd":"/docs"}"#;
    const RESULT_LINE: &str = r#"{"type":"result","subtype":"success","session_id":"s1","result":"[{\"_obj\":\"invert\"}]","num_turns":2,"total_cost_usd":0.01,"is_error":false}"#;

    /// Replay `lines` through `cat`. The returned file must outlive the stream.
    fn replay(lines: &[&str]) -> (MessageStream, NamedTempFile) {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        let mut cmd = Command::new("cat");
        cmd.arg(f.path());
        let process = AgentProcess::spawn_command(cmd).unwrap();
        (MessageStream::from_process(process), f)
    }

    #[tokio::test]
    async fn yields_messages_until_result() {
        let (stream, _f) = replay(&[INIT_LINE, RESULT_LINE, INIT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            messages.last().unwrap().as_ref().unwrap(),
            Message::Result(_)
        ));
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let (stream, _f) = replay(&[INIT_LINE, "", "   ", RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].as_ref().unwrap().session_id(), "s1");
    }

    #[tokio::test]
    async fn early_exit_without_result_surfaces_exit_error() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 2");
        let process = AgentProcess::spawn_command(cmd).unwrap();
        let messages: Vec<_> = MessageStream::from_process(process).collect().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_err());
    }
}
