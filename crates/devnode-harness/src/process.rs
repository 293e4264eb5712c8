//! Node process spawning and output pumps

use devnode_core::{LogBuffer, NodeCommand, OutputStream};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::StartupError;

/// One line of node output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Output state shared by the two pump tasks
#[derive(Debug)]
pub(crate) struct OutputTap {
    /// Lines are buffered and forwarded to the scanner while set
    observing: AtomicBool,
    /// Lines are echoed to stderr while set
    echo: bool,
    logs: Mutex<LogBuffer>,
}

impl OutputTap {
    pub(crate) fn new(echo: bool, buffer_lines: usize) -> Arc<Self> {
        Arc::new(Self {
            observing: AtomicBool::new(true),
            echo,
            logs: Mutex::new(LogBuffer::new(buffer_lines)),
        })
    }

    /// Stop buffering and forwarding; pipes keep being drained
    pub(crate) fn stop_observing(&self) {
        self.observing.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    /// Everything buffered so far, oldest first
    pub(crate) fn render_logs(&self) -> String {
        self.logs.lock().render()
    }
}

/// Spawn the node with piped output
///
/// A missing or non-executable binary maps to [`StartupError::BinaryNotFound`].
pub(crate) fn spawn_node(command: &NodeCommand) -> Result<Child, StartupError> {
    let child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => StartupError::BinaryNotFound {
                path: command.program.clone(),
            },
            _ => StartupError::Spawn(e),
        })?;

    debug!(pid = ?child.id(), "Spawned {}", command.program.display());
    Ok(child)
}

/// Start one pump task per output stream
///
/// Both pumps feed `lines` until the tap stops observing, then keep
/// reading so the child never blocks on a full pipe.
pub(crate) fn start_pumps(
    child: &mut Child,
    tap: Arc<OutputTap>,
    lines: mpsc::UnboundedSender<NodeLine>,
) -> Vec<JoinHandle<()>> {
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(
            stdout,
            OutputStream::Stdout,
            tap.clone(),
            lines.clone(),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(stderr, OutputStream::Stderr, tap, lines)));
    }
    pumps
}

async fn pump<R>(
    reader: R,
    stream: OutputStream,
    tap: Arc<OutputTap>,
    lines: mpsc::UnboundedSender<NodeLine>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Error reading node {}: {}", stream, e);
                break;
            }
        }

        let text = String::from_utf8_lossy(&raw)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        if tap.echo {
            eprintln!("{}", text);
        }

        if tap.is_observing() {
            trace!(%stream, "{}", text);
            tap.logs.lock().push(text.clone());
            let _ = lines.send(NodeLine { stream, text });
        }
    }

    debug!("Node {} closed", stream);
}

/// Kill the child if it is still running and reap it
pub(crate) async fn reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        // already exited
        debug!("Kill skipped: {}", e);
    }
    match child.wait().await {
        Ok(status) => debug!("Node exited: {}", status),
        Err(e) => warn!("Failed to reap node: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_binary() {
        let command = NodeCommand {
            program: PathBuf::from("/nonexistent/devnode/acala"),
            args: vec!["--dev".into()],
        };
        let err = spawn_node(&command).unwrap_err();
        assert!(matches!(err, StartupError::BinaryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_pump_reads_both_streams() {
        let command = NodeCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), "echo out; echo err 1>&2".into()],
        };
        let mut child = spawn_node(&command).unwrap();
        let tap = OutputTap::new(false, 16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pumps = start_pumps(&mut child, tap.clone(), tx);
        assert_eq!(pumps.len(), 2);

        let mut seen = Vec::new();
        while let Some(line) = rx.recv().await {
            seen.push((line.stream, line.text));
        }
        seen.sort_by_key(|(_, text)| text.clone());
        assert_eq!(
            seen,
            vec![
                (OutputStream::Stderr, "err".to_string()),
                (OutputStream::Stdout, "out".to_string()),
            ]
        );
        assert_eq!(tap.logs.lock().len(), 2);
        reap(&mut child).await;
    }

    #[tokio::test]
    async fn test_stop_observing_still_drains() {
        let command = NodeCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), "echo one; sleep 0.2; echo two".into()],
        };
        let mut child = spawn_node(&command).unwrap();
        let tap = OutputTap::new(false, 16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pumps = start_pumps(&mut child, tap.clone(), tx);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "one");
        tap.stop_observing();

        for pump in pumps {
            pump.await.unwrap();
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(tap.render_logs(), "one");
        reap(&mut child).await;
    }
}
