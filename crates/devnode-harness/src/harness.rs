//! Node harness
//!
//! Lifecycle of one dev node for one test group:
//!
//! ```text
//! Spawning -> WaitingForReadyMarker -> Ready -> Stopped
//!                     |
//!                     +-> StartupFailed
//! ```
//!
//! A [`NodeHarness`] only exists once the node is `Ready`: the marker was
//! seen and the priming call succeeded, both within the startup timeout.

use devnode_core::{HarnessConfig, NodeCommand};
use devnode_rpc::{ClientOptions, RpcClient, TypeRegistry};
use serde_json::json;
use std::fmt;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::StartupError;
use crate::process::{reap, spawn_node, start_pumps, OutputTap};
use crate::readiness::{scan_for_marker, ReadinessMarker, ScanOutcome};

/// Harness lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Spawning,
    WaitingForReadyMarker,
    Ready,
    StartupFailed,
    Stopped,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarnessState::Spawning => "spawning",
            HarnessState::WaitingForReadyMarker => "waiting-for-ready-marker",
            HarnessState::Ready => "ready",
            HarnessState::StartupFailed => "startup-failed",
            HarnessState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Resources handed to a test group
///
/// Empty by default. Filled once, after readiness and priming, and emptied
/// again by teardown.
#[derive(Debug, Default)]
pub struct HarnessContext {
    client: Option<RpcClient>,
    process: Option<Child>,
}

impl HarnessContext {
    /// Primed RPC client; `None` before startup and after teardown
    pub fn client(&self) -> Option<&RpcClient> {
        self.client.as_ref()
    }

    /// OS pid of the node process while it runs
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(Child::id)
    }

    pub fn is_empty(&self) -> bool {
        self.client.is_none() && self.process.is_none()
    }

    /// Disconnect the client and stop the process
    ///
    /// Every step is best effort. An empty context is left untouched.
    pub async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                warn!("Failed to disconnect RPC client: {}", e);
            }
        }
        if let Some(mut process) = self.process.take() {
            reap(&mut process).await;
        }
    }
}

/// A running, primed dev node
pub struct NodeHarness {
    config: HarnessConfig,
    command: NodeCommand,
    state: HarnessState,
    context: HarnessContext,
    pumps: Vec<JoinHandle<()>>,
}

impl NodeHarness {
    /// Start the node and wait until it is ready
    ///
    /// On failure the process, if any, is already gone when this returns.
    pub async fn try_start(config: HarnessConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let command = NodeCommand::from_config(&config);
        let marker = ReadinessMarker::new(config.ready_marker.clone());
        let mut state = HarnessState::Spawning;
        info!("Starting node: {}", command);

        let mut child = spawn_node(&command)?;
        // one budget for marker, connect and priming together
        let deadline = Instant::now() + config.startup_timeout;
        let tap = OutputTap::new(config.display_log, config.log_buffer_lines);
        let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
        let pumps = start_pumps(&mut child, tap.clone(), lines_tx);
        transition(&mut state, HarnessState::WaitingForReadyMarker);

        let scanned = tokio::select! {
            outcome = scan_for_marker(&mut lines_rx, &marker, &mut child) => Some(outcome),
            _ = tokio::time::sleep_until(deadline) => None,
        };
        drop(lines_rx);

        let failure = match scanned {
            Some(ScanOutcome::Ready(line)) => {
                debug!("Ready line: {}", line.text);
                match tokio::time::timeout_at(deadline, connect_and_prime(&config)).await {
                    Ok(Ok(client)) => {
                        // past this point output is drained but no longer kept
                        tap.stop_observing();
                        transition(&mut state, HarnessState::Ready);
                        return Ok(Self {
                            config,
                            command,
                            state,
                            context: HarnessContext {
                                client: Some(client),
                                process: Some(child),
                            },
                            pumps,
                        });
                    }
                    Ok(Err(e)) => e,
                    Err(_) => timed_out(&config, &command, &tap),
                }
            }
            Some(ScanOutcome::Exited(status)) => StartupError::ProcessExited {
                status,
                command_line: command.command_line(),
                logs: tap.render_logs(),
            },
            None => timed_out(&config, &command, &tap),
        };

        tap.stop_observing();
        transition(&mut state, HarnessState::StartupFailed);
        error!("Node startup failed: {}", failure);
        reap(&mut child).await;
        for pump in pumps {
            pump.abort();
        }
        Err(failure)
    }

    /// Start the node or terminate the test process
    ///
    /// Any startup failure prints its diagnostics to stderr and exits with
    /// status 1.
    pub async fn start(config: HarnessConfig) -> Self {
        match Self::try_start(config).await {
            Ok(harness) => harness,
            Err(e) => exit_on_startup_failure(&e),
        }
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Printable command line the node was started with
    pub fn command_line(&self) -> String {
        self.command.command_line()
    }

    pub fn context(&self) -> &HarnessContext {
        &self.context
    }

    /// Shortcut for `context().client()`
    pub fn client(&self) -> Option<&RpcClient> {
        self.context.client()
    }

    /// WebSocket endpoint of the node
    pub fn ws_url(&self) -> String {
        self.config.ws_url()
    }

    /// Disconnect the client and stop the node
    ///
    /// Calling this more than once is harmless.
    pub async fn teardown(&mut self) {
        if self.state == HarnessState::Stopped {
            return;
        }
        info!("Tearing down node");
        self.context.close().await;
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        transition(&mut self.state, HarnessState::Stopped);
    }
}

impl Drop for NodeHarness {
    fn drop(&mut self) {
        if let Some(process) = self.context.process.as_mut() {
            if let Err(e) = process.start_kill() {
                debug!("Kill on drop skipped: {}", e);
            }
        }
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

impl fmt::Debug for NodeHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHarness")
            .field("state", &self.state)
            .field("ws_url", &self.config.ws_url())
            .field("pid", &self.context.pid())
            .finish()
    }
}

/// Print the failure report and exit with status 1
pub(crate) fn exit_on_startup_failure(err: &StartupError) -> ! {
    eprintln!("{}", err.diagnostics());
    std::process::exit(1)
}

fn transition(state: &mut HarnessState, next: HarnessState) {
    info!("Harness state: {} -> {}", state, next);
    *state = next;
}

fn timed_out(config: &HarnessConfig, command: &NodeCommand, tap: &OutputTap) -> StartupError {
    StartupError::Timeout {
        after: config.startup_timeout,
        command_line: command.command_line(),
        logs: tap.render_logs(),
    }
}

async fn connect_and_prime(config: &HarnessConfig) -> Result<RpcClient, StartupError> {
    let options = ClientOptions::new(config.ws_url())
        .with_types(TypeRegistry::acala())
        .with_request_timeout(config.request_timeout);
    let client = RpcClient::connect(options)
        .await
        .map_err(StartupError::Connect)?;

    // the node's EVM runtime needs one request before it answers reliably
    if let Err(e) = client.request(&config.priming_method, json!([])).await {
        if let Err(close) = client.disconnect().await {
            warn!("Failed to disconnect after priming failure: {}", close);
        }
        return Err(StartupError::Priming(e));
    }
    debug!("Priming call {} succeeded", config.priming_method);
    Ok(client)
}
