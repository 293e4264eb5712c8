//! Test-group runner
//!
//! Wraps a group of tests in one node lifetime: start, run the body with the
//! primed client, tear down. Teardown also runs when the body panics; the
//! panic is resumed afterwards so the test still fails.

use devnode_core::HarnessConfig;
use devnode_rpc::{RpcClient, RpcError};
use futures::FutureExt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use tracing::info;

use crate::error::StartupError;
use crate::harness::{exit_on_startup_failure, NodeHarness};

/// Run `body` against a fresh node, exiting the process if startup fails
pub async fn run_suite<F, Fut, T>(title: &str, config: HarnessConfig, body: F) -> T
where
    F: FnOnce(RpcClient) -> Fut,
    Fut: Future<Output = T>,
{
    match try_run_suite(title, config, body).await {
        Ok(output) => output,
        Err(e) => exit_on_startup_failure(&e),
    }
}

/// Run `body` against a fresh node, returning startup failures
pub async fn try_run_suite<F, Fut, T>(
    title: &str,
    config: HarnessConfig,
    body: F,
) -> Result<T, StartupError>
where
    F: FnOnce(RpcClient) -> Fut,
    Fut: Future<Output = T>,
{
    info!("Suite '{}': starting node", title);
    let mut harness = NodeHarness::try_start(config).await?;

    let Some(client) = harness.client().cloned() else {
        harness.teardown().await;
        return Err(StartupError::Connect(RpcError::Disconnected));
    };

    let outcome = AssertUnwindSafe(async move { body(client).await })
        .catch_unwind()
        .await;

    info!("Suite '{}': finished", title);
    harness.teardown().await;

    match outcome {
        Ok(output) => Ok(output),
        Err(panic) => resume_unwind(panic),
    }
}
