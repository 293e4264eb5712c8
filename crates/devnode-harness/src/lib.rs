//! Devnode Harness - dev node lifecycle for end-to-end tests
//!
//! Spawns the node binary, watches its output for the readiness marker,
//! connects and primes an RPC client, hands that client to a test group and
//! tears everything down afterwards.
//!
//! # Overview
//!
//! - **Harness**: [`NodeHarness`] with a structured ([`NodeHarness::try_start`])
//!   and a fatal ([`NodeHarness::start`]) startup surface
//! - **Suites**: [`run_suite`] runs a body against a fresh node
//! - **Blocks**: [`next_block`] makes an instant-sealing node author a block,
//!   signed by a [`DevAccountSigner`] or any other [`RemarkSigner`]
//! - **Logging**: [`init_tracing`] for test binaries
//!
//! Ports are fixed by the node command line, so two harnesses with the same
//! configuration must not run at the same time.
//!
//! # Example
//!
//! ```rust,no_run
//! use devnode_core::HarnessConfig;
//! use devnode_harness::{init_tracing, run_suite};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing("info");
//!
//!     run_suite("Acala RPC", HarnessConfig::from_env(), |client| async move {
//!         let chain_id = client.eth_chain_id().await.unwrap();
//!         assert_eq!(chain_id, 595);
//!     })
//!     .await;
//! }
//! ```

pub mod block;
pub mod error;
pub mod harness;
pub mod logging;
pub mod process;
pub mod readiness;
pub mod signer;
pub mod suite;

// Re-exports
pub use block::{next_block, remark_payload, RemarkSigner};
pub use error::{BlockError, StartupError};
pub use harness::{HarnessContext, HarnessState, NodeHarness};
pub use logging::init_tracing;
pub use process::NodeLine;
pub use readiness::ReadinessMarker;
pub use signer::{DevAccount, DevAccountSigner};
pub use suite::{run_suite, try_run_suite};
