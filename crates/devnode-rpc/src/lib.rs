//! Devnode RPC - WebSocket JSON-RPC client for the dev node
//!
//! A small client for the node's WebSocket endpoint. It correlates requests
//! with responses, routes subscription notifications to per-subscription
//! streams and carries the chain's custom wire-type hints.
//!
//! # Overview
//!
//! - **Client**: [`RpcClient`] handle backed by a connection service task
//! - **Subscriptions**: [`Subscription`] streams that unsubscribe on drop
//! - **Type hints**: [`TypeRegistry`] with the Acala enum layouts
//! - **Helpers**: typed `system_*`, `chain_*`, `author_*` and `eth_*` calls
//!
//! # Example
//!
//! ```rust,no_run
//! use devnode_rpc::{BlockTag, ClientOptions, RpcClient, TypeRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions::new("ws://127.0.0.1:19933")
//!         .with_types(TypeRegistry::acala());
//!     let client = RpcClient::connect(options).await?;
//!
//!     println!("chain: {}", client.system_chain().await?);
//!     println!("best block: {}", client.block_number().await?);
//!     println!("eth block: {}", client.eth_block_number().await?);
//!     let _ = BlockTag::Latest;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod eth;
pub mod event;
pub mod message;
pub mod subscription;
pub mod substrate;
pub mod types;

// Test utilities - available with test-utils feature or in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-exports
pub use client::{ClientOptions, RpcClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{Result, RpcError};
pub use eth::{Address, BlockTag, Bytes, CallRequest, H256};
pub use event::ClientEvent;
pub use subscription::Subscription;
pub use substrate::{ChainProperties, Header, TransactionStatus};
pub use types::{TypeDef, TypeRegistry};
