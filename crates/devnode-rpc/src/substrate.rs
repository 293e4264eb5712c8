//! Typed `system_*`, `chain_*` and `author_*` helpers

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::client::RpcClient;
use crate::error::{RpcError, Result};
use crate::eth::{decode_quantity, Bytes, H256};
use crate::subscription::Subscription;

/// Block header as returned by `chain_getHeader`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: H256,
    #[serde(deserialize_with = "de_block_number")]
    pub number: u64,
    pub state_root: H256,
    pub extrinsics_root: H256,
    #[serde(default)]
    pub digest: Value,
}

fn de_block_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid block number {}", n))),
        Value::String(s) => decode_quantity(s)
            .map_err(serde::de::Error::custom)
            .and_then(|n| u64::try_from(n).map_err(serde::de::Error::custom)),
        other => Err(serde::de::Error::custom(format!("invalid block number {}", other))),
    }
}

/// Lifecycle updates from `author_submitAndWatchExtrinsic`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    Future,
    Ready,
    Broadcast(Vec<String>),
    InBlock(H256),
    Retracted(H256),
    FinalityTimeout(H256),
    Finalized(H256),
    Usurped(H256),
    Dropped,
    Invalid,
}

impl TransactionStatus {
    /// Whether no further updates will follow
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Finalized(_)
                | TransactionStatus::FinalityTimeout(_)
                | TransactionStatus::Usurped(_)
                | TransactionStatus::Dropped
                | TransactionStatus::Invalid
        )
    }

    /// Whether the transaction will never be included
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TransactionStatus::FinalityTimeout(_)
                | TransactionStatus::Usurped(_)
                | TransactionStatus::Dropped
                | TransactionStatus::Invalid
        )
    }
}

/// Chain properties from `system_properties`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProperties {
    #[serde(default)]
    pub ss58_format: Option<u16>,
    #[serde(default)]
    pub token_decimals: Value,
    #[serde(default)]
    pub token_symbol: Value,
}

impl RpcClient {
    /// `system_chain`: human readable chain name
    pub async fn system_chain(&self) -> Result<String> {
        self.request_typed("system_chain", json!([])).await
    }

    /// `system_properties`
    pub async fn system_properties(&self) -> Result<ChainProperties> {
        self.request_typed("system_properties", json!([])).await
    }

    /// `chain_getHeader` for the best block, or for `hash`
    pub async fn chain_get_header(&self, hash: Option<H256>) -> Result<Header> {
        let params = match hash {
            Some(hash) => json!([hash]),
            None => json!([]),
        };
        let header: Option<Header> = self.request_typed("chain_getHeader", params).await?;
        header.ok_or_else(|| RpcError::InvalidResponse("chain_getHeader returned null".into()))
    }

    /// Number of the best block
    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.chain_get_header(None).await?.number)
    }

    /// Submit a signed extrinsic and watch its status
    pub async fn submit_and_watch_extrinsic(&self, extrinsic: &Bytes) -> Result<Subscription> {
        self.subscribe(
            "author_submitAndWatchExtrinsic",
            json!([extrinsic]),
            "author_unwatchExtrinsic",
        )
        .await
    }
}
