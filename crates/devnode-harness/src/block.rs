//! Block production on an instant-sealing node
//!
//! An instant-sealing node only authors a block when a transaction arrives,
//! so tests that need the chain to move forward submit a `system.remark`.

use async_trait::async_trait;
use devnode_rpc::{Bytes, RpcClient, TransactionStatus, H256};
use tracing::{debug, info};

use crate::error::BlockError;

/// Produces signed `system.remark` extrinsics
///
/// [`DevAccountSigner`](crate::signer::DevAccountSigner) covers the dev
/// accounts; other keys plug in here.
#[async_trait]
pub trait RemarkSigner: Send + Sync {
    /// `ExtrinsicSignature` variant the signer produces, e.g. `"Sr25519"`
    fn signature_scheme(&self) -> &str;

    /// SCALE-encoded signed extrinsic for `system.remark(remark)`
    async fn sign_remark(&self, client: &RpcClient, remark: &[u8]) -> Result<Bytes, BlockError>;
}

/// Remark payload for a block number: lower-case hex without prefix
pub fn remark_payload(block_number: u64) -> Vec<u8> {
    format!("{:x}", block_number).into_bytes()
}

/// Submit a remark and wait until it is in a block
///
/// Resolves once, on the first `inBlock` status, with that block's hash.
/// The status watch is dropped on return, which unsubscribes it.
pub async fn next_block(client: &RpcClient, signer: &dyn RemarkSigner) -> Result<H256, BlockError> {
    check_signature_scheme(client, signer)?;

    let number = client.block_number().await?;
    let extrinsic = signer.sign_remark(client, &remark_payload(number)).await?;
    debug!(number, len = extrinsic.len(), "Submitting remark");

    let mut watch = client.submit_and_watch_extrinsic(&extrinsic).await?;
    loop {
        let status = match watch.next_typed::<TransactionStatus>().await {
            Some(status) => status?,
            None => return Err(BlockError::SubscriptionClosed),
        };

        match status {
            TransactionStatus::InBlock(hash) => {
                info!("Remark included in block {} (after #{})", hash, number);
                return Ok(hash);
            }
            // inclusion was never reported
            TransactionStatus::Finalized(hash) => {
                return Err(BlockError::NotIncluded(format!(
                    "finalized in {} without an inBlock status",
                    hash
                )));
            }
            failed if failed.is_failure() => {
                return Err(BlockError::NotIncluded(format!("{:?}", failed)));
            }
            other => debug!("Remark status: {:?}", other),
        }
    }
}

fn check_signature_scheme(client: &RpcClient, signer: &dyn RemarkSigner) -> Result<(), BlockError> {
    let types = client.types();
    // without hints the node's own scheme list applies
    if types.get("ExtrinsicSignature").is_none() {
        return Ok(());
    }
    match types.variant_index("ExtrinsicSignature", signer.signature_scheme()) {
        Some(_) => Ok(()),
        None => Err(BlockError::UnsupportedSignature(
            signer.signature_scheme().to_string(),
        )),
    }
}
