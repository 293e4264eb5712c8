//! Dev account signer
//!
//! Signs `system.remark` with one of the well-known development accounts.
//! Call encoding and the signed extensions come from the node's runtime
//! metadata, fetched over a separate connection to the same endpoint.

use async_trait::async_trait;
use devnode_rpc::{Bytes, RpcClient};
use subxt::config::DefaultExtrinsicParamsBuilder;
use subxt::dynamic::Value;
use subxt::{OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::{dev, Keypair};
use tracing::debug;

use crate::block::RemarkSigner;
use crate::error::BlockError;

/// Signature scheme produced by [`DevAccountSigner`]
pub const SR25519_SCHEME: &str = "Sr25519";

/// `MultiSignature` variant index subxt encodes sr25519 signatures with
const SR25519_VARIANT: u8 = 1;

/// Well-known development accounts funded in the dev chain spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevAccount {
    Alice,
    Bob,
    Charlie,
    Dave,
    Eve,
    Ferdie,
}

impl DevAccount {
    fn keypair(self) -> Keypair {
        match self {
            DevAccount::Alice => dev::alice(),
            DevAccount::Bob => dev::bob(),
            DevAccount::Charlie => dev::charlie(),
            DevAccount::Dave => dev::dave(),
            DevAccount::Eve => dev::eve(),
            DevAccount::Ferdie => dev::ferdie(),
        }
    }
}

/// [`RemarkSigner`] backed by a development sr25519 key
pub struct DevAccountSigner {
    account: DevAccount,
    keypair: Keypair,
}

impl DevAccountSigner {
    pub fn new(account: DevAccount) -> Self {
        Self {
            account,
            keypair: account.keypair(),
        }
    }

    /// Signer for `//Alice`, the account the dev chain funds first
    pub fn alice() -> Self {
        Self::new(DevAccount::Alice)
    }

    pub fn account(&self) -> DevAccount {
        self.account
    }

    /// SS58 encoding of the signer's account id
    pub fn address(&self) -> String {
        self.keypair.public_key().to_account_id().to_string()
    }
}

impl std::fmt::Debug for DevAccountSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevAccountSigner")
            .field("account", &self.account)
            .finish()
    }
}

#[async_trait]
impl RemarkSigner for DevAccountSigner {
    fn signature_scheme(&self) -> &str {
        SR25519_SCHEME
    }

    async fn sign_remark(&self, client: &RpcClient, remark: &[u8]) -> Result<Bytes, BlockError> {
        check_signature_layout(client)?;

        let api = OnlineClient::<PolkadotConfig>::from_insecure_url(client.url())
            .await
            .map_err(|e| BlockError::Signing(e.to_string()))?;

        let call = subxt::dynamic::tx("System", "remark", vec![Value::from_bytes(remark)]);
        let params = DefaultExtrinsicParamsBuilder::<PolkadotConfig>::new().build();
        let signed = api
            .tx()
            .create_signed(&call, &self.keypair, params)
            .await
            .map_err(|e| BlockError::Signing(e.to_string()))?;

        debug!(account = ?self.account, "Signed remark");
        Ok(Bytes(signed.encoded().to_vec()))
    }
}

/// The chain's `ExtrinsicSignature` must put sr25519 where subxt encodes it
fn check_signature_layout(client: &RpcClient) -> Result<(), BlockError> {
    let types = client.types();
    if types.get("ExtrinsicSignature").is_none() {
        return Ok(());
    }
    match types.variant_index("ExtrinsicSignature", SR25519_SCHEME) {
        Some(index) if index == SR25519_VARIANT => Ok(()),
        Some(index) => Err(BlockError::Signing(format!(
            "chain encodes {} at variant {}, expected {}",
            SR25519_SCHEME, index, SR25519_VARIANT
        ))),
        None => Err(BlockError::UnsupportedSignature(SR25519_SCHEME.to_string())),
    }
}
