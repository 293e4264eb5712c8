//! Typed `eth_*` helpers
//!
//! Quantities travel as `0x`-prefixed hex without leading zeros, data as
//! `0x`-prefixed hex of any length.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::client::RpcClient;
use crate::error::{RpcError, Result};

/// Block selector accepted by the `eth_*` state queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockTag {
    #[default]
    Latest,
    Pending,
    Earliest,
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Pending => write!(f, "pending"),
            BlockTag::Earliest => write!(f, "earliest"),
            BlockTag::Number(n) => write!(f, "{}", encode_quantity(*n as u128)),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

macro_rules! fixed_bytes {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = RpcError;

            fn from_str(s: &str) -> Result<Self> {
                let bytes = decode_data(s)?;
                let array: [u8; $len] = bytes.try_into().map_err(|b: Vec<u8>| {
                    RpcError::Decode(format!(
                        "expected {} bytes for {}, got {}",
                        $len,
                        stringify!($name),
                        b.len()
                    ))
                })?;
                Ok(Self(array))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(Address, 20, "20-byte account or contract address");
fixed_bytes!(H256, 32, "32-byte hash or storage word");

/// Arbitrary-length byte string
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", self)
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_data(&s).map(Bytes).map_err(serde::de::Error::custom)
    }
}

/// Message call used by `eth_call` and `eth_estimateGas`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_quantity")]
    pub gas: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_quantity")]
    pub gas_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_quantity")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl CallRequest {
    /// Call `to` with `data`
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: Some(data.into()),
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }
}

fn ser_opt_quantity<S: Serializer>(value: &Option<u64>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&encode_quantity(*v as u128)),
        None => serializer.serialize_none(),
    }
}

/// Encode a quantity as minimal `0x` hex
pub fn encode_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Decode a `0x` hex quantity
pub fn decode_quantity(s: &str) -> Result<u128> {
    let digits = strip_hex_prefix(s)?;
    if digits.is_empty() {
        return Err(RpcError::Decode(format!("empty quantity: {:?}", s)));
    }
    u128::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(format!("quantity {:?}: {}", s, e)))
}

/// Decode `0x` hex data
pub fn decode_data(s: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(strip_hex_prefix(s)?)?)
}

fn strip_hex_prefix(s: &str) -> Result<&str> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| RpcError::Decode(format!("missing 0x prefix: {:?}", s)))
}

fn quantity_u64(method: &str, value: Value) -> Result<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::Decode(format!("{}: expected hex string, got {}", method, value)))?;
    let n = decode_quantity(s)?;
    u64::try_from(n).map_err(|_| RpcError::Decode(format!("{}: {} does not fit in u64", method, s)))
}

impl RpcClient {
    /// `eth_chainId`
    pub async fn eth_chain_id(&self) -> Result<u64> {
        let value = self.request("eth_chainId", json!([])).await?;
        quantity_u64("eth_chainId", value)
    }

    /// `eth_blockNumber`
    pub async fn eth_block_number(&self) -> Result<u64> {
        let value = self.request("eth_blockNumber", json!([])).await?;
        quantity_u64("eth_blockNumber", value)
    }

    /// `eth_gasPrice`
    pub async fn eth_gas_price(&self) -> Result<u128> {
        let value: String = self.request_typed("eth_gasPrice", json!([])).await?;
        decode_quantity(&value)
    }

    /// `eth_getTransactionCount`
    pub async fn eth_get_transaction_count(&self, address: Address, block: BlockTag) -> Result<u64> {
        let value = self
            .request("eth_getTransactionCount", json!([address, block]))
            .await?;
        quantity_u64("eth_getTransactionCount", value)
    }

    /// `eth_getCode`
    pub async fn eth_get_code(&self, address: Address, block: BlockTag) -> Result<Bytes> {
        self.request_typed("eth_getCode", json!([address, block])).await
    }

    /// `eth_getStorageAt`
    pub async fn eth_get_storage_at(&self, address: Address, slot: H256, block: BlockTag) -> Result<H256> {
        self.request_typed("eth_getStorageAt", json!([address, slot, block]))
            .await
    }

    /// `eth_call`
    pub async fn eth_call(&self, call: &CallRequest, block: BlockTag) -> Result<Bytes> {
        self.request_typed("eth_call", json!([call, block])).await
    }

    /// `eth_estimateGas`
    pub async fn eth_estimate_gas(&self, call: &CallRequest, block: BlockTag) -> Result<u64> {
        let value = self.request("eth_estimateGas", json!([call, block])).await?;
        quantity_u64("eth_estimateGas", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_encoding() {
        assert_eq!(serde_json::to_value(BlockTag::Latest).unwrap(), json!("latest"));
        assert_eq!(serde_json::to_value(BlockTag::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(BlockTag::Earliest).unwrap(), json!("earliest"));
        assert_eq!(serde_json::to_value(BlockTag::Number(5)).unwrap(), json!("0x5"));
        assert_eq!(BlockTag::default(), BlockTag::Latest);
    }

    #[test]
    fn test_quantity() {
        assert_eq!(encode_quantity(0), "0x0");
        assert_eq!(encode_quantity(0x5600), "0x5600");
        assert_eq!(decode_quantity("0x253").unwrap(), 595);
        assert!(decode_quantity("0x").is_err());
        assert!(decode_quantity("253").is_err());
        assert!(decode_quantity("0xzz").is_err());
    }

    #[test]
    fn test_address_parse() {
        let addr: Address = "0x1000000000000000000000000000000000000001".parse().unwrap();
        assert_eq!(addr.0[0], 0x10);
        assert_eq!(addr.0[19], 0x01);
        assert_eq!(addr.to_string(), "0x1000000000000000000000000000000000000001");

        let short: Result<Address> = "0x1234".parse();
        assert!(matches!(short, Err(RpcError::Decode(_))));
    }

    #[test]
    fn test_h256_roundtrip_through_json() {
        let zero = H256::default();
        let encoded = serde_json::to_value(zero).unwrap();
        assert_eq!(
            encoded,
            json!("0x0000000000000000000000000000000000000000000000000000000000000000")
        );
        let decoded: H256 = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, zero);
    }

    #[test]
    fn test_call_request_serialization() {
        let to: Address = "0x5f8c5d7a00000000000000000000000000000001".parse().unwrap();
        let call = CallRequest::new(to, vec![0xde, 0xad]).with_gas(21000);
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({
                "to": "0x5f8c5d7a00000000000000000000000000000001",
                "gas": "0x5208",
                "data": "0xdead"
            })
        );
    }
}
