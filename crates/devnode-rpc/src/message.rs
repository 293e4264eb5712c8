//! JSON-RPC 2.0 wire messages

use serde::Serialize;
use serde_json::Value;

use crate::error::RpcError;

/// Outgoing request
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Message received from the node
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to a request we sent
    Response {
        id: u64,
        result: std::result::Result<Value, ErrorObject>,
    },
    /// Subscription notification
    Notification {
        method: String,
        subscription: String,
        result: Value,
    },
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl From<ErrorObject> for RpcError {
    fn from(err: ErrorObject) -> Self {
        RpcError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// Normalised key for a subscription id, which nodes send as a string or a number
pub fn subscription_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Classify one decoded JSON message
///
/// A present `result` key counts even when its value is `null`.
pub fn parse_incoming(value: Value) -> std::result::Result<Incoming, RpcError> {
    let Value::Object(mut object) = value else {
        return Err(RpcError::InvalidResponse("expected a JSON object".into()));
    };

    let id = object.get("id").and_then(Value::as_u64);
    if let Some(id) = id {
        if let Some(error) = object.remove("error") {
            return Ok(Incoming::Response {
                id,
                result: Err(parse_error_object(error)?),
            });
        }
        if let Some(result) = object.remove("result") {
            return Ok(Incoming::Response {
                id,
                result: Ok(result),
            });
        }
        return Err(RpcError::InvalidResponse(format!(
            "response {} has neither result nor error",
            id
        )));
    }

    let method = object
        .remove("method")
        .and_then(|m| m.as_str().map(str::to_string));
    let params = object.remove("params");
    match (method, params) {
        (Some(method), Some(Value::Object(mut params))) => {
            let subscription = params
                .get("subscription")
                .map(subscription_key)
                .ok_or_else(|| {
                    RpcError::InvalidResponse(format!("notification {} has no subscription", method))
                })?;
            let result = params.remove("result").unwrap_or(Value::Null);
            Ok(Incoming::Notification {
                method,
                subscription,
                result,
            })
        }
        _ => Err(RpcError::InvalidResponse(
            "message is neither a response nor a notification".into(),
        )),
    }
}

fn parse_error_object(value: Value) -> std::result::Result<ErrorObject, RpcError> {
    let code = value
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcError::InvalidResponse("error object without code".into()))?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = value.get("data").cloned();
    Ok(ErrorObject {
        code,
        message,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let params = json!(["0x01"]);
        let request = Request::new(7, "eth_getCode", &params);
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_getCode", "params": ["0x01"]})
        );
    }

    #[test]
    fn test_parse_null_result() {
        let incoming = parse_incoming(json!({"jsonrpc": "2.0", "id": 3, "result": null})).unwrap();
        assert_eq!(
            incoming,
            Incoming::Response {
                id: 3,
                result: Ok(Value::Null)
            }
        );
    }

    #[test]
    fn test_parse_error_response() {
        let incoming = parse_incoming(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();

        match incoming {
            Incoming::Response { id, result: Err(err) } => {
                assert_eq!(id, 4);
                assert_eq!(err.code, -32601);
                assert_eq!(err.message, "Method not found");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification() {
        let incoming = parse_incoming(json!({
            "jsonrpc": "2.0",
            "method": "author_extrinsicUpdate",
            "params": {"subscription": 12, "result": {"inBlock": "0xabc"}}
        }))
        .unwrap();

        assert_eq!(
            incoming,
            Incoming::Notification {
                method: "author_extrinsicUpdate".into(),
                subscription: "12".into(),
                result: json!({"inBlock": "0xabc"}),
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_incoming(json!([1, 2, 3])).is_err());
        assert!(parse_incoming(json!({"id": 1})).is_err());
        assert!(parse_incoming(json!({"method": "x", "params": {}})).is_err());
    }
}
