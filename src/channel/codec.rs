// SPDX-License-Identifier: GPL-3.0-only

//! Byte encodings for method calls and replies
//!
//! The JSON layout:
//!
//! - call: `{"method": "<name>", "args": <value>}`
//! - success: `[<value>]`
//! - error: `["<code>", "<message>" | null, <details>]`
//! - not implemented: empty message

use super::{MethodCall, MethodResult};
use crate::errors::ChannelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Converts method calls and replies to and from bytes
pub trait MethodCodec: Send + Sync {
    fn encode_call(&self, call: &MethodCall) -> Result<Vec<u8>, ChannelError>;

    fn decode_call(&self, bytes: &[u8]) -> Result<MethodCall, ChannelError>;

    fn encode_result(&self, result: &MethodResult) -> Result<Vec<u8>, ChannelError>;

    fn decode_result(&self, bytes: &[u8]) -> Result<MethodResult, ChannelError>;
}

/// JSON method codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMethodCodec;

#[derive(Serialize, Deserialize)]
struct CallEnvelope {
    method: String,
    #[serde(default)]
    args: Value,
}

fn encode_error(err: serde_json::Error) -> ChannelError {
    ChannelError::Encode(err.to_string())
}

impl MethodCodec for JsonMethodCodec {
    fn encode_call(&self, call: &MethodCall) -> Result<Vec<u8>, ChannelError> {
        let envelope = CallEnvelope {
            method: call.method.clone(),
            args: call.arguments.clone(),
        };
        serde_json::to_vec(&envelope).map_err(encode_error)
    }

    fn decode_call(&self, bytes: &[u8]) -> Result<MethodCall, ChannelError> {
        let envelope: CallEnvelope = serde_json::from_slice(bytes)?;
        Ok(MethodCall {
            method: envelope.method,
            arguments: envelope.args,
        })
    }

    fn encode_result(&self, result: &MethodResult) -> Result<Vec<u8>, ChannelError> {
        match result {
            MethodResult::Success(value) => serde_json::to_vec(&[value]).map_err(encode_error),
            MethodResult::Error {
                code,
                message,
                details,
            } => serde_json::to_vec(&(code, message, details)).map_err(encode_error),
            MethodResult::NotImplemented => Ok(Vec::new()),
        }
    }

    fn decode_result(&self, bytes: &[u8]) -> Result<MethodResult, ChannelError> {
        if bytes.is_empty() {
            return Ok(MethodResult::NotImplemented);
        }

        let items: Vec<Value> = serde_json::from_slice(bytes)?;
        match items.as_slice() {
            [value] => Ok(MethodResult::Success(value.clone())),
            [Value::String(code), message, details] => Ok(MethodResult::Error {
                code: code.clone(),
                message: message.as_str().map(str::to_string),
                details: details.clone(),
            }),
            _ => Err(ChannelError::Decode(format!(
                "reply envelope has {} elements",
                items.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_layout() {
        let codec = JsonMethodCodec;
        let bytes = codec
            .encode_call(&MethodCall::new("setFlashMode", json!({"mode": 3})))
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"method": "setFlashMode", "args": {"mode": 3}}));
    }

    #[test]
    fn test_call_without_args() {
        let call = JsonMethodCodec.decode_call(br#"{"method":"initialize"}"#).unwrap();
        assert_eq!(call, MethodCall::bare("initialize"));
    }

    #[test]
    fn test_result_layouts() {
        let codec = JsonMethodCodec;

        let ok = codec.encode_result(&MethodResult::Success(json!(7))).unwrap();
        assert_eq!(ok, b"[7]");

        let err = codec
            .encode_result(&MethodResult::error("NO_ACTIVE_SESSION", "none"))
            .unwrap();
        assert_eq!(err, br#"["NO_ACTIVE_SESSION","none",null]"#);

        assert!(codec.encode_result(&MethodResult::NotImplemented).unwrap().is_empty());
    }

    #[test]
    fn test_decode_result_envelopes() {
        let codec = JsonMethodCodec;
        assert_eq!(
            codec.decode_result(b"[null]").unwrap(),
            MethodResult::ok()
        );
        assert_eq!(
            codec.decode_result(br#"["CODE",null,{"k":1}]"#).unwrap(),
            MethodResult::Error {
                code: "CODE".into(),
                message: None,
                details: json!({"k": 1}),
            }
        );
        assert_eq!(codec.decode_result(b"").unwrap(), MethodResult::NotImplemented);
        assert!(codec.decode_result(b"[1,2]").is_err());
    }

    #[test]
    fn test_malformed_call() {
        assert!(matches!(
            JsonMethodCodec.decode_call(b"{not json"),
            Err(ChannelError::Decode(_))
        ));
        assert!(JsonMethodCodec.decode_call(br#"{"args":1}"#).is_err());
    }
}
