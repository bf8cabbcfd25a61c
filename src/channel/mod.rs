// SPDX-License-Identifier: GPL-3.0-only

//! Method channel messages
//!
//! The host talks to the plugin with method calls: a method name plus an
//! argument value. Every call gets exactly one reply, which is a success
//! value, an error envelope, or "not implemented".

pub mod codec;

pub use codec::{JsonMethodCodec, MethodCodec};

use crate::errors::{CameraError, ChannelError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A decoded method call
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    /// Argument value; `Null` when the call has none
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Call without arguments
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Named argument, `None` when absent or null
    pub fn argument<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ChannelError> {
        match self.arguments.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                ChannelError::InvalidArgument {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Named argument that must be present
    pub fn required_argument<T: DeserializeOwned>(&self, name: &str) -> Result<T, ChannelError> {
        self.argument(name)?
            .ok_or_else(|| ChannelError::MissingArgument(name.to_string()))
    }
}

/// Reply to a method call
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(Value),
    Error {
        code: String,
        message: Option<String>,
        details: Value,
    },
    NotImplemented,
}

impl MethodResult {
    /// Success without a value
    pub fn ok() -> Self {
        MethodResult::Success(Value::Null)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResult::Error {
            code: code.into(),
            message: Some(message.into()),
            details: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }

    /// Error code, if this is an error envelope
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodResult::Error { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

impl From<CameraError> for MethodResult {
    fn from(err: CameraError) -> Self {
        MethodResult::error(err.code(), err.to_string())
    }
}

impl From<ChannelError> for MethodResult {
    fn from(err: ChannelError) -> Self {
        MethodResult::error(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::error_codes;
    use serde_json::json;

    #[test]
    fn test_arguments() {
        let call = MethodCall::new("takePicture", json!({"filePath": "/tmp/a.jpg", "mode": null}));
        assert_eq!(
            call.required_argument::<String>("filePath").unwrap(),
            "/tmp/a.jpg"
        );
        assert_eq!(call.argument::<i64>("mode").unwrap(), None);
        assert!(matches!(
            call.required_argument::<i64>("mode"),
            Err(ChannelError::MissingArgument(_))
        ));
        assert!(matches!(
            call.required_argument::<i64>("filePath"),
            Err(ChannelError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_bare_call_has_no_arguments() {
        let call = MethodCall::bare("initialize");
        assert_eq!(call.argument::<String>("filePath").unwrap(), None);
    }

    #[test]
    fn test_camera_error_envelope() {
        let result = MethodResult::from(CameraError::NoActiveSession);
        assert_eq!(result.error_code(), Some(error_codes::NO_ACTIVE_SESSION));
        assert!(!result.is_success());
    }
}
