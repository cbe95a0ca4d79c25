//! Internal helpers mapping HTTP, reqwest and JSON-RPC failures to [`RuntimeError`].

use waypoint_core::{RemoteFailure, RuntimeError};

use crate::types::{RpcError, TIMEOUT_CODE};

/// Map a non-success HTTP status to a [`RuntimeError`].
///
/// A 408 or 504 is the transport's own timeout signal. Anything else means
/// the JSON-RPC endpoint was not reached properly.
pub(crate) fn map_http_status(method: &str, status: reqwest::StatusCode, body: &str) -> RuntimeError {
    match status.as_u16() {
        408 | 504 => RuntimeError::Timeout {
            method: method.to_owned(),
        },
        _ => RuntimeError::Transport(format!("HTTP {status}: {body}")),
    }
}

/// Map a [`reqwest::Error`] to a [`RuntimeError`].
pub(crate) fn map_reqwest_error(method: &str, err: reqwest::Error) -> RuntimeError {
    if err.is_timeout() {
        RuntimeError::Timeout {
            method: method.to_owned(),
        }
    } else {
        RuntimeError::Transport(err.to_string())
    }
}

/// Map a JSON-RPC error object to a [`RuntimeError`].
///
/// Timeouts are recognised by code or by `data.kind`, never by message.
pub(crate) fn map_rpc_error(method: &str, err: RpcError) -> RuntimeError {
    let kind_is_timeout = err
        .data
        .as_ref()
        .and_then(|d| d.get("kind"))
        .and_then(|k| k.as_str())
        == Some("timeout");
    if err.code == TIMEOUT_CODE || kind_is_timeout {
        return RuntimeError::Timeout {
            method: method.to_owned(),
        };
    }
    RuntimeError::Remote(RemoteFailure {
        code: Some(err.code),
        message: err.message,
        data: err.data,
    })
}

/// A reply that could not be decoded.
pub(crate) fn malformed(method: &str, reason: impl ToString) -> RuntimeError {
    RuntimeError::Malformed {
        method: method.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i64, message: &str, data: Option<serde_json::Value>) -> RpcError {
        RpcError {
            code,
            message: message.into(),
            data,
        }
    }

    #[test]
    fn timeout_code_is_a_timeout() {
        let err = map_rpc_error("call", rpc(-32001, "request expired", None));
        assert!(err.is_timeout());
    }

    #[test]
    fn timeout_kind_is_a_timeout() {
        let err = map_rpc_error(
            "call",
            rpc(-32000, "zome call failed", Some(serde_json::json!({"kind": "timeout"}))),
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn timeout_in_message_alone_is_remote() {
        let err = map_rpc_error("call", rpc(-32000, "Timeout while validating", None));
        match err {
            RuntimeError::Remote(failure) => {
                assert_eq!(failure.code, Some(-32000));
                assert_eq!(failure.message, "Timeout while validating");
            }
            other => panic!("expected Remote, got: {other:?}"),
        }
    }

    #[test]
    fn gateway_timeout_status_is_a_timeout() {
        let err = map_http_status("call", reqwest::StatusCode::GATEWAY_TIMEOUT, "");
        assert!(err.is_timeout());
    }

    #[test]
    fn other_status_is_transport_with_body() {
        let err = map_http_status("call", reqwest::StatusCode::NOT_FOUND, "no route");
        match err {
            RuntimeError::Transport(msg) => {
                assert!(msg.contains("404"), "expected status in message: {msg}");
                assert!(msg.contains("no route"), "expected body in message: {msg}");
            }
            other => panic!("expected Transport, got: {other:?}"),
        }
    }
}
