//! Revert reason decoding.
//!
//! Turns JSON-RPC error responses and raw revert payloads into the short
//! human-readable message shown on a failed transaction record.

use alloy::sol_types::{Panic, Revert, SolError};
use alloy::transports::{RpcError, TransportErrorKind};
use tracing::debug;

/// Extracts the collaborator-supplied message from an RPC error response.
///
/// Returns `None` for transport-level failures that never reached the node
/// (connection refused, serialization), since those carry no node message.
/// When the response includes revert data that decodes as `Error(string)` or
/// `Panic(uint256)`, the decoded reason is appended to the node message.
pub fn revert_reason(error: &RpcError<TransportErrorKind>) -> Option<String> {
    let payload = error.as_error_resp()?;

    if let Some(revert_data) = payload.as_revert_data() {
        if let Some(reason) = decode_revert_data(&revert_data) {
            return Some(format!("{}: {reason}", payload.message));
        }
        debug!("Failed to decode revert data");
    }

    Some(payload.message.to_string())
}

/// Decodes standard Solidity revert payloads.
pub fn decode_revert_data(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason);
    }

    if let Ok(panic) = Panic::abi_decode(data) {
        return Some(panic.to_string());
    }

    None
}
