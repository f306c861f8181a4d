//! Persisted store format.
//!
//! The in-memory document store can dump its records to a [`StoreState`]
//! and reload them later. The state is encoded with postcard behind a small
//! magic/version header so stale files are rejected instead of misread.

use serde::{Deserialize, Serialize};

use crate::document::Fields;
use crate::path::DocPath;

/// File magic for persisted store state.
const MAGIC: &[u8; 4] = b"TBST";
/// Current format version.
const VERSION: u8 = 1;

/// Error type for state encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Header is missing, truncated or from another format version.
    #[error("invalid state header: {0}")]
    InvalidHeader(String),
}

/// Every record held by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    /// Records keyed by path.
    pub documents: Vec<(DocPath, Fields)>,
}

/// Encodes a [`StoreState`] with the format header.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the state cannot be serialized.
pub fn encode_state(state: &StoreState) -> Result<Vec<u8>, CodecError> {
    let payload =
        postcard::to_allocvec(state).map_err(|e| CodecError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes bytes produced by [`encode_state`].
///
/// # Errors
///
/// Returns `CodecError::InvalidHeader` for a missing or mismatched header
/// and `CodecError::Serialization` for a corrupt payload.
pub fn decode_state(bytes: &[u8]) -> Result<StoreState, CodecError> {
    let Some(rest) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Err(CodecError::InvalidHeader("missing magic".to_string()));
    };
    let Some((&version, payload)) = rest.split_first() else {
        return Err(CodecError::InvalidHeader("missing version".to_string()));
    };
    if version != VERSION {
        return Err(CodecError::InvalidHeader(format!(
            "unsupported version {version}"
        )));
    }
    postcard::from_bytes(payload).map_err(|e| CodecError::Serialization(e.to_string()))
}
