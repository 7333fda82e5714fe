//! Encoding of cached values.
//!
//! Values are JSON. Hash-layout fields carry their own expiry because the
//! backend only expires whole keys.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed cache payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ttl out of range")]
    TtlOutOfRange,
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// A hash field with an explicit expiry instant.
#[derive(Debug, Serialize, Deserialize)]
struct FieldEnvelope<T> {
    expires_at: DateTime<Utc>,
    value: T,
}

pub fn encode_field<T: Serialize>(
    value: &T,
    ttl: std::time::Duration,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, CodecError> {
    let ttl = ChronoDuration::from_std(ttl).map_err(|_| CodecError::TtlOutOfRange)?;
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(CodecError::TtlOutOfRange)?;

    encode(&FieldEnvelope { expires_at, value })
}

/// Decode a hash field; `Ok(None)` when it has expired.
pub fn decode_field<T: DeserializeOwned>(
    bytes: &[u8],
    now: DateTime<Utc>,
) -> Result<Option<T>, CodecError> {
    let envelope: FieldEnvelope<T> = decode(bytes)?;
    if envelope.expires_at <= now {
        return Ok(None);
    }
    Ok(Some(envelope.value))
}
