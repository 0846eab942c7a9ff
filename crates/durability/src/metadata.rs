//! Versioned binary encoding for a Swamp's durable metadata
//! (`createdAt`), stored as the first framed segment of a Swamp's chunk
//! stream. A fixed, versioned binary schema is used instead of a
//! language-native encoder so the format is stable across future changes.

use chrono::{DateTime, TimeZone, Utc};
use hydraide_core::error::{HydraideError, HydraideResult};
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION_V1: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MetadataV1 {
    created_at_unix_millis: i64,
}

/// Encode `created_at` as a versioned binary blob suitable for use as a
/// Swamp's metadata segment.
pub fn encode(created_at: DateTime<Utc>) -> HydraideResult<Vec<u8>> {
    let payload = MetadataV1 {
        created_at_unix_millis: created_at.timestamp_millis(),
    };
    let body = bincode::serialize(&payload)
        .map_err(|e| HydraideError::internal(format!("metadata encode failed: {e}")))?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(SCHEMA_VERSION_V1);
    out.extend(body);
    Ok(out)
}

/// Decode a blob previously produced by [`encode`], recovering the
/// original `created_at`.
pub fn decode(bytes: &[u8]) -> HydraideResult<DateTime<Utc>> {
    let (version, body) = bytes
        .split_first()
        .ok_or_else(|| HydraideError::internal("metadata blob is empty"))?;
    match *version {
        SCHEMA_VERSION_V1 => {
            let payload: MetadataV1 = bincode::deserialize(body)
                .map_err(|e| HydraideError::internal(format!("metadata decode failed: {e}")))?;
            Utc.timestamp_millis_opt(payload.created_at_unix_millis)
                .single()
                .ok_or_else(|| HydraideError::internal("metadata created_at out of range"))
        }
        other => Err(HydraideError::internal(format!(
            "unsupported metadata schema version {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn roundtrips_created_at() {
        let created_at = Utc.with_ymd_and_hms(2026, 7, 30, 12, 0, 0).unwrap();
        let blob = encode(created_at).unwrap();
        assert_eq!(decode(&blob).unwrap(), created_at);
    }

    #[test]
    fn rejects_empty_blob() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut blob = encode(Utc::now()).unwrap();
        blob[0] = 0xFF;
        assert!(decode(&blob).is_err());
    }
}
