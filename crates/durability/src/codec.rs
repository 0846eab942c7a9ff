//! Wire format for a single Treasure as it appears inside a chunk file
//! segment: a version byte followed by a `bincode`-encoded record. The
//! chunked file store (`hydraide_storage::chunk_store`) only sees the
//! resulting bytes as an opaque segment; this module is where the
//! Swamp runtime's hydrate/flush paths actually interpret them.

use chrono::{DateTime, Utc};
use hydraide_core::error::{HydraideError, HydraideResult};
use hydraide_core::value::Value;
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION_V1: u8 = 1;

/// A Treasure's full on-disk representation, independent of the live
/// [`hydraide_concurrency::GuardCell`]-backed runtime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasureRecord {
    /// The Treasure's key.
    pub key: String,
    /// Its declared value.
    pub value: Value,
    /// `metadata.created_at`.
    pub created_at: Option<DateTime<Utc>>,
    /// `metadata.created_by`.
    pub created_by: Option<String>,
    /// `metadata.updated_at`.
    pub updated_at: Option<DateTime<Utc>>,
    /// `metadata.updated_by`.
    pub updated_by: Option<String>,
    /// `metadata.expire_at`.
    pub expire_at: Option<DateTime<Utc>>,
    /// Whether this record represents a tombstoned (deleted, pending
    /// physical removal) Treasure.
    pub tombstone: bool,
}

/// Encode a [`TreasureRecord`] as a versioned segment body.
pub fn encode_segment(record: &TreasureRecord) -> HydraideResult<Vec<u8>> {
    let body = bincode::serialize(record)
        .map_err(|e| HydraideError::internal(format!("treasure encode failed: {e}")))?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(SCHEMA_VERSION_V1);
    out.extend(body);
    Ok(out)
}

/// Decode a segment previously produced by [`encode_segment`].
pub fn decode_segment(bytes: &[u8]) -> HydraideResult<TreasureRecord> {
    let (version, body) = bytes
        .split_first()
        .ok_or_else(|| HydraideError::internal("treasure segment is empty"))?;
    match *version {
        SCHEMA_VERSION_V1 => bincode::deserialize(body)
            .map_err(|e| HydraideError::internal(format!("treasure decode failed: {e}"))),
        other => Err(HydraideError::internal(format!(
            "unsupported treasure segment schema version {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> TreasureRecord {
        TreasureRecord {
            key: "k1".into(),
            value: Value::I64(42),
            created_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
            created_by: Some("alice".into()),
            updated_at: Some(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()),
            updated_by: None,
            expire_at: None,
            tombstone: false,
        }
    }

    #[test]
    fn roundtrips_a_record() {
        let record = sample();
        let segment = encode_segment(&record).unwrap();
        assert_eq!(decode_segment(&segment).unwrap(), record);
    }

    #[test]
    fn roundtrips_every_value_kind() {
        let values = vec![
            Value::Void,
            Value::String("s".into()),
            Value::Bool(true),
            Value::I8(-1),
            Value::U64(9),
            Value::F64(1.5),
            Value::Bytes(vec![1, 2, 3]),
        ];
        for value in values {
            let mut record = sample();
            record.value = value;
            let segment = encode_segment(&record).unwrap();
            assert_eq!(decode_segment(&segment).unwrap(), record);
        }
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(decode_segment(&[]).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut segment = encode_segment(&sample()).unwrap();
        segment[0] = 0xFE;
        assert!(decode_segment(&segment).is_err());
    }
}
