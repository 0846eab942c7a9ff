//! Per-Swamp secondary indexes over Treasures, maintained incrementally on
//! every save and delete.
//!
//! A [`Beacon`] is direction-agnostic at rest: it stores one ascending
//! sorted sequence; [`Order::Descending`] queries simply walk it in
//! reverse. Ties are always broken by key, so pagination is stable even
//! when many Treasures share an index value.

use crate::treasure::Treasure;
use chrono::{DateTime, Utc};
use hydraide_core::value::{Value, ValueKind};
use std::cmp::Ordering;

/// Which field a [`Beacon`] orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeaconKind {
    /// Lexicographic order over the Treasure key itself.
    Key,
    /// Order over the declared value; only Treasures whose value kind
    /// matches `ValueKind` appear in this beacon.
    Value(ValueKind),
    /// Order over `metadata.created_at`; Treasures with no `created_at`
    /// are absent.
    CreatedAt,
    /// Order over `metadata.updated_at`; Treasures with no `updated_at`
    /// are absent.
    UpdatedAt,
    /// Order over `metadata.expire_at`; Treasures with no `expire_at` are
    /// absent.
    ExpireAt,
}

/// Query direction for [`Beacon::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Natural rising order.
    Ascending,
    /// Reverse of ascending.
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
enum Ordinal {
    Str(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

fn compare_ordinal(a: &Ordinal, b: &Ordinal) -> Ordering {
    use Ordinal::*;
    match (a, b) {
        (Str(x), Str(y)) => x.cmp(y),
        (Bool(x), Bool(y)) => x.cmp(y),
        (I8(x), I8(y)) => x.cmp(y),
        (I16(x), I16(y)) => x.cmp(y),
        (I32(x), I32(y)) => x.cmp(y),
        (I64(x), I64(y)) => x.cmp(y),
        (U8(x), U8(y)) => x.cmp(y),
        (U16(x), U16(y)) => x.cmp(y),
        (U32(x), U32(y)) => x.cmp(y),
        (U64(x), U64(y)) => x.cmp(y),
        (F32(x), F32(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (F64(x), F64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Bytes(x), Bytes(y)) => x.cmp(y),
        (Timestamp(x), Timestamp(y)) => x.cmp(y),
        // A single beacon only ever holds entries of one kind; this arm is
        // unreachable under correct use.
        _ => Ordering::Equal,
    }
}

fn ordinal_for(kind: BeaconKind, key: &str, treasure: &Treasure) -> Option<Ordinal> {
    match kind {
        BeaconKind::Key => Some(Ordinal::Str(key.to_string())),
        BeaconKind::Value(value_kind) => value_to_ordinal(value_kind, &treasure.value()),
        BeaconKind::CreatedAt => treasure.metadata().created_at.map(Ordinal::Timestamp),
        BeaconKind::UpdatedAt => treasure.metadata().updated_at.map(Ordinal::Timestamp),
        BeaconKind::ExpireAt => treasure.metadata().expire_at.map(Ordinal::Timestamp),
    }
}

fn value_to_ordinal(expected: ValueKind, value: &Value) -> Option<Ordinal> {
    if value.kind() != expected {
        return None;
    }
    Some(match value {
        Value::Void => return None,
        Value::String(s) => Ordinal::Str(s.clone()),
        Value::Bool(b) => Ordinal::Bool(*b),
        Value::I8(v) => Ordinal::I8(*v),
        Value::I16(v) => Ordinal::I16(*v),
        Value::I32(v) => Ordinal::I32(*v),
        Value::I64(v) => Ordinal::I64(*v),
        Value::U8(v) => Ordinal::U8(*v),
        Value::U16(v) => Ordinal::U16(*v),
        Value::U32(v) => Ordinal::U32(*v),
        Value::U64(v) => Ordinal::U64(*v),
        Value::F32(v) => Ordinal::F32(*v),
        Value::F64(v) => Ordinal::F64(*v),
        Value::Bytes(b) => Ordinal::Bytes(b.clone()),
        Value::Uint32Slice(_) => return None,
    })
}

/// A single sorted secondary index over one Swamp's Treasures.
#[derive(Debug)]
pub struct Beacon {
    kind: BeaconKind,
    /// Sorted ascending by `(ordinal, key)`; key is the tiebreaker.
    entries: Vec<(Ordinal, String)>,
}

impl Beacon {
    /// A fresh, empty beacon of the given kind.
    pub fn new(kind: BeaconKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// This beacon's kind.
    pub fn kind(&self) -> BeaconKind {
        self.kind
    }

    /// Number of Treasures currently indexed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no Treasure is currently indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(_, k)| k == key)
    }

    /// Re-index `treasure` under `key`, replacing any prior entry. A
    /// Treasure whose relevant field is absent or of the wrong kind is
    /// removed from this beacon (if present) and not re-added.
    pub fn upsert(&mut self, key: &str, treasure: &Treasure) {
        if let Some(pos) = self.position_of(key) {
            self.entries.remove(pos);
        }
        if let Some(ordinal) = ordinal_for(self.kind, key, treasure) {
            let insert_at = self
                .entries
                .binary_search_by(|(existing, existing_key)| {
                    compare_ordinal(existing, &ordinal).then_with(|| existing_key.as_str().cmp(key))
                })
                .unwrap_or_else(|e| e);
            self.entries.insert(insert_at, (ordinal, key.to_string()));
        }
    }

    /// Remove `key` from this beacon, if present.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.position_of(key) {
            self.entries.remove(pos);
        }
    }

    /// Paginated keys in `order`. `limit == 0` means "no limit". `from` is
    /// a zero-based offset applied after ordering.
    pub fn query(&self, order: Order, from: usize, limit: usize) -> Vec<String> {
        let ordered: Box<dyn Iterator<Item = &(Ordinal, String)>> = match order {
            Order::Ascending => Box::new(self.entries.iter()),
            Order::Descending => Box::new(self.entries.iter().rev()),
        };
        let skipped = ordered.skip(from);
        let keys: Vec<String> = if limit == 0 {
            skipped.map(|(_, k)| k.clone()).collect()
        } else {
            skipped.take(limit).map(|(_, k)| k.clone()).collect()
        };
        keys
    }
}
