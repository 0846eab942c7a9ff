//! The Treasure value cell: a tagged union over every primitive type a
//! Treasure may hold, plus the discriminant used to tell typed beacons and
//! typed mutators which arm is live without matching the whole value.

use serde::{Deserialize, Serialize};

/// Unified value type for all Treasures.
///
/// The declared type is persisted; a cross-type mutation (e.g. calling an
/// `i32` setter on a Treasure currently holding a `String`) is a typed
/// failure, never a silent coercion — see `hydraide_core::error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value has ever been set on this Treasure.
    Void,
    /// UTF-8 string.
    String(String),
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Unordered set of `u32`, stored sorted and deduplicated. Used for
    /// reverse-index style Treasures (e.g. "which order IDs reference this
    /// customer") where the Treasure itself is the index entry.
    Uint32Slice(Vec<u32>),
}

/// Discriminant for [`Value`], used by value-typed beacons (only Treasures
/// whose declared kind matches a beacon's kind appear in it) and by typed
/// mutators to report a kind mismatch without cloning the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Void,
    String,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bytes,
    Uint32Slice,
}

impl Value {
    /// The discriminant of this value, independent of its payload.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Void => ValueKind::Void,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Uint32Slice(_) => ValueKind::Uint32Slice,
        }
    }

    /// Is this value numeric (any integer or float width)? Used to decide
    /// whether a typed increment is even applicable.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::I8
                | ValueKind::I16
                | ValueKind::I32
                | ValueKind::I64
                | ValueKind::U8
                | ValueKind::U16
                | ValueKind::U32
                | ValueKind::U64
                | ValueKind::F32
                | ValueKind::F64
        )
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Value::Void.kind(), ValueKind::Void);
        assert_eq!(Value::I64(7).kind(), ValueKind::I64);
        assert_eq!(Value::Bytes(vec![1, 2]).kind(), ValueKind::Bytes);
    }

    #[test]
    fn numeric_classification() {
        assert!(Value::I64(1).is_numeric());
        assert!(Value::F32(1.0).is_numeric());
        assert!(!Value::String("x".into()).is_numeric());
        assert!(!Value::Bool(true).is_numeric());
        assert!(!Value::Void.is_numeric());
    }

    #[test]
    fn default_is_void() {
        assert_eq!(Value::default(), Value::Void);
    }

    #[test]
    fn serialization_roundtrip_all_variants() {
        let values = vec![
            Value::Void,
            Value::String("hi".into()),
            Value::Bool(true),
            Value::I8(-1),
            Value::I16(-1),
            Value::I32(-1),
            Value::I64(-1),
            Value::U8(1),
            Value::U16(1),
            Value::U32(1),
            Value::U64(1),
            Value::F32(1.5),
            Value::F64(1.5),
            Value::Bytes(vec![9, 9, 9]),
            Value::Uint32Slice(vec![1, 2, 3]),
        ];
        for v in values {
            let encoded = serde_json::to_string(&v).unwrap();
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            assert_eq!(v, decoded);
        }
    }
}
