//! Primitive mapper: intrinsic host types → base JSON Schema fragments.
//!
//! Every variant has an entry; the match below is exhaustive so a new
//! primitive cannot be added without deciding its schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Intrinsic type identities the extractor can hand us for a `System` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    Boolean,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    Char,
    String,
    DateTime,
    DateTimeOffset,
    DateOnly,
    TimeOnly,
    TimeSpan,
    Guid,
    Uri,
}

// decimal's representable range, as the nearest f64
const DECIMAL_MAX: f64 = 79_228_162_514_264_337_593_543_950_335.0;

impl Primitive {
    /// Base schema for this primitive. `type` is always one of
    /// boolean/integer/number/string.
    pub fn schema(self) -> Value {
        match self {
            Primitive::Boolean => json!({ "type": "boolean" }),

            Primitive::Byte => integer(u8::MIN, u8::MAX),
            Primitive::SByte => integer(i8::MIN, i8::MAX),
            Primitive::Int16 => integer(i16::MIN, i16::MAX),
            Primitive::UInt16 => integer(u16::MIN, u16::MAX),
            Primitive::Int32 => integer(i32::MIN, i32::MAX),
            Primitive::UInt32 => integer(u32::MIN, u32::MAX),
            Primitive::Int64 => integer(i64::MIN, i64::MAX),
            Primitive::UInt64 => integer(u64::MIN, u64::MAX),

            Primitive::Single => number(f32::MIN as f64, f32::MAX as f64),
            Primitive::Double => number(f64::MIN, f64::MAX),
            Primitive::Decimal => number(-DECIMAL_MAX, DECIMAL_MAX),

            Primitive::Char => json!({ "type": "string", "minLength": 1, "maxLength": 1 }),
            Primitive::String => json!({ "type": "string" }),

            Primitive::DateTime | Primitive::DateTimeOffset => string_format("date-time"),
            Primitive::DateOnly => string_format("date"),
            Primitive::TimeOnly => string_format("time"),
            Primitive::TimeSpan => string_format("duration"),
            Primitive::Guid => string_format("uuid"),
            Primitive::Uri => string_format("uri"),
        }
    }

    /// True when values of this primitive serialize as JSON strings, which
    /// makes them acceptable object keys without a dictionary-key policy.
    pub fn is_string_like(self) -> bool {
        self.schema()["type"] == "string"
    }

    /// Stable ordinal used by the structural hash.
    pub(crate) fn ordinal(self) -> u64 {
        self as u64
    }
}

fn integer<T: Serialize>(min: T, max: T) -> Value {
    json!({ "type": "integer", "minimum": min, "maximum": max })
}

fn number(min: f64, max: f64) -> Value {
    json!({ "type": "number", "minimum": min, "maximum": max })
}

fn string_format(format: &str) -> Value {
    json!({ "type": "string", "format": format })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_integers_carry_their_range() {
        let s = Primitive::Byte.schema();
        assert_eq!(s["type"], "integer");
        assert_eq!(s["minimum"], 0);
        assert_eq!(s["maximum"], 255);

        let s = Primitive::Int64.schema();
        assert_eq!(s["minimum"], i64::MIN);
        assert_eq!(s["maximum"], i64::MAX);

        let s = Primitive::UInt64.schema();
        assert_eq!(s["maximum"], u64::MAX);
    }

    #[test]
    fn calendar_kinds_are_formatted_strings() {
        assert_eq!(Primitive::DateTime.schema(), json!({ "type": "string", "format": "date-time" }));
        assert_eq!(Primitive::DateOnly.schema()["format"], "date");
        assert_eq!(Primitive::TimeSpan.schema()["format"], "duration");
        assert_eq!(Primitive::Guid.schema()["format"], "uuid");
    }

    #[test]
    fn string_like_keys() {
        assert!(Primitive::String.is_string_like());
        assert!(Primitive::Guid.is_string_like());
        assert!(Primitive::Char.is_string_like());
        assert!(!Primitive::Int32.is_string_like());
        assert!(!Primitive::Boolean.is_string_like());
        assert!(!Primitive::Double.is_string_like());
    }

    #[test]
    fn parses_camel_case_identities() {
        let p: Primitive = serde_json::from_str("\"dateTimeOffset\"").unwrap();
        assert_eq!(p, Primitive::DateTimeOffset);
        let p: Primitive = serde_json::from_str("\"uInt16\"").unwrap();
        assert_eq!(p, Primitive::UInt16);
    }
}
