use std::str::FromStr;
use std::time::SystemTime;

use super::StatusCode;

/// Scalar or array value carried by a [`DataValue`] or an event field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    ByteString(Vec<u8>),
    Array(Vec<Variant>),
}

impl Variant {
    /// Numeric scalars widened to `f64`; `None` for everything else.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Variant::SByte(v) => Some(v as f64),
            Variant::Byte(v) => Some(v as f64),
            Variant::Int16(v) => Some(v as f64),
            Variant::UInt16(v) => Some(v as f64),
            Variant::Int32(v) => Some(v as f64),
            Variant::UInt32(v) => Some(v as f64),
            Variant::Int64(v) => Some(v as f64),
            Variant::UInt64(v) => Some(v as f64),
            Variant::Float(v) => Some(v as f64),
            Variant::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }
}

macro_rules! variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Variant {
            fn from(value: $ty) -> Self {
                Variant::$variant(value)
            }
        })*
    };
}

variant_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<Variant> => Array,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

/// A value together with its quality and timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: Variant,
    pub status: StatusCode,
    pub source_timestamp: Option<SystemTime>,
    pub server_timestamp: Option<SystemTime>,
}

impl DataValue {
    /// Good value without timestamps.
    pub fn new(value: impl Into<Variant>) -> Self {
        DataValue {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Good value stamped with the current time as both source and server timestamp.
    pub fn now(value: impl Into<Variant>) -> Self {
        let now = SystemTime::now();
        DataValue {
            value: value.into(),
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    pub fn with_status(
        mut self,
        status: StatusCode,
    ) -> Self {
        self.status = status;
        self
    }

    pub fn with_source_timestamp(
        mut self,
        timestamp: SystemTime,
    ) -> Self {
        self.source_timestamp = Some(timestamp);
        self
    }

    pub fn with_server_timestamp(
        mut self,
        timestamp: SystemTime,
    ) -> Self {
        self.server_timestamp = Some(timestamp);
        self
    }
}

/// One-dimensional index range, written `"n"` or `"a:b"` with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericRange {
    Index(usize),
    Range(usize, usize),
}

impl FromStr for NumericRange {
    type Err = StatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = StatusCode::BAD_INDEX_RANGE_INVALID;
        if s.contains(',') {
            // Multi-dimensional ranges are not supported.
            return Err(invalid);
        }

        let parse = |part: &str| -> Result<usize, StatusCode> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid);
            }
            part.parse::<usize>().map_err(|_| invalid)
        };

        match s.split_once(':') {
            None => Ok(NumericRange::Index(parse(s)?)),
            Some((low, high)) => {
                let (low, high) = (parse(low)?, parse(high)?);
                if low >= high {
                    return Err(invalid);
                }
                Ok(NumericRange::Range(low, high))
            }
        }
    }
}

impl NumericRange {
    fn bounds(&self) -> (usize, usize) {
        match *self {
            NumericRange::Index(i) => (i, i),
            NumericRange::Range(low, high) => (low, high),
        }
    }

    /// Extracts the range from arrays, strings and byte strings.
    ///
    /// A range starting past the end, or applied to a scalar, yields
    /// `BadIndexRangeNoData`. A range overrunning the end is truncated.
    pub fn apply(
        &self,
        value: &Variant,
    ) -> Result<Variant, StatusCode> {
        let (low, high) = self.bounds();
        let window = |len: usize| -> Result<std::ops::RangeInclusive<usize>, StatusCode> {
            if low >= len {
                return Err(StatusCode::BAD_INDEX_RANGE_NO_DATA);
            }
            Ok(low..=high.min(len - 1))
        };

        match value {
            Variant::Array(items) => Ok(Variant::Array(items[window(items.len())?].to_vec())),
            Variant::ByteString(bytes) => Ok(Variant::ByteString(bytes[window(bytes.len())?].to_vec())),
            Variant::String(text) => {
                let chars: Vec<char> = text.chars().collect();
                Ok(Variant::String(chars[window(chars.len())?].iter().collect()))
            }
            _ => Err(StatusCode::BAD_INDEX_RANGE_NO_DATA),
        }
    }
}
