//! Leaf value conversion.
//!
//! Two entry points exist per leaf: text (environment values and default
//! literals) and tree nodes (decoded configuration). Tree decoding is weakly
//! typed: numbers, strings and bools convert into each other where the
//! target allows it.

use super::{Bind, BindContext, Element, Field, FieldMeta, FieldPath};
use crate::error::{ConvertError, DecodeError};
use crate::merge::kind_of;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::num::{IntErrorKind, ParseIntError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Shape of a leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Sequence,
    Optional,
}

/// A directly settable leaf value.
pub trait Leaf {
    fn kind(&self) -> FieldKind;

    /// True when the field holds its type's zero value.
    fn is_zero(&self) -> bool;

    /// Whether a default literal may be applied to this field.
    fn accepts_default(&self) -> bool {
        true
    }

    /// Replace the value with one parsed from text.
    fn set_from_str(&mut self, raw: &str, ctx: &BindContext) -> Result<(), ConvertError>;

    /// Replace the value with a decoded tree node. `null` leaves it untouched.
    fn decode_node(&mut self, node: &Value, ctx: &BindContext) -> Result<(), ConvertError>;
}

/// A single value type that can be parsed from text or a tree node.
pub trait Scalar: Sized {
    /// Type name used in conversion errors.
    const NAME: &'static str;

    /// Booleans refuse default literals.
    const ACCEPTS_DEFAULT: bool = true;

    fn parse_str(raw: &str, ctx: &BindContext) -> Result<Self, ConvertError>;

    /// Convert a non-null node.
    fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError>;

    fn is_zero(&self) -> bool;
}

fn mismatch(expected: &'static str, node: &Value) -> ConvertError {
    ConvertError::Mismatch {
        expected,
        found: kind_of(node),
    }
}

/// Parse a boolean the way configuration files and shells spell them.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts `0`, `f`, `F`, `FALSE`, `false`, `False`.
pub fn parse_bool(raw: &str) -> Result<bool, ConvertError> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ConvertError::invalid("bool", raw)),
    }
}

fn parse_int<T>(raw: &str, kind: &'static str) -> Result<T, ConvertError>
where
    T: FromStr<Err = ParseIntError>,
{
    let raw = raw.trim();
    raw.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            ConvertError::out_of_range(kind, raw)
        }
        // "-5" into an unsigned type
        _ if is_negative_integer(raw) => ConvertError::out_of_range(kind, raw),
        _ => ConvertError::invalid(kind, raw),
    })
}

fn is_negative_integer(raw: &str) -> bool {
    raw.strip_prefix('-')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Split a list literal: `[5,10,15]` or `5,10,15`. Elements are trimmed.
pub(crate) fn split_list(raw: &str) -> Vec<&str> {
    let raw = raw.trim();
    let inner = raw.strip_prefix('[').unwrap_or(raw);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner.split(',').map(str::trim).collect()
}

impl Scalar for String {
    const NAME: &'static str = "string";

    fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
        Ok(raw.to_string())
    }

    fn from_node(node: &Value, _ctx: &BindContext) -> Result<Self, ConvertError> {
        match node {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            other => Err(mismatch(Self::NAME, other)),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Scalar for PathBuf {
    const NAME: &'static str = "path";

    fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
        Ok(PathBuf::from(raw))
    }

    fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError> {
        String::from_node(node, ctx).map(PathBuf::from)
    }

    fn is_zero(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

impl Scalar for bool {
    const NAME: &'static str = "bool";
    const ACCEPTS_DEFAULT: bool = false;

    fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
        parse_bool(raw)
    }

    fn from_node(node: &Value, _ctx: &BindContext) -> Result<Self, ConvertError> {
        match node {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) if s.is_empty() => Ok(false),
            Value::String(s) => parse_bool(s),
            other => Err(mismatch(Self::NAME, other)),
        }
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

macro_rules! int_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Scalar for $ty {
            const NAME: &'static str = stringify!($ty);

            fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
                parse_int::<$ty>(raw, Self::NAME)
            }

            fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError> {
                match node {
                    Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            <$ty>::try_from(i).map_err(|_| ConvertError::out_of_range(Self::NAME, i))
                        } else if let Some(u) = n.as_u64() {
                            <$ty>::try_from(u).map_err(|_| ConvertError::out_of_range(Self::NAME, u))
                        } else {
                            let f = n.as_f64().unwrap_or_default().trunc();
                            if f < i64::MIN as f64 || f > i64::MAX as f64 {
                                return Err(ConvertError::out_of_range(Self::NAME, f));
                            }
                            <$ty>::try_from(f as i64)
                                .map_err(|_| ConvertError::out_of_range(Self::NAME, f))
                        }
                    }
                    Value::String(s) if s.trim().is_empty() => Ok(0),
                    Value::String(s) => Self::parse_str(s, ctx),
                    Value::Bool(b) => Ok(<$ty>::from(*b)),
                    other => Err(mismatch(Self::NAME, other)),
                }
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

int_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Scalar for $ty {
            const NAME: &'static str = stringify!($ty);

            fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
                let text = raw.trim();
                let value = text
                    .parse::<$ty>()
                    .map_err(|_| ConvertError::invalid(Self::NAME, raw))?;
                if value.is_infinite() && !is_infinity_literal(text) {
                    return Err(ConvertError::out_of_range(Self::NAME, text));
                }
                Ok(value)
            }

            fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError> {
                match node {
                    Value::Number(n) => {
                        let wide = n.as_f64().unwrap_or_default();
                        let value = wide as $ty;
                        if value.is_infinite() && wide.is_finite() {
                            return Err(ConvertError::out_of_range(Self::NAME, n));
                        }
                        Ok(value)
                    }
                    Value::String(s) if s.trim().is_empty() => Ok(0.0),
                    Value::String(s) => Self::parse_str(s, ctx),
                    Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                    other => Err(mismatch(Self::NAME, other)),
                }
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }
        }
    )*};
}

/// `inf`, `+Infinity` and friends parse to infinity on purpose.
fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

float_scalar!(f32, f64);

/// Go-style `1.5h` or `2h45m30.5s`: decimal numbers each followed by a
/// unit from ns, us, µs, ms, s, m, h.
fn parse_fractional_duration(text: &str) -> Option<Duration> {
    let mut rest = text;
    let mut nanos = 0.0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let amount: f64 = number.parse().ok()?;
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += amount * scale;
        rest = tail;
    }
    if text.is_empty() || !nanos.is_finite() || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

impl Scalar for Duration {
    const NAME: &'static str = "duration";

    fn parse_str(raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
        let raw = raw.trim();
        if raw == "0" {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(raw).or_else(|source| {
            parse_fractional_duration(raw).ok_or_else(|| ConvertError::Duration {
                value: raw.to_string(),
                source,
            })
        })
    }

    /// Bare integers are nanoseconds.
    fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError> {
        match node {
            Value::Number(n) => {
                if let Some(nanos) = n.as_u64() {
                    Ok(Duration::from_nanos(nanos))
                } else {
                    let f = n.as_f64().unwrap_or_default();
                    if f < 0.0 {
                        return Err(ConvertError::out_of_range(Self::NAME, n));
                    }
                    Ok(Duration::from_nanos(f as u64))
                }
            }
            Value::String(s) => Self::parse_str(s, ctx),
            other => Err(mismatch(Self::NAME, other)),
        }
    }

    fn is_zero(&self) -> bool {
        Duration::is_zero(self)
    }
}

impl Scalar for DateTime<Utc> {
    const NAME: &'static str = "time";

    fn parse_str(raw: &str, ctx: &BindContext) -> Result<Self, ConvertError> {
        ctx.time_layout.parse(raw.trim())
    }

    fn from_node(node: &Value, ctx: &BindContext) -> Result<Self, ConvertError> {
        match node {
            Value::String(s) => Self::parse_str(s, ctx),
            other => Err(mismatch(Self::NAME, other)),
        }
    }

    /// The epoch, which is what `Default` gives. An explicit epoch cannot be
    /// told apart from an unset field; use `Option<DateTime<Utc>>` for that.
    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }
}

/// Untyped fields take any node as-is but cannot be set from text.
impl Scalar for Value {
    const NAME: &'static str = "interface";

    fn parse_str(_raw: &str, _ctx: &BindContext) -> Result<Self, ConvertError> {
        Err(ConvertError::Unsupported(Self::NAME))
    }

    fn from_node(node: &Value, _ctx: &BindContext) -> Result<Self, ConvertError> {
        Ok(node.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl<T: Scalar> Leaf for Vec<T> {
    fn kind(&self) -> FieldKind {
        FieldKind::Sequence
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn set_from_str(&mut self, raw: &str, ctx: &BindContext) -> Result<(), ConvertError> {
        *self = split_list(raw)
            .into_iter()
            .map(|item| T::parse_str(item, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    fn decode_node(&mut self, node: &Value, ctx: &BindContext) -> Result<(), ConvertError> {
        *self = match node {
            Value::Null => return Ok(()),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => Err(mismatch(T::NAME, item)),
                    _ => T::from_node(item, ctx),
                })
                .collect::<Result<Vec<_>, _>>()?,
            single => vec![T::from_node(single, ctx)?],
        };
        Ok(())
    }
}

impl<T: Scalar> Leaf for Option<T> {
    fn kind(&self) -> FieldKind {
        FieldKind::Optional
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn set_from_str(&mut self, raw: &str, ctx: &BindContext) -> Result<(), ConvertError> {
        *self = Some(T::parse_str(raw, ctx)?);
        Ok(())
    }

    fn decode_node(&mut self, node: &Value, ctx: &BindContext) -> Result<(), ConvertError> {
        if !node.is_null() {
            *self = Some(T::from_node(node, ctx)?);
        }
        Ok(())
    }
}

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Leaf for $ty {
            fn kind(&self) -> FieldKind {
                FieldKind::Scalar
            }

            fn is_zero(&self) -> bool {
                Scalar::is_zero(self)
            }

            fn accepts_default(&self) -> bool {
                <$ty as Scalar>::ACCEPTS_DEFAULT
            }

            fn set_from_str(&mut self, raw: &str, ctx: &BindContext) -> Result<(), ConvertError> {
                *self = <$ty as Scalar>::parse_str(raw, ctx)?;
                Ok(())
            }

            fn decode_node(&mut self, node: &Value, ctx: &BindContext) -> Result<(), ConvertError> {
                if !node.is_null() {
                    *self = <$ty as Scalar>::from_node(node, ctx)?;
                }
                Ok(())
            }
        }

        impl Bind for $ty {
            fn flatten<'a>(
                &'a mut self,
                meta: &'static FieldMeta,
                path: FieldPath,
                ctx: &BindContext,
                out: &mut Vec<Field<'a>>,
            ) {
                out.push(Field::new(path, meta, ctx, self));
            }

            fn decode(
                &mut self,
                node: &Value,
                path: &FieldPath,
                ctx: &BindContext,
            ) -> Result<(), DecodeError> {
                Leaf::decode_node(self, node, ctx).map_err(|e| DecodeError::new(path.as_str(), e))
            }
        }

        impl Element for $ty {
            fn flatten_vec<'a>(
                items: &'a mut Vec<Self>,
                meta: &'static FieldMeta,
                path: FieldPath,
                ctx: &BindContext,
                out: &mut Vec<Field<'a>>,
            ) {
                out.push(Field::new(path, meta, ctx, items));
            }

            fn decode_vec(
                items: &mut Vec<Self>,
                node: &Value,
                path: &FieldPath,
                ctx: &BindContext,
            ) -> Result<(), DecodeError> {
                Leaf::decode_node(items, node, ctx).map_err(|e| DecodeError::new(path.as_str(), e))
            }

            fn flatten_option<'a>(
                slot: &'a mut Option<Self>,
                meta: &'static FieldMeta,
                path: FieldPath,
                ctx: &BindContext,
                out: &mut Vec<Field<'a>>,
            ) {
                out.push(Field::new(path, meta, ctx, slot));
            }

            fn decode_option(
                slot: &mut Option<Self>,
                node: &Value,
                path: &FieldPath,
                ctx: &BindContext,
            ) -> Result<(), DecodeError> {
                Leaf::decode_node(slot, node, ctx).map_err(|e| DecodeError::new(path.as_str(), e))
            }
        }
    )*};
}

scalar_field!(
    String,
    PathBuf,
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Duration,
    DateTime<Utc>,
    Value,
);
