//! Struct field binding.
//!
//! A destination type implements [`Config`] (normally through
//! `#[derive(Config)]`). Binding walks it in declaration order and yields one
//! [`Field`] per leaf: a resolved path, the tag metadata, and a settable
//! reference into the destination. Decoding walks the same structure against
//! the merged tree.
//!
//! Paths join record segments with `.` and sequence positions with `[i]`:
//! `spec.containers[0].image`. Flattened sub-records add no segment unless
//! they carry an alternate name for the active tag.

pub mod record;
mod value;

pub use value::{FieldKind, Leaf, Scalar, parse_bool};

use crate::error::{ConvertError, DecodeError};
use crate::Tree;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
pub use serde_json::Value;
use std::fmt;

/// Tag key used for alternate names when none is configured.
pub const DEFAULT_TAG: &str = "conf";

/// Static description of one struct field, generated by `#[derive(Config)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Declared field name.
    pub ident: &'static str,
    /// Alternate names as `(tag key, name)` pairs.
    pub names: &'static [(&'static str, &'static str)],
    pub required: bool,
    pub default: Option<&'static str>,
    /// Anonymous/embedded sub-record.
    pub flatten: bool,
}

impl FieldMeta {
    /// The alternate name for `tag`, if the field declares one.
    pub fn alternate_name(&self, tag: &str) -> Option<&'static str> {
        self.names
            .iter()
            .find(|(key, _)| *key == tag)
            .map(|(_, name)| *name)
    }

    /// The key this field is known by under `tag`.
    pub fn key(&self, tag: &str) -> &'static str {
        self.alternate_name(tag).unwrap_or(self.ident)
    }

    /// Whether this field adds a segment to its descendants' paths.
    pub fn adds_segment(&self, tag: &str) -> bool {
        !self.flatten || self.alternate_name(tag).is_some()
    }
}

/// Canonical dotted/indexed field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// `a` + `b` gives `a.b`.
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{}", self.0, segment))
        }
    }

    /// `a` + 0 gives `a[0]`.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layout used to parse timestamps from text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeLayout {
    #[default]
    Rfc3339,
    /// A chrono `strftime` format such as `%m-%d-%Y`.
    Format(String),
}

impl TimeLayout {
    pub fn custom(format: impl Into<String>) -> Self {
        TimeLayout::Format(format.into())
    }

    /// Parse `raw` into a UTC timestamp.
    ///
    /// Custom formats are tried with an offset, then as a naive UTC datetime,
    /// then as a date at midnight UTC.
    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>, ConvertError> {
        let time_err = |source| ConvertError::Time {
            value: raw.to_string(),
            source,
        };
        match self {
            TimeLayout::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(time_err),
            TimeLayout::Format(format) => {
                if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                    return Ok(dt.with_timezone(&Utc));
                }
                if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                    return Ok(Utc.from_utc_datetime(&naive));
                }
                NaiveDate::parse_from_str(raw, format)
                    .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
                    .map_err(time_err)
            }
        }
    }
}

/// Settings shared by binding, decoding and conversion.
#[derive(Debug, Clone)]
pub struct BindContext {
    /// Tag key selecting alternate names.
    pub tag: String,
    pub time_layout: TimeLayout,
}

impl BindContext {
    pub fn new(tag: impl Into<String>, time_layout: TimeLayout) -> Self {
        Self {
            tag: tag.into(),
            time_layout,
        }
    }
}

impl Default for BindContext {
    fn default() -> Self {
        Self::new(DEFAULT_TAG, TimeLayout::default())
    }
}

/// A leaf field of a bound destination.
pub struct Field<'a> {
    pub path: String,
    /// Key under the active tag (alternate name or declared name).
    pub key: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
    pub value: &'a mut dyn Leaf,
}

impl<'a> Field<'a> {
    pub fn new(
        path: FieldPath,
        meta: &'static FieldMeta,
        ctx: &BindContext,
        value: &'a mut dyn Leaf,
    ) -> Self {
        Self {
            path: path.into_string(),
            key: meta.key(&ctx.tag),
            required: meta.required,
            default: meta.default,
            value,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("kind", &self.kind())
            .field("required", &self.required)
            .field("default", &self.default)
            .finish()
    }
}

/// Anything that can sit in a destination field.
pub trait Bind {
    /// Push this field's leaves onto `out`. `path` is the field's own path.
    fn flatten<'a>(
        &'a mut self,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    );

    /// Decode `node` into this field. `null` leaves it untouched.
    fn decode(&mut self, node: &Value, path: &FieldPath, ctx: &BindContext)
    -> Result<(), DecodeError>;
}

/// Types that may appear inside `Vec<T>` and `Option<T>` fields.
///
/// Scalars make the whole collection a single leaf. Records are walked per
/// element, or allocated in place for `Option`.
pub trait Element: Sized {
    fn flatten_vec<'a>(
        items: &'a mut Vec<Self>,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    );

    fn decode_vec(
        items: &mut Vec<Self>,
        node: &Value,
        path: &FieldPath,
        ctx: &BindContext,
    ) -> Result<(), DecodeError>;

    fn flatten_option<'a>(
        slot: &'a mut Option<Self>,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    );

    fn decode_option(
        slot: &mut Option<Self>,
        node: &Value,
        path: &FieldPath,
        ctx: &BindContext,
    ) -> Result<(), DecodeError>;
}

/// A configuration record. Implemented by `#[derive(Config)]`.
pub trait Config {
    /// Field descriptions in declaration order.
    const FIELDS: &'static [FieldMeta];

    /// Push every leaf under `path` onto `out`, in declaration order.
    fn bind_fields<'a>(&'a mut self, path: &FieldPath, ctx: &BindContext, out: &mut Vec<Field<'a>>);

    /// Decode a mapping node field by field.
    fn decode_fields(
        &mut self,
        node: &Value,
        path: &FieldPath,
        ctx: &BindContext,
    ) -> Result<(), DecodeError>;

    /// All leaf fields of this record.
    fn fields<'a>(&'a mut self, ctx: &BindContext) -> Vec<Field<'a>> {
        let mut out = Vec::new();
        self.bind_fields(&FieldPath::root(), ctx, &mut out);
        out
    }

    /// Decode a merged tree into this record.
    fn decode_tree(&mut self, tree: Tree, ctx: &BindContext) -> Result<(), DecodeError> {
        self.decode_fields(&Value::Object(tree), &FieldPath::root(), ctx)
    }
}

impl<T: Element> Bind for Vec<T> {
    fn flatten<'a>(
        &'a mut self,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    ) {
        T::flatten_vec(self, meta, path, ctx, out);
    }

    fn decode(&mut self, node: &Value, path: &FieldPath, ctx: &BindContext) -> Result<(), DecodeError> {
        T::decode_vec(self, node, path, ctx)
    }
}

impl<T: Element> Bind for Option<T> {
    fn flatten<'a>(
        &'a mut self,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    ) {
        T::flatten_option(self, meta, path, ctx, out);
    }

    fn decode(&mut self, node: &Value, path: &FieldPath, ctx: &BindContext) -> Result<(), DecodeError> {
        T::decode_option(self, node, path, ctx)
    }
}

impl<T: Bind> Bind for Box<T> {
    fn flatten<'a>(
        &'a mut self,
        meta: &'static FieldMeta,
        path: FieldPath,
        ctx: &BindContext,
        out: &mut Vec<Field<'a>>,
    ) {
        (**self).flatten(meta, path, ctx, out);
    }

    fn decode(&mut self, node: &Value, path: &FieldPath, ctx: &BindContext) -> Result<(), DecodeError> {
        (**self).decode(node, path, ctx)
    }
}
