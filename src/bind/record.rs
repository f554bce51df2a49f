//! Building blocks for `#[derive(Config)]`.
//!
//! The derive expands each struct into calls to these functions, one per
//! field. They are public so generated code can reach them, and are usable
//! for hand-written [`Config`] impls.

use super::{Bind, BindContext, Config, Field, FieldMeta, FieldPath};
use crate::error::{ConvertError, DecodeError};
use crate::merge::kind_of;
use serde_json::{Map, Value};

/// Path of a field inside a record at `parent`.
pub fn field_path(meta: &FieldMeta, parent: &FieldPath, ctx: &BindContext) -> FieldPath {
    if meta.adds_segment(&ctx.tag) {
        parent.child(meta.key(&ctx.tag))
    } else {
        parent.clone()
    }
}

/// Look up a key, exact match first, then ASCII case-insensitive.
pub fn lookup<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Bind one field of a record whose path is `parent`.
pub fn bind_field<'a, F>(
    field: &'a mut F,
    meta: &'static FieldMeta,
    parent: &FieldPath,
    ctx: &BindContext,
    out: &mut Vec<Field<'a>>,
) where
    F: Bind,
{
    field.flatten(meta, field_path(meta, parent, ctx), ctx, out);
}

/// Decode one field of a record from the record's mapping `node`.
///
/// A flattened field without an alternate name reads the record's own
/// mapping. Absent keys leave the field untouched.
pub fn decode_field<F>(
    field: &mut F,
    meta: &'static FieldMeta,
    node: &Value,
    parent: &FieldPath,
    ctx: &BindContext,
) -> Result<(), DecodeError>
where
    F: Bind,
{
    let path = field_path(meta, parent, ctx);
    if !meta.adds_segment(&ctx.tag) {
        return field.decode(node, &path, ctx);
    }
    let Some(map) = node.as_object() else {
        return Ok(());
    };
    match lookup(map, meta.key(&ctx.tag)) {
        Some(child) => field.decode(child, &path, ctx),
        None => Ok(()),
    }
}

/// Bind a nested record: its leaves are prefixed with `path`.
pub fn flatten_record<'a, C: Config>(
    record: &'a mut C,
    path: FieldPath,
    ctx: &BindContext,
    out: &mut Vec<Field<'a>>,
) {
    record.bind_fields(&path, ctx, out);
}

/// Decode a nested record. `null` leaves it untouched.
pub fn decode_record<C: Config>(
    record: &mut C,
    node: &Value,
    path: &FieldPath,
    ctx: &BindContext,
) -> Result<(), DecodeError> {
    match node {
        Value::Null => Ok(()),
        Value::Object(_) => record.decode_fields(node, path, ctx),
        other => Err(DecodeError::new(
            path.as_str(),
            ConvertError::Mismatch {
                expected: "mapping",
                found: kind_of(other),
            },
        )),
    }
}

/// Bind each existing element of a record sequence as `path[i]`.
///
/// The sequence is never grown here.
pub fn flatten_records<'a, C: Config>(
    items: &'a mut Vec<C>,
    path: FieldPath,
    ctx: &BindContext,
    out: &mut Vec<Field<'a>>,
) {
    for (i, item) in items.iter_mut().enumerate() {
        item.bind_fields(&path.index(i), ctx, out);
    }
}

/// Decode a record sequence. The result has one element per node; existing
/// elements are decoded in place. A single mapping becomes a one-element
/// sequence.
pub fn decode_records<C: Config + Default>(
    items: &mut Vec<C>,
    node: &Value,
    path: &FieldPath,
    ctx: &BindContext,
) -> Result<(), DecodeError> {
    let nodes = match node {
        Value::Null => return Ok(()),
        Value::Array(nodes) => nodes.as_slice(),
        Value::Object(_) => std::slice::from_ref(node),
        other => {
            return Err(DecodeError::new(
                path.as_str(),
                ConvertError::Mismatch {
                    expected: "sequence",
                    found: kind_of(other),
                },
            ));
        }
    };

    items.resize_with(nodes.len(), C::default);
    for (i, (item, child)) in items.iter_mut().zip(nodes).enumerate() {
        decode_record(item, child, &path.index(i), ctx)?;
    }
    Ok(())
}

/// Bind an optional record, allocating it if absent.
pub fn flatten_optional_record<'a, C: Config + Default>(
    slot: &'a mut Option<C>,
    path: FieldPath,
    ctx: &BindContext,
    out: &mut Vec<Field<'a>>,
) {
    slot.get_or_insert_with(C::default).bind_fields(&path, ctx, out);
}

/// Decode an optional record, allocating it when the node is present.
pub fn decode_optional_record<C: Config + Default>(
    slot: &mut Option<C>,
    node: &Value,
    path: &FieldPath,
    ctx: &BindContext,
) -> Result<(), DecodeError> {
    if node.is_null() {
        return Ok(());
    }
    decode_record(slot.get_or_insert_with(C::default), node, path, ctx)
}
