//! Deep merge of decoded configuration trees.
//!
//! Later sources override earlier ones field by field. Arrays are replaced
//! entirely, not concatenated. A key whose existing and incoming values have
//! incompatible shapes (mapping, sequence, scalar) aborts the merge.

use crate::Tree;
use crate::error::{Error, Result};
use serde_json::Value;

/// Name of a value's type, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[derive(PartialEq, Eq)]
enum Shape {
    Mapping,
    Sequence,
    Scalar,
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Object(_) => Shape::Mapping,
        Value::Array(_) => Shape::Sequence,
        _ => Shape::Scalar,
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays and scalars are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
/// - A null base takes the overlay whatever its shape
///
/// # Example
/// ```
/// use serde_json::json;
/// use confucius::merge::deep_merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let result = deep_merge(base, overlay).unwrap();
/// assert_eq!(result, json!({
///     "server": { "port": 9000, "host": "localhost" },
///     "features": ["c"]
/// }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Result<Value> {
    merge_at(base, overlay, "")
}

fn merge_at(base: Value, overlay: Value, path: &str) -> Result<Value> {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            merge_maps(&mut base_map, overlay_map, path)?;
            Ok(Value::Object(base_map))
        }
        (base, Value::Null) => Ok(base),
        (Value::Null, overlay) => Ok(overlay),
        (base, overlay) => {
            if shape_of(&base) != shape_of(&overlay) {
                return Err(Error::MergeConflict {
                    path: path.to_string(),
                    existing: kind_of(&base),
                    incoming: kind_of(&overlay),
                });
            }
            Ok(overlay)
        }
    }
}

fn merge_maps(base: &mut Tree, overlay: Tree, path: &str) -> Result<()> {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => merge_at(base_value, overlay_value, &child_path(path, &key))?,
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    Ok(())
}

/// Fold `incoming` into the accumulator `acc`.
pub fn merge_into(acc: &mut Tree, incoming: Tree) -> Result<()> {
    merge_maps(acc, incoming, "")
}

/// Merge multiple trees in order, with later trees taking precedence.
pub fn deep_merge_all(trees: impl IntoIterator<Item = Tree>) -> Result<Tree> {
    let mut acc = Tree::new();
    for tree in trees {
        merge_into(&mut acc, tree)?;
    }
    Ok(acc)
}
