//! Decoder dispatch: bytes plus a format hint in, generic tree out.

use crate::error::{Error, Result};
use crate::Tree;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::Path;

/// Supported configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            _ => Err(Error::UnsupportedExtension(ext.to_string())),
        }
    }

    /// Pick the format from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
            Format::Toml => write!(f, "toml"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim_start_matches('.'))
    }
}

/// Decode `bytes` as `format` into a fresh tree.
///
/// `origin` names the source in error messages. An empty document is an
/// empty tree; a document whose top level is not a mapping is an error.
pub fn decode(bytes: &[u8], format: Format, origin: &str) -> Result<Tree> {
    let parse_err = |message: String| Error::Parse {
        origin: origin.to_string(),
        format,
        message,
    };

    let value = match format {
        Format::Yaml => {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Map::new());
            }
            serde_yaml::from_slice::<Value>(bytes).map_err(|e| parse_err(e.to_string()))?
        }
        Format::Json => serde_json::from_slice::<Value>(bytes).map_err(|e| parse_err(e.to_string()))?,
        Format::Toml => {
            let text = std::str::from_utf8(bytes).map_err(|e| parse_err(e.to_string()))?;
            let table: toml::Table = toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(parse_err(format!(
            "expected a mapping at the top level, found {}",
            crate::merge::kind_of(&other)
        ))),
    }
}

/// Convert a TOML value into the generic tree. Datetimes become RFC 3339 strings.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(Number::from(i)),
        toml::Value::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension("yaml").unwrap(), Format::Yaml);
        assert_eq!(Format::from_extension("YML").unwrap(), Format::Yaml);
        assert_eq!(Format::from_extension("json").unwrap(), Format::Json);
        assert_eq!(Format::from_extension("toml").unwrap(), Format::Toml);

        let err = Format::from_extension("hcl").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a/b/pod.toml").unwrap(), Format::Toml);
        assert!(Format::from_path("no-extension").is_err());
    }

    #[test]
    fn test_decode_yaml() {
        let tree = decode(b"host: 0.0.0.0\nports: [80, 443]\n", Format::Yaml, "server.yaml").unwrap();
        assert_eq!(Value::Object(tree), json!({"host": "0.0.0.0", "ports": [80, 443]}));
    }

    #[test]
    fn test_decode_empty_documents() {
        assert!(decode(b"", Format::Yaml, "empty.yaml").unwrap().is_empty());
        assert!(decode(b"  \n", Format::Yaml, "empty.yaml").unwrap().is_empty());
        assert!(decode(b"{}", Format::Json, "empty.json").unwrap().is_empty());
        assert!(decode(b"", Format::Toml, "empty.toml").unwrap().is_empty());
    }

    #[test]
    fn test_decode_toml_datetime_as_string() {
        let tree = decode(
            b"[application]\nbuild_date = 2020-01-01T12:00:00Z\nversion = 3\n",
            Format::Toml,
            "app.toml",
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree),
            json!({"application": {"build_date": "2020-01-01T12:00:00Z", "version": 3}})
        );
    }

    #[test]
    fn test_decode_bad_syntax() {
        for (bytes, format) in [
            (&b"host: [unclosed"[..], Format::Yaml),
            (&b"{\"host\": "[..], Format::Json),
            (&b"host = = 1"[..], Format::Toml),
        ] {
            let err = decode(bytes, format, "bad").unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "{format}: {err}");
        }
    }

    #[test]
    fn test_decode_yaml_as_json_fails() {
        assert!(decode(b"host: \"127.0.0.1\"", Format::Json, "<string>").is_err());
    }

    #[test]
    fn test_decode_rejects_non_mapping() {
        let err = decode(b"- a\n- b\n", Format::Yaml, "list.yaml").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }
}
