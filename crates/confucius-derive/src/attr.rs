use syn::{Field, LitStr, Result};

/// Tag key that `name = "..."` applies to.
pub(crate) const DEFAULT_TAG: &str = "conf";

#[derive(Default)]
pub(crate) struct FieldAttrs {
    /// `(tag key, alternate name)` pairs, `name = ...` first.
    pub names: Vec<(String, String)>,
    pub required: bool,
    pub default: Option<String>,
    pub flatten: bool,
}

pub(crate) fn parse_field_attrs(field: &Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    let mut tagged = Vec::new();

    for attr in &field.attrs {
        if !attr.path().is_ident("conf") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.names.push((DEFAULT_TAG.to_string(), lit.value()));
            } else if meta.path.is_ident("tag") {
                meta.parse_nested_meta(|tag| {
                    let key = tag
                        .path
                        .get_ident()
                        .ok_or_else(|| tag.error("expected `tag(key = \"name\")`"))?
                        .to_string();
                    let lit: LitStr = tag.value()?.parse()?;
                    tagged.push((key, lit.value()));
                    Ok(())
                })?;
            } else if meta.path.is_ident("required") {
                attrs.required = true;
            } else if meta.path.is_ident("default") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.default = Some(lit.value());
            } else if meta.path.is_ident("flatten") {
                attrs.flatten = true;
            } else {
                return Err(meta.error(
                    "unsupported conf attribute, expected one of `name`, `tag`, `required`, `default`, `flatten`",
                ));
            }
            Ok(())
        })?;
    }

    attrs.names.extend(tagged);
    Ok(attrs)
}
