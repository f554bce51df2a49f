//! `#[derive(Config)]` for confucius destination structs.
//!
//! Field attributes:
//!
//! - `#[conf(name = "host")]`: alternate name under the default `conf` tag
//! - `#[conf(tag(custom = "host"))]`: alternate name under another tag key
//! - `#[conf(required)]`
//! - `#[conf(default = "8080")]`
//! - `#[conf(flatten)]`: embedded sub-record, no path segment of its own

use proc_macro::TokenStream;
use syn::{DeriveInput, Error, parse_macro_input};

mod attr;
mod expand;

#[proc_macro_derive(Config, attributes(conf))]
pub fn derive_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand::derive_config(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
