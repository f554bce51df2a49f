//! Configuration sources: where they are, what format they use, how to read them.

mod decode;
mod embed;
mod files;

pub use decode::{Format, decode};
pub use embed::{EmbeddedEntry, EmbeddedTree, StaticTree};
pub use files::{
    DEFAULT_PROFILE_LAYOUT, Located, Locator, Origin, ProfileLayout, Role, SourceDescriptor,
};

use crate::Tree;
use crate::error::{Error, Result};

/// Read and decode a located source.
///
/// Embedded sources are read from `embedded`; reading one without a tree
/// configured is an embedded read error like any other.
pub fn read_source(source: &SourceDescriptor, embedded: Option<&dyn EmbeddedTree>) -> Result<Tree> {
    let format = source.format()?;
    match source.origin {
        Origin::Local => {
            let bytes = std::fs::read(&source.location).map_err(|e| Error::Io {
                path: source.location.clone(),
                source: e,
            })?;
            decode(&bytes, format, &source.location)
        }
        Origin::Embedded => {
            let embed_err = |e| Error::Embedded {
                path: source.location.clone(),
                source: e,
            };
            let tree = embedded.ok_or_else(|| {
                embed_err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no embedded tree configured",
                ))
            })?;
            let bytes = tree.read(&source.location).map_err(embed_err)?;
            decode(&bytes, format, &source.location)
        }
    }
}
