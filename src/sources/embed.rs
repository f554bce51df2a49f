//! Read-only embedded asset trees.
//!
//! Embedded configuration is compiled into the binary (for example with
//! `include_str!`) and exposed through [`EmbeddedTree`]. Paths are
//! `/`-separated and relative to the tree root; the root itself is `""`
//! or `"."`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

/// One entry of an embedded directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedEntry {
    pub name: String,
    pub is_dir: bool,
}

impl EmbeddedEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// A read-only tree of embedded files.
pub trait EmbeddedTree: Send + Sync {
    /// List the entries directly under `path`, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<EmbeddedEntry>>;

    /// Read the full contents of the file at `path`.
    fn read(&self, path: &str) -> io::Result<Cow<'_, [u8]>>;
}

/// Normalize an embedded path: strip `./` and leading/trailing slashes.
pub(crate) fn normalize(path: &str) -> &str {
    let mut path = path.trim_matches('/');
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.trim_start_matches('/');
    }
    if path == "." { "" } else { path }
}

/// Join a directory and an entry name into an embedded path.
pub(crate) fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// An [`EmbeddedTree`] backed by static `(path, contents)` pairs.
///
/// ```
/// use confucius::sources::{EmbeddedTree, StaticTree};
///
/// let tree = StaticTree::new()
///     .with_file("config/config.yaml", "host: 0.0.0.0\n")
///     .with_file("config/profiles/config.test.yaml", "host: 127.0.0.1\n");
///
/// let entries = tree.read_dir("config").unwrap();
/// assert_eq!(entries.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTree {
    files: BTreeMap<String, &'static [u8]>,
}

impl StaticTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Later additions at the same path replace earlier ones.
    pub fn with_file<C>(mut self, path: &str, contents: &'static C) -> Self
    where
        C: AsRef<[u8]> + ?Sized,
    {
        self.files.insert(normalize(path).to_string(), contents.as_ref());
        self
    }

    /// Build a tree from `(path, contents)` pairs.
    pub fn from_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        files
            .into_iter()
            .fold(Self::new(), |tree, (path, contents)| tree.with_file(path, contents))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EmbeddedTree for StaticTree {
    fn read_dir(&self, path: &str) -> io::Result<Vec<EmbeddedEntry>> {
        let dir = normalize(path);
        if self.files.contains_key(dir) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a file, not a directory", dir),
            ));
        }

        let mut children: BTreeMap<&str, bool> = BTreeMap::new();
        for file in self.files.keys() {
            let rel = if dir.is_empty() {
                file.as_str()
            } else {
                match file.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) {
                    Some(rel) => rel,
                    None => continue,
                }
            };
            match rel.split_once('/') {
                Some((name, _)) => {
                    children.insert(name, true);
                }
                None => {
                    children.entry(rel).or_insert(false);
                }
            }
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("embedded directory {} does not exist", dir),
            ));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| EmbeddedEntry {
                name: name.to_string(),
                is_dir,
            })
            .collect())
    }

    fn read(&self, path: &str) -> io::Result<Cow<'_, [u8]>> {
        self.files
            .get(normalize(path))
            .map(|bytes| Cow::Borrowed(*bytes))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("embedded file {} does not exist", path),
                )
            })
    }
}
