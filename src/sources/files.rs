//! Source location across embedded trees and local directories.
//!
//! Every logical file (the main file plus one per profile) is resolved at
//! most once: the embedded tree is walked first, then each local directory
//! in order, and the first match for a logical name wins.

use super::decode::Format;
use super::embed::{self, EmbeddedTree};
use crate::error::{Error, Result};
use crate::logging::Logger;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Default profile layout: `config.yaml` + profile `test` gives `config.test.yaml`.
pub const DEFAULT_PROFILE_LAYOUT: &str = "config.test.yaml";

const STEM_TOKEN: &str = "config";
const PROFILE_TOKEN: &str = "test";
const EXTENSION_TOKEN: &str = "yaml";

/// Where a source came from. Ordering is merge precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    /// Embedded read-only tree
    Embedded,
    /// Local directory
    Local,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Embedded => write!(f, "embedded"),
            Origin::Local => write!(f, "local"),
        }
    }
}

/// What a source is for. `Main` sorts before every profile, profiles by index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Main,
    Profile { index: usize, name: String },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Main => write!(f, "main"),
            Role::Profile { index, name } => write!(f, "profile[{}]:{}", index, name),
        }
    }
}

/// A located configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub origin: Origin,
    pub role: Role,
    /// The filename this source satisfies.
    pub logical_path: String,
    /// Where it was actually found (file path or embedded path).
    pub location: String,
}

impl SourceDescriptor {
    /// Decoder to use, chosen by the location's extension.
    pub fn format(&self) -> Result<Format> {
        Format::from_path(&self.location)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.origin, self.role, self.location)
    }
}

/// Filename template for profile files.
///
/// The tokens `config`, `test` and `yaml` stand for the main file's stem,
/// the profile name and the main file's extension. Substitution is a single
/// left-to-right pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout(String);

impl ProfileLayout {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The profile filename for `profile` given the main filename.
    pub fn file_name(&self, main: &str, profile: &str) -> String {
        let (stem, ext) = main.rsplit_once('.').unwrap_or((main, ""));

        let mut out = String::with_capacity(self.0.len() + profile.len());
        let mut rest = self.0.as_str();
        while !rest.is_empty() {
            if let Some(r) = rest.strip_prefix(STEM_TOKEN) {
                out.push_str(stem);
                rest = r;
            } else if let Some(r) = rest.strip_prefix(PROFILE_TOKEN) {
                out.push_str(profile);
                rest = r;
            } else if let Some(r) = rest.strip_prefix(EXTENSION_TOKEN) {
                out.push_str(ext);
                rest = r;
            } else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    out.push(c);
                }
                rest = chars.as_str();
            }
        }
        out
    }
}

impl Default for ProfileLayout {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_LAYOUT)
    }
}

/// Result of a locate pass.
#[derive(Debug, Clone, Default)]
pub struct Located {
    /// Found sources in merge order.
    pub sources: Vec<SourceDescriptor>,
    /// Logical filenames found nowhere, in expected order.
    pub missing: Vec<String>,
}

impl Located {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// `self`, or `FilesNotFound` if any logical file is missing.
    pub fn require_all(self) -> Result<Self> {
        if self.missing.is_empty() {
            Ok(self)
        } else {
            Err(Error::FilesNotFound(self.missing))
        }
    }
}

/// Finds the main file and profile files.
pub struct Locator<'l> {
    filename: &'l str,
    dirs: &'l [PathBuf],
    profiles: &'l [String],
    layout: &'l ProfileLayout,
    embedded: Option<&'l dyn EmbeddedTree>,
    logger: Option<&'l Logger>,
}

impl<'l> Locator<'l> {
    pub fn new(
        filename: &'l str,
        dirs: &'l [PathBuf],
        profiles: &'l [String],
        layout: &'l ProfileLayout,
    ) -> Self {
        Self {
            filename,
            dirs,
            profiles,
            layout,
            embedded: None,
            logger: None,
        }
    }

    pub fn with_embedded(mut self, tree: &'l dyn EmbeddedTree) -> Self {
        self.embedded = Some(tree);
        self
    }

    pub fn with_logger(mut self, logger: &'l Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn debug(&self, msg: &str) {
        if let Some(logger) = self.logger {
            logger.debug(msg);
        }
    }

    /// Logical filenames with their roles: main first, then profiles in order.
    pub fn expected_files(&self) -> Vec<(String, Role)> {
        let mut expected = vec![(self.filename.to_string(), Role::Main)];
        for (index, profile) in self.profiles.iter().enumerate() {
            expected.push((
                self.layout.file_name(self.filename, profile),
                Role::Profile {
                    index,
                    name: profile.clone(),
                },
            ));
        }
        expected
    }

    /// The role a file with this name would play, if any.
    pub fn classify(&self, name: &str) -> Option<Role> {
        self.expected_files()
            .into_iter()
            .find(|(expected, _)| expected == name)
            .map(|(_, role)| role)
    }

    /// Run both walks and report found and missing logical files.
    pub fn locate(&self) -> Result<Located> {
        let expected = self.expected_files();
        let mut found: HashSet<String> = HashSet::new();
        let mut sources = Vec::new();

        if let Some(tree) = self.embedded {
            self.walk_embedded_dir(tree, "", &mut found, &mut sources)?;
        }
        self.find_local(&expected, &mut found, &mut sources);

        sources.sort_by(|a, b| (a.origin, &a.role).cmp(&(b.origin, &b.role)));

        let mut missing: Vec<String> = Vec::new();
        for (name, _) in &expected {
            if !found.contains(name) && !missing.contains(name) {
                missing.push(name.clone());
            }
        }

        for source in &sources {
            self.debug(&format!("located {}", source));
        }

        Ok(Located { sources, missing })
    }

    /// Depth-first walk of the embedded tree, directories before files.
    fn walk_embedded_dir(
        &self,
        tree: &dyn EmbeddedTree,
        path: &str,
        found: &mut HashSet<String>,
        acc: &mut Vec<SourceDescriptor>,
    ) -> Result<()> {
        let mut entries = tree.read_dir(path).map_err(|source| Error::Embedded {
            path: if path.is_empty() { ".".to_string() } else { path.to_string() },
            source,
        })?;
        entries.sort_by_key(|entry| !entry.is_dir);

        for entry in entries {
            let full_path = embed::join(path, &entry.name);
            if entry.is_dir {
                self.walk_embedded_dir(tree, &full_path, found, acc)?;
                continue;
            }

            match self.classify(&entry.name) {
                Some(role) if !found.contains(&entry.name) => {
                    found.insert(entry.name.clone());
                    acc.push(SourceDescriptor {
                        origin: Origin::Embedded,
                        role,
                        logical_path: entry.name,
                        location: full_path,
                    });
                }
                _ => self.debug(&format!("skipping embedded file {}", full_path)),
            }
        }
        Ok(())
    }

    /// Check each directory in order for the main file then each profile file.
    fn find_local(
        &self,
        expected: &[(String, Role)],
        found: &mut HashSet<String>,
        acc: &mut Vec<SourceDescriptor>,
    ) {
        for dir in self.dirs {
            for (name, role) in expected {
                if found.contains(name) {
                    continue;
                }
                let path = dir.join(name);
                if path.is_file() {
                    found.insert(name.clone());
                    acc.push(SourceDescriptor {
                        origin: Origin::Local,
                        role: role.clone(),
                        logical_path: name.clone(),
                        location: path.display().to_string(),
                    });
                }
            }
        }
    }
}
