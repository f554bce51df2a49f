//! Layered configuration loading.
//!
//! Configuration is resolved from an embedded tree, local directories,
//! profile overlays, an in-memory string or reader, and the environment, then
//! bound into a struct that derives [`Config`].
//!
//! ```no_run
//! use confucius::Config;
//!
//! #[derive(Config, Default)]
//! struct Pod {
//!     #[conf(required)]
//!     kind: String,
//!     metadata: Metadata,
//! }
//!
//! #[derive(Config, Default)]
//! struct Metadata {
//!     #[conf(name = "name", default = "web")]
//!     pod_name: String,
//! }
//!
//! let mut pod = Pod::default();
//! confucius::load(&mut pod)?;
//! # Ok::<(), confucius::Error>(())
//! ```

extern crate self as confucius;

pub mod bind;
pub mod cli;
pub mod env;
pub mod error;
pub mod interpolate;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod process;
pub mod sources;

pub use bind::{Config, TimeLayout};
pub use confucius_derive::Config;
pub use env::{Environment, ProcessEnv};
pub use error::{Error, FieldError, FieldErrors, Result};
pub use loader::{Loader, load};
pub use logging::{LogLevel, Logger};
pub use sources::{EmbeddedTree, Format, StaticTree};

/// A decoded configuration tree: string keys to dynamically typed values.
pub type Tree = serde_json::Map<String, serde_json::Value>;
