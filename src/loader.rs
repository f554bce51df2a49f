//! The option surface and `load` orchestration.
//!
//! Control flow: locate sources, decode and interpolate each, merge them over
//! the reader seed, decode the merged tree into the destination, then run the
//! field processor over every leaf.

use crate::Tree;
use crate::bind::{BindContext, Config, DEFAULT_TAG, TimeLayout};
use crate::env::{Environment, ProcessEnv};
use crate::error::{Error, Result};
use crate::interpolate::interpolate_tree;
use crate::logging::Logger;
use crate::merge::deep_merge_all;
use crate::process::Processor;
use crate::sources::{
    EmbeddedTree, Format, Located, Locator, ProfileLayout, SourceDescriptor, decode, read_source,
};
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Main configuration filename when none is given.
pub const DEFAULT_FILENAME: &str = "config.yaml";

/// Directory searched when none is given.
pub const DEFAULT_DIR: &str = ".";

/// In-memory configuration merged under every file source.
enum Seed {
    Reader(Box<dyn Read + Send>, Format),
    Text(String, Format),
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Reader(_, format) => write!(f, "Reader({})", format),
            Seed::Text(text, format) => write!(f, "Text({:?}, {})", text, format),
        }
    }
}

/// Configures and runs a load.
///
/// ```no_run
/// use confucius::{Config, Loader};
///
/// #[derive(Config, Default)]
/// struct Server {
///     #[conf(required)]
///     host: String,
///     #[conf(default = "8080")]
///     port: u16,
/// }
///
/// let mut cfg = Server::default();
/// Loader::new()
///     .file("server.yaml")
///     .dirs(["/etc/myapp", "."])
///     .profiles(["prod"])
///     .use_env("myapp")
///     .load(&mut cfg)?;
/// # Ok::<(), confucius::Error>(())
/// ```
pub struct Loader {
    filename: String,
    dirs: Vec<PathBuf>,
    tag: String,
    time_layout: TimeLayout,
    env_prefix: Option<String>,
    profiles: Vec<String>,
    profile_layout: ProfileLayout,
    seed: Option<Seed>,
    embedded: Option<Arc<dyn EmbeddedTree>>,
    environment: Arc<dyn Environment>,
    logger: Logger,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("filename", &self.filename)
            .field("dirs", &self.dirs)
            .field("tag", &self.tag)
            .field("time_layout", &self.time_layout)
            .field("env_prefix", &self.env_prefix)
            .field("profiles", &self.profiles)
            .field("profile_layout", &self.profile_layout)
            .field("seed", &self.seed)
            .field("embedded", &self.embedded.is_some())
            .field("logger", &self.logger)
            .finish()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            dirs: vec![PathBuf::from(DEFAULT_DIR)],
            tag: DEFAULT_TAG.to_string(),
            time_layout: TimeLayout::default(),
            env_prefix: None,
            profiles: Vec::new(),
            profile_layout: ProfileLayout::default(),
            seed: None,
            embedded: None,
            environment: Arc::new(ProcessEnv),
            logger: Logger::default(),
        }
    }

    /// Main configuration filename. Its extension selects the decoder.
    pub fn file(mut self, name: impl Into<String>) -> Self {
        self.filename = name.into();
        self
    }

    /// Directories to search, in priority order.
    pub fn dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Tag key selecting alternate field names (`#[conf(tag(key = "..."))]`).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Layout for timestamps in files, defaults and the environment.
    pub fn time_layout(mut self, layout: TimeLayout) -> Self {
        self.time_layout = layout;
        self
    }

    /// Enable field overriding from the environment. An empty prefix means
    /// keys are the bare upper-cased field paths.
    pub fn use_env(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Profiles layered over the main file, lowest precedence first.
    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Template for profile filenames, e.g. `config-test.yaml`.
    pub fn profile_layout(mut self, layout: impl Into<String>) -> Self {
        self.profile_layout = ProfileLayout::new(layout);
        self
    }

    /// Seed the merge with configuration read from `reader`.
    pub fn reader(mut self, reader: impl Read + Send + 'static, format: Format) -> Self {
        self.seed = Some(Seed::Reader(Box::new(reader), format));
        self
    }

    /// Seed the merge with configuration text. Surrounding whitespace is trimmed.
    pub fn string(mut self, text: impl AsRef<str>, format: Format) -> Self {
        self.seed = Some(Seed::Text(text.as_ref().trim().to_string(), format));
        self
    }

    /// Search an embedded tree before the local directories.
    pub fn embedded(mut self, tree: impl EmbeddedTree + 'static) -> Self {
        self.embedded = Some(Arc::new(tree));
        self
    }

    /// Environment used for interpolation and overriding.
    pub fn environment(mut self, env: impl Environment + 'static) -> Self {
        self.environment = Arc::new(env);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    fn bind_context(&self) -> BindContext {
        BindContext::new(self.tag.clone(), self.time_layout.clone())
    }

    /// Whether missing files are tolerated.
    fn has_fallback(&self) -> bool {
        self.seed.is_some() || self.env_prefix.is_some()
    }

    /// Run the source locator with the missing-file policy applied.
    ///
    /// Fails with [`Error::FilesNotFound`] when a logical file is missing and
    /// neither a seed nor environment overriding is configured.
    pub fn locate(&self) -> Result<Located> {
        let mut locator = Locator::new(
            &self.filename,
            &self.dirs,
            &self.profiles,
            &self.profile_layout,
        )
        .with_logger(&self.logger);
        if let Some(tree) = self.embedded.as_deref() {
            locator = locator.with_embedded(tree);
        }

        let located = locator.locate()?;
        if located.is_complete() || !self.has_fallback() {
            return located.require_all();
        }
        self.logger.warning(&format!(
            "\"{}\" file(s) not found, continuing",
            located.missing.join("\", \"")
        ));
        Ok(located)
    }

    /// Locate, decode, interpolate and merge every source into one tree.
    pub fn resolve(mut self) -> Result<Tree> {
        self.logger.info("confucius starting");
        self.resolve_tree()
    }

    /// Locates before taking the seed, which counts as a fallback.
    fn resolve_tree(&mut self) -> Result<Tree> {
        let located = self.locate()?;

        let mut trees = Vec::with_capacity(located.sources.len() + 1);
        if let Some(seed) = self.seed.take() {
            let mut tree = decode_seed(seed)?;
            interpolate_tree(&mut tree, self.environment.as_ref())?;
            trees.push(tree);
        }
        for source in &located.sources {
            trees.push(self.read_interpolated(source)?);
        }
        deep_merge_all(trees)
    }

    fn read_interpolated(&self, source: &SourceDescriptor) -> Result<Tree> {
        let mut tree = read_source(source, self.embedded.as_deref())?;
        interpolate_tree(&mut tree, self.environment.as_ref())?;
        self.logger.debug(&format!("merging {}", source));
        Ok(tree)
    }

    /// Load configuration into `cfg`.
    ///
    /// Values already in `cfg` survive unless a source, the environment or a
    /// default replaces them.
    pub fn load<T: Config>(mut self, cfg: &mut T) -> Result<()> {
        self.logger.info("confucius starting");
        let tree = self.resolve_tree()?;

        let ctx = self.bind_context();
        cfg.decode_tree(tree, &ctx)?;

        let mut processor =
            Processor::new(self.environment.as_ref(), &ctx).with_logger(&self.logger);
        if let Some(prefix) = self.env_prefix.as_deref() {
            processor = processor.with_env_prefix(prefix);
        }
        processor.process(cfg)?;
        Ok(())
    }
}

fn decode_seed(seed: Seed) -> Result<Tree> {
    match seed {
        Seed::Text(text, format) => decode(text.as_bytes(), format, "<string>"),
        Seed::Reader(mut reader, format) => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).map_err(|e| Error::Io {
                path: "<reader>".to_string(),
                source: e,
            })?;
            decode(&bytes, format, "<reader>")
        }
    }
}

/// Load `cfg` with every option at its default.
pub fn load<T: Config>(cfg: &mut T) -> Result<()> {
    Loader::new().load(cfg)
}
