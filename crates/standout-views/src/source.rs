//! Template resource namespaces.
//!
//! Every view type owns a [`TemplateSource`]: the namespace its templates are
//! resolved from. Names are always relative to the source root, and a leading
//! `/` is ignored, so `"greeting.ftl"` and `"/greeting.ftl"` address the same
//! resource.
//!
//! Two sources are provided:
//!
//! | Source | Backing | Typical use |
//! |--------|---------|-------------|
//! | [`DirectorySource`] | Files under a root directory | Development, deployments with template files |
//! | [`EmbeddedSource`] | Bytes held in memory | Templates compiled into the binary, tests |
//!
//! Sources hand out raw bytes. Decoding is left to the caller because the
//! encoding of a template depends on detection and on the requested locale.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// A namespace that template resources can be read from.
pub trait TemplateSource: Send + Sync + fmt::Debug {
    /// Opens the named resource for reading.
    ///
    /// Missing resources must be reported with [`io::ErrorKind::NotFound`].
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Reads the whole named resource.
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let mut reader = self.open(name)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Returns true if the named resource exists.
    fn contains(&self, name: &str) -> bool {
        self.open(name).is_ok()
    }

    /// Checks that the namespace itself is usable.
    fn ensure_available(&self) -> io::Result<()> {
        Ok(())
    }

    /// Human-readable location of the namespace, used in error messages.
    fn location(&self) -> String;
}

fn relative_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

/// Templates stored as files under a root directory.
///
/// Names that would escape the root (parent components, drive prefixes) are
/// rejected with [`io::ErrorKind::PermissionDenied`].
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    ///
    /// The directory is not checked here; a missing root surfaces when the
    /// view type's configuration is built.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative_name(name));
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("template name escapes the template root: {}", name),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateSource for DirectorySource {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        let path = self.resolve(name)?;
        if path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(Box::new(File::open(path)?))
    }

    fn contains(&self, name: &str) -> bool {
        self.resolve(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn ensure_available(&self) -> io::Result<()> {
        let metadata = std::fs::metadata(&self.root)?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root.display()),
            ))
        }
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// Templates held in memory.
///
/// # Example
///
/// ```rust
/// use standout_views::{EmbeddedSource, TemplateSource};
///
/// let source = EmbeddedSource::new().with("greeting.ftl", "Hello, ${name}!");
/// assert!(source.contains("/greeting.ftl"));
/// assert!(!source.contains("farewell.ftl"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    label: Option<String>,
    files: HashMap<String, Vec<u8>>,
}

impl EmbeddedSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the source for error messages (defaults to `<embedded>`).
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Adds a resource, replacing any previous one with the same name.
    pub fn with(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    /// Adds a resource in place.
    pub fn insert(&mut self, name: &str, content: impl Into<Vec<u8>>) {
        self.files
            .insert(relative_name(name).to_string(), content.into());
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the source holds no resources.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<N, C> FromIterator<(N, C)> for EmbeddedSource
where
    N: AsRef<str>,
    C: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut source = Self::new();
        for (name, content) in iter {
            source.insert(name.as_ref(), content);
        }
        source
    }
}

impl TemplateSource for EmbeddedSource {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.files.get(relative_name(name)) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("embedded template not found: {}", name),
            )),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.files.contains_key(relative_name(name))
    }

    fn location(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| "<embedded>".to_string())
    }
}
