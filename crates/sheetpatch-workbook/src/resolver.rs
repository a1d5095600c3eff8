//! Template and destination resolution.
//!
//! Templates are looked up through an ordered list of [`TemplateSource`]
//! strategies (filesystem first, then bundled resources); the first hit wins.
//! Relative destinations are joined to an explicit base directory, never one
//! inferred from the shape of the working directory.

use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix stripped from template references before a bundled-resource lookup.
pub const DEFAULT_RESOURCE_PREFIX: &str = "src/main/resources/";

/// Where template bytes were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum TemplateOrigin {
    File(PathBuf),
    Resource(String),
}

impl fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateOrigin::File(p) => write!(f, "{}", p.display()),
            TemplateOrigin::Resource(name) => write!(f, "resource `{name}`"),
        }
    }
}

/// Open byte stream over a template. Dropping it releases the handle.
pub struct TemplateStream {
    pub reader: Box<dyn Read + Send>,
    pub origin: TemplateOrigin,
}

impl fmt::Debug for TemplateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateStream")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Outcome of a single lookup strategy.
pub enum Lookup {
    Found(TemplateStream),
    /// Nothing there; the string describes where we looked.
    Missing(String),
}

pub trait TemplateSource: Send + Sync {
    fn lookup(&self, reference: &str) -> Result<Lookup, UpdateError>;
}

/// Plain file lookup, relative references joined to the base directory.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    base_dir: PathBuf,
}

impl FilesystemSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn candidate(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl TemplateSource for FilesystemSource {
    fn lookup(&self, reference: &str) -> Result<Lookup, UpdateError> {
        let path = self.candidate(reference);
        if !path.is_file() {
            return Ok(Lookup::Missing(path.display().to_string()));
        }
        let file = File::open(&path).map_err(|e| UpdateError::io(&path, e))?;
        Ok(Lookup::Found(TemplateStream {
            reader: Box::new(file),
            origin: TemplateOrigin::File(path),
        }))
    }
}

/// Templates shipped with the application.
///
/// Entries registered in memory are consulted before the optional on-disk
/// resource root.
#[derive(Debug, Clone)]
pub struct BundledResources {
    prefix: String,
    root: Option<PathBuf>,
    embedded: BTreeMap<String, Cow<'static, [u8]>>,
}

impl Default for BundledResources {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_PREFIX)
    }
}

impl BundledResources {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            root: None,
            embedded: BTreeMap::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Register template bytes under a relative resource name.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) {
        self.embedded.insert(name.into(), bytes.into());
    }

    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Cow<'static, [u8]>>,
    ) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Resource name for a reference: prefix stripped, separators normalised.
    pub fn resource_name<'a>(&self, reference: &'a str) -> Cow<'a, str> {
        let stripped = if self.prefix.is_empty() {
            reference
        } else {
            reference.strip_prefix(self.prefix.as_str()).unwrap_or(reference)
        };
        let stripped = stripped.trim_start_matches('/');
        if stripped.contains('\\') {
            Cow::Owned(stripped.replace('\\', "/"))
        } else {
            Cow::Borrowed(stripped)
        }
    }
}

impl TemplateSource for BundledResources {
    fn lookup(&self, reference: &str) -> Result<Lookup, UpdateError> {
        let name = self.resource_name(reference);
        if let Some(bytes) = self.embedded.get(name.as_ref()) {
            return Ok(Lookup::Found(TemplateStream {
                reader: Box::new(Cursor::new(bytes.clone())),
                origin: TemplateOrigin::Resource(name.into_owned()),
            }));
        }
        if let Some(root) = &self.root {
            let path = root.join(name.as_ref());
            if path.is_file() {
                let file = File::open(&path).map_err(|e| UpdateError::io(&path, e))?;
                return Ok(Lookup::Found(TemplateStream {
                    reader: Box::new(file),
                    origin: TemplateOrigin::Resource(name.into_owned()),
                }));
            }
        }
        Ok(Lookup::Missing(format!("resource `{name}`")))
    }
}

/// Destination path after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub path: PathBuf,
    /// `true` when this call had to create the parent directories.
    pub directory_created: bool,
}

pub struct PathResolver {
    base_dir: PathBuf,
    sources: Vec<Box<dyn TemplateSource>>,
}

impl PathResolver {
    /// Filesystem lookup followed by an empty resource bundle.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_resources(base_dir, BundledResources::default())
    }

    pub fn with_resources(base_dir: impl Into<PathBuf>, resources: BundledResources) -> Self {
        let base_dir = base_dir.into();
        Self {
            sources: vec![
                Box::new(FilesystemSource::new(base_dir.clone())),
                Box::new(resources),
            ],
            base_dir,
        }
    }

    /// Resolver rooted at the process working directory.
    pub fn from_current_dir() -> Result<Self, UpdateError> {
        let cwd = std::env::current_dir().map_err(|e| UpdateError::io(".", e))?;
        Ok(Self::new(cwd))
    }

    pub fn from_config(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        let base_dir = match &config.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| UpdateError::io(".", e))?,
        };
        let mut resources = BundledResources::new(config.resource_prefix.clone());
        if let Some(root) = &config.resource_root {
            let root = if root.is_absolute() {
                root.clone()
            } else {
                base_dir.join(root)
            };
            resources = resources.with_root(root);
        }
        Ok(Self::with_resources(base_dir, resources))
    }

    /// Append a lookup strategy after the built-in ones.
    pub fn push_source(&mut self, source: Box<dyn TemplateSource>) {
        self.sources.push(source);
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Try each strategy in order; report every attempted location on a miss.
    pub fn resolve_source(&self, reference: &str) -> Result<TemplateStream, UpdateError> {
        let mut attempted = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.lookup(reference)? {
                Lookup::Found(stream) => {
                    debug!(reference, origin = %stream.origin, "template resolved");
                    return Ok(stream);
                }
                Lookup::Missing(location) => attempted.push(location),
            }
        }
        Err(UpdateError::TemplateNotFound {
            reference: reference.to_string(),
            attempted,
        })
    }

    /// Absolute destination path, without touching the filesystem.
    pub fn destination_path(&self, output: &str) -> Result<PathBuf, UpdateError> {
        let path = Path::new(output);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        std::path::absolute(&joined).map_err(|e| UpdateError::io(&joined, e))
    }

    /// Absolute destination path with its parent directories in place.
    ///
    /// Idempotent: existing directories are left alone and a repeat call
    /// returns the same path with `directory_created == false`.
    pub fn resolve_destination(&self, output: &str) -> Result<ResolvedDestination, UpdateError> {
        let path = self.destination_path(output)?;

        let mut directory_created = false;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|e| UpdateError::io(parent, e))?;
                directory_created = true;
                debug!(dir = %parent.display(), "created destination directory");
            }
        }
        Ok(ResolvedDestination {
            path,
            directory_created,
        })
    }
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("base_dir", &self.base_dir)
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_all(mut stream: TemplateStream) -> Vec<u8> {
        let mut buf = Vec::new();
        stream.reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn resource_name_strips_prefix() {
        let bundle = BundledResources::default();
        assert_eq!(bundle.resource_name("src/main/resources/t.xlsx"), "t.xlsx");
        assert_eq!(bundle.resource_name("templates/t.xlsx"), "templates/t.xlsx");
        assert_eq!(bundle.resource_name("/t.xlsx"), "t.xlsx");
        assert_eq!(bundle.resource_name("dir\\t.xlsx"), "dir/t.xlsx");
    }

    #[test]
    fn filesystem_wins_over_bundle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.bin"), b"disk").unwrap();
        let resources = BundledResources::default().with_resource("t.bin", &b"bundle"[..]);
        let resolver = PathResolver::with_resources(dir.path(), resources);

        let stream = resolver.resolve_source("t.bin").unwrap();
        assert_eq!(stream.origin, TemplateOrigin::File(dir.path().join("t.bin")));
        assert_eq!(read_all(stream), b"disk");
    }

    #[test]
    fn falls_back_to_embedded_resource() {
        let dir = tempfile::tempdir().unwrap();
        let resources = BundledResources::default().with_resource("t.bin", b"bundle".to_vec());
        let resolver = PathResolver::with_resources(dir.path(), resources);

        let stream = resolver.resolve_source("src/main/resources/t.bin").unwrap();
        assert_eq!(stream.origin, TemplateOrigin::Resource("t.bin".into()));
        assert_eq!(read_all(stream), b"bundle");
    }

    #[test]
    fn falls_back_to_resource_root() {
        let base = tempfile::tempdir().unwrap();
        let res = tempfile::tempdir().unwrap();
        fs::create_dir_all(res.path().join("tpl")).unwrap();
        fs::write(res.path().join("tpl/a.bin"), b"rooted").unwrap();
        let resolver =
            PathResolver::with_resources(base.path(), BundledResources::default().with_root(res.path()));

        let stream = resolver.resolve_source("src/main/resources/tpl/a.bin").unwrap();
        assert_eq!(stream.origin, TemplateOrigin::Resource("tpl/a.bin".into()));
        assert_eq!(read_all(stream), b"rooted");
    }

    #[test]
    fn miss_reports_both_locations() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());
        let err = resolver
            .resolve_source("src/main/resources/missing.xlsx")
            .unwrap_err();
        match err {
            UpdateError::TemplateNotFound {
                reference,
                attempted,
            } => {
                assert_eq!(reference, "src/main/resources/missing.xlsx");
                assert_eq!(attempted.len(), 2);
                assert!(attempted[0].ends_with("missing.xlsx"));
                assert_eq!(attempted[1], "resource `missing.xlsx`");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn absolute_destination_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.xlsx");
        let resolver = PathResolver::new("/definitely/not/used");
        let resolved = resolver
            .resolve_destination(target.to_str().unwrap())
            .unwrap();
        assert_eq!(resolved.path, target);
        assert!(!resolved.directory_created);
    }

    #[test]
    fn relative_destination_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());

        let first = resolver.resolve_destination("out/nested/book.xlsx").unwrap();
        assert_eq!(first.path, dir.path().join("out/nested/book.xlsx"));
        assert!(first.directory_created);
        assert!(dir.path().join("out/nested").is_dir());

        let second = resolver.resolve_destination("out/nested/book.xlsx").unwrap();
        assert_eq!(second.path, first.path);
        assert!(!second.directory_created);
    }

    #[test]
    fn destination_path_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());

        let path = resolver.destination_path("a/b/book.xlsx").unwrap();
        assert_eq!(path, dir.path().join("a/b/book.xlsx"));
        assert!(!dir.path().join("a").exists());
    }
}
