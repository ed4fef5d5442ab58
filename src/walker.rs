//! Source discovery with gitignore support.
//!
//! Uses the `ignore` crate to walk directories while respecting
//! .gitignore, .git/info/exclude, global gitignore, and .declmapignore.

use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, warn};

/// Per-directory ignore file honored in addition to gitignore.
pub const IGNORE_FILE: &str = ".declmapignore";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
    /// File extensions to keep, without the dot.
    pub extensions: Vec<String>,
    /// Glob patterns matched against paths relative to the root.
    pub exclude: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: false,
            respect_gitignore: true,
            extensions: vec!["py".to_string(), "pyi".to_string()],
            exclude: Vec::new(),
        }
    }
}

impl WalkOptions {
    pub fn with_hidden() -> Self {
        Self {
            include_hidden: true,
            ..Default::default()
        }
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
    }
}

/// Entry from directory walk.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_file: bool,
}

/// Walk a directory tree, yielding every entry not ignored.
///
/// # Examples
///
/// ```no_run
/// use declmap::walker::{walk, WalkOptions};
/// use std::path::Path;
///
/// for entry in walk(Path::new("."), &WalkOptions::default()).unwrap().flatten() {
///     println!("{}", entry.path.display());
/// }
/// ```
pub fn walk(
    root: &Path,
    options: &WalkOptions,
) -> Result<impl Iterator<Item = Result<WalkEntry, WalkError>>, WalkError> {
    if !root.exists() {
        return Err(WalkError::NotFound {
            path: root.to_path_buf(),
        });
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!options.include_hidden)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth)
        .add_custom_ignore_filename(IGNORE_FILE);

    Ok(builder.build().filter_map(|result| match result {
        Ok(entry) => Some(Ok(WalkEntry {
            path: entry.path().to_path_buf(),
            is_file: entry.file_type().is_some_and(|ft| ft.is_file()),
        })),
        Err(ignore::Error::Io(io_err)) => {
            let path = PathBuf::from("<walk error>");
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                Some(Err(WalkError::PermissionDenied { path }))
            } else {
                Some(Err(WalkError::Io {
                    path,
                    source: io_err,
                }))
            }
        }
        Err(e) => {
            // Gitignore parse errors and the like do not stop the walk.
            debug!(error = %e, "skipping walk error");
            None
        }
    }))
}

/// Collect the Python source files under `root`, sorted by path.
///
/// A file root is returned as-is, whatever its extension.
pub fn python_sources(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>, WalkError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let excludes = options
        .exclude
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| WalkError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut sources = Vec::new();
    for entry in walk(root, options)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.is_file || !options.matches_extension(&entry.path) {
            continue;
        }

        let relative = entry.path.strip_prefix(root).unwrap_or(&entry.path);
        if excludes.iter().any(|p| p.matches_path(relative)) {
            debug!(path = %relative.display(), "excluded by pattern");
            continue;
        }

        sources.push(entry.path);
    }

    sources.sort();
    Ok(sources)
}
