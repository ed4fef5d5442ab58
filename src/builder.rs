//! Fluent builder API for declmap.
//!
//! Discovers Python sources under a root and extracts a report per file.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::ExtractConfig;
use crate::errors::DeclmapError;
use crate::extract::{extract_file, ClassRecord, ExtractOptions, FunctionRecord, SourceReport};
use crate::output::{FileFailure, Summary};
use crate::parser::ParseError;
use crate::walker::{python_sources, WalkOptions};

/// Builder for extracting declarations from a file or directory.
///
/// # Examples
///
/// ```no_run
/// use declmap::builder::Declmap;
///
/// let result = Declmap::new("./project")
///     .exclude("tests/**")
///     .build()
///     .unwrap();
///
/// for class in result.classes() {
///     println!("{:?}", class.name);
/// }
/// ```
pub struct Declmap {
    root: PathBuf,
    options: ExtractOptions,
    walk_options: WalkOptions,
}

impl Declmap {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: ExtractOptions::default(),
            walk_options: WalkOptions::default(),
        }
    }

    /// Start from the `[extract]` configuration section.
    pub fn from_config(root: impl Into<PathBuf>, config: &ExtractConfig) -> Self {
        Self {
            root: root.into(),
            options: config.options(),
            walk_options: WalkOptions {
                include_hidden: config.include_hidden,
                extensions: config.extensions.clone(),
                exclude: config.exclude.clone(),
                ..Default::default()
            },
        }
    }

    /// Identifier treated as the instance parameter.
    pub fn self_name(mut self, name: impl Into<String>) -> Self {
        self.options.self_name = name.into();
        self
    }

    /// Replace the accepted file extensions.
    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.walk_options.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Skip paths matching a glob relative to the root.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.walk_options.exclude.push(pattern.into());
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.walk_options.include_hidden = include;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk_options.max_depth = Some(depth);
        self
    }

    /// Source files that `build` would process.
    pub fn sources(&self) -> Result<Vec<PathBuf>, DeclmapError> {
        if !self.root.exists() {
            return Err(DeclmapError::SourceNotFound(self.root.clone()));
        }
        Ok(python_sources(&self.root, &self.walk_options)?)
    }

    /// Extract reports from every source file in parallel.
    ///
    /// Files that fail to read or parse are collected in
    /// [`DeclmapResult::failures`]; a missing parser fails the whole call.
    pub fn build(self) -> Result<DeclmapResult, DeclmapError> {
        let sources = self.sources()?;
        if sources.is_empty() {
            return Err(DeclmapError::NoFilesFound(self.root));
        }

        let results: Vec<(PathBuf, Result<SourceReport, ParseError>)> = sources
            .into_par_iter()
            .map(|path| {
                let result = extract_file(&path, &self.options);
                (path, result)
            })
            .collect();

        let mut reports = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(ParseError::ParseUnavailable { reason }) => {
                    return Err(DeclmapError::ParseUnavailable(reason));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    failures.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        let result = DeclmapResult { reports, failures };
        let summary = result.summary();
        info!(
            root = %self.root.display(),
            files = summary.files,
            classes = summary.classes,
            functions = summary.functions,
            failures = summary.failures,
            "extraction complete"
        );
        Ok(result)
    }
}

/// Result of a declmap extraction.
#[derive(Debug)]
pub struct DeclmapResult {
    /// One report per successfully parsed file, sorted by path.
    pub reports: Vec<SourceReport>,
    pub failures: Vec<FileFailure>,
}

impl DeclmapResult {
    /// Get the report for a specific path.
    pub fn report_for(&self, path: &Path) -> Option<&SourceReport> {
        self.reports.iter().find(|r| r.path.as_deref() == Some(path))
    }

    /// Every function record across all files.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.reports.iter().flat_map(|r| r.functions.iter())
    }

    /// Every outermost class record across all files.
    pub fn classes(&self) -> impl Iterator<Item = &ClassRecord> {
        self.reports.iter().flat_map(|r| r.classes.iter())
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.reports, &self.failures)
    }
}
