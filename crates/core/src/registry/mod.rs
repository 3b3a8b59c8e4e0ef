//! Framework registry loaded from a directory of JSON descriptors.
//!
//! One malformed file is skipped with a warning and never aborts the load.
//! After [`Registry::load`] the registry is read-only and is shared behind an
//! `Arc` without locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::RegistryError;

mod descriptor;
mod search;

pub use descriptor::{
    Category, FrameworkDescriptor, FrameworkDetail, FrameworkSummary, GithubSource, IncompatiblePattern, Severity,
    SourceSpec, Sources, normalize_identifier,
};
pub use search::{RankedFramework, SearchMatch, normalize_query};

/// Summary counters for the loaded registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStatistics {
    pub total_frameworks: usize,
    pub categories: Vec<Category>,
    pub category_counts: BTreeMap<Category, usize>,
    pub is_loaded: bool,
    pub skipped_descriptors: usize,
}

#[derive(Debug)]
pub struct Registry {
    dir: PathBuf,
    frameworks: BTreeMap<String, Arc<FrameworkDescriptor>>,
    warnings: Vec<String>,
    loaded: bool,
}

impl Registry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), frameworks: BTreeMap::new(), warnings: Vec::new(), loaded: false }
    }

    /// Build a registry from already-parsed descriptors.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FrameworkDescriptor>) -> Self {
        let mut registry = Self::new(PathBuf::new());
        for descriptor in descriptors {
            registry.insert(descriptor, Path::new("<memory>"));
        }
        registry.loaded = true;
        registry
    }

    /// Parse every `*.json` descriptor under the directory, recursively.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the directory is missing and
    /// `RegistryError::Io` if it cannot be listed. Individual bad files are
    /// recorded in [`Registry::warnings`] instead.
    pub fn load(&mut self) -> Result<(), RegistryError> {
        if !self.dir.is_dir() {
            return Err(RegistryError::NotFound(self.dir.clone()));
        }

        self.frameworks.clear();
        self.warnings.clear();

        let mut files = Vec::new();
        collect_descriptor_files(&self.dir, &mut files)?;
        files.sort();

        for path in files {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| RegistryError::MalformedDescriptor { path: path.clone(), reason: e.to_string() })
                .and_then(|json| FrameworkDescriptor::from_json(&path, &json));

            match parsed {
                Ok(descriptor) => self.insert(descriptor, &path),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping framework descriptor");
                    self.warnings.push(err.to_string());
                }
            }
        }

        self.loaded = true;
        tracing::info!(
            dir = %self.dir.display(),
            frameworks = self.frameworks.len(),
            skipped = self.warnings.len(),
            "framework registry loaded"
        );
        Ok(())
    }

    fn insert(&mut self, descriptor: FrameworkDescriptor, path: &Path) {
        if self.frameworks.contains_key(&descriptor.name) {
            let warning = format!("duplicate framework '{}' in {} ignored", descriptor.name, path.display());
            tracing::warn!(framework = %descriptor.name, path = %path.display(), "duplicate framework descriptor ignored");
            self.warnings.push(warning);
            return;
        }
        self.frameworks.insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn get(&self, identifier: &str) -> Option<Arc<FrameworkDescriptor>> {
        self.frameworks.get(&normalize_identifier(identifier)).cloned()
    }

    /// All frameworks in identifier order, optionally filtered by category.
    pub fn list_by_category(&self, category: Option<Category>) -> Vec<Arc<FrameworkDescriptor>> {
        self.frameworks
            .values()
            .filter(|d| category.is_none_or(|c| d.category == c))
            .cloned()
            .collect()
    }

    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        search::rank(self.frameworks.values(), query)
    }

    pub fn count(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Categories that have at least one framework.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.frameworks.values().map(|d| d.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.frameworks.keys().cloned().collect()
    }

    /// Messages for descriptors skipped during the last load.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn stats(&self) -> RegistryStatistics {
        let mut category_counts = BTreeMap::new();
        for descriptor in self.frameworks.values() {
            *category_counts.entry(descriptor.category).or_insert(0) += 1;
        }
        RegistryStatistics {
            total_frameworks: self.frameworks.len(),
            categories: self.categories(),
            category_counts,
            is_loaded: self.loaded,
            skipped_descriptors: self.warnings.len(),
        }
    }
}

fn collect_descriptor_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let io_err = |source| RegistryError::Io { path: dir.to_path_buf(), source };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_descriptor_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
