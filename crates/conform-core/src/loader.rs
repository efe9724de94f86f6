use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use thiserror::Error;

use crate::frontend::{PackageLister, PackageMeta, SourceParser, Workspace};
use crate::model::{Artifact, Package};
use crate::pattern::is_standard_library;
use crate::syntax::FileSyntax;

/// Fatal failures while loading a snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{lister} failed: {message}")]
    Lister {
        lister: &'static str,
        message: String,
    },
    #[error("no packages of module '{module}' found under {}", root.display())]
    NoPackages { module: String, root: PathBuf },
}

/// Package map shared by loader workers. The first insertion of an ID wins.
#[derive(Default)]
pub(crate) struct Registry {
    packages: Mutex<BTreeMap<String, Package>>,
}

impl Registry {
    /// Insert `package` unless its ID is already present. Returns whether it was inserted.
    pub(crate) fn insert_once(&self, package: Package) -> bool {
        let mut packages = self.packages.lock().unwrap_or_else(PoisonError::into_inner);
        if packages.contains_key(package.id()) {
            return false;
        }
        packages.insert(package.id().to_string(), package);
        true
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub(crate) fn into_packages(self) -> Vec<Package> {
        self.packages
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_values()
            .collect()
    }
}

/// Builds an [`Artifact`] from a package lister and a source parser.
///
/// Packages are loaded breadth-first along import edges starting from the
/// application packages. Each round of the walk is processed in parallel.
/// Standard-library packages are kept as metadata only.
pub struct ArtifactLoader<'a> {
    lister: &'a dyn PackageLister,
    parser: &'a dyn SourceParser,
    include_tests: bool,
}

impl<'a> ArtifactLoader<'a> {
    pub fn new(lister: &'a dyn PackageLister, parser: &'a dyn SourceParser) -> Self {
        Self {
            lister,
            parser,
            include_tests: true,
        }
    }

    pub fn include_tests(mut self, include: bool) -> Self {
        self.include_tests = include;
        self
    }

    pub fn load(&self, root: &Path) -> Result<Artifact, LoadError> {
        let workspace = self.lister.list(root).map_err(|e| LoadError::Lister {
            lister: self.lister.name(),
            message: format!("{e:#}"),
        })?;
        tracing::debug!(
            lister = self.lister.name(),
            module = %workspace.module,
            listed = workspace.packages.len(),
            "listed packages"
        );

        let listed: HashMap<&str, &PackageMeta> = workspace
            .packages
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect();

        let mut frontier: Vec<PackageMeta> = workspace
            .packages
            .iter()
            .filter(|p| workspace.is_application(&p.id))
            .cloned()
            .collect();
        if frontier.is_empty() {
            return Err(LoadError::NoPackages {
                module: workspace.module.clone(),
                root: root.to_path_buf(),
            });
        }

        let registry = Registry::default();
        let errors = Mutex::new(Vec::new());
        let mut round = 0usize;

        while !frontier.is_empty() {
            tracing::debug!(round, packages = frontier.len(), "loading packages");

            let discovered: Vec<String> = frontier
                .par_iter()
                .flat_map_iter(|meta| {
                    let package = self.build_package(meta, &workspace, &errors);
                    let mut next: Vec<String> = package.imports().to_vec();
                    if package.is_application() {
                        next.extend(package.test_imports().iter().cloned());
                    }
                    if registry.insert_once(package) {
                        next
                    } else {
                        Vec::new()
                    }
                })
                .collect();

            let unique: BTreeSet<String> = discovered
                .into_iter()
                .filter(|id| !registry.contains(id))
                .collect();
            frontier = unique
                .into_iter()
                .map(|id| match listed.get(id.as_str()) {
                    Some(meta) => (*meta).clone(),
                    None => dependency_stub(&id),
                })
                .collect();
            round += 1;
        }

        let load_errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        let packages = registry.into_packages();
        tracing::info!(
            module = %workspace.module,
            packages = packages.len(),
            errors = load_errors.len(),
            "loaded snapshot"
        );
        Ok(Artifact::new(
            workspace.module,
            workspace.root,
            packages,
            load_errors,
        ))
    }

    fn build_package(
        &self,
        meta: &PackageMeta,
        workspace: &Workspace,
        errors: &Mutex<Vec<String>>,
    ) -> Package {
        let mut meta = meta.clone();
        if !self.include_tests {
            meta.test_files.clear();
            meta.test_imports.clear();
        }

        let syntax = if meta.standard {
            Vec::new()
        } else {
            self.parse_files(&meta, errors)
        };
        Package::from_syntax(&meta, syntax, workspace.is_application(&meta.id))
    }

    fn parse_files(&self, meta: &PackageMeta, errors: &Mutex<Vec<String>>) -> Vec<FileSyntax> {
        let report = |message: String| {
            tracing::warn!("{message}");
            errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message);
        };

        let mut paths: Vec<&PathBuf> = meta.files.iter().chain(&meta.test_files).collect();
        paths.sort();
        tracing::debug!(
            language = self.parser.language(),
            package = %meta.id,
            files = paths.len(),
            "parsing package"
        );

        paths
            .par_iter()
            .filter_map(|path| {
                let content = match std::fs::read_to_string(path) {
                    Ok(c) => c,
                    Err(e) => {
                        report(format!("failed to read {}: {e}", path.display()));
                        return None;
                    }
                };
                match self.parser.parse(&meta.id, path, &content) {
                    Ok(syntax) => {
                        if syntax.has_errors {
                            report(format!("syntax errors in {}", path.display()));
                        }
                        Some(syntax)
                    }
                    Err(e) => {
                        report(format!("failed to parse {}: {e:#}", path.display()));
                        None
                    }
                }
            })
            .collect()
    }
}

/// Metadata for an imported package the lister did not report.
fn dependency_stub(id: &str) -> PackageMeta {
    PackageMeta {
        id: id.to_string(),
        name: id.rsplit('/').next().unwrap_or(id).to_string(),
        standard: is_standard_library(id),
        ..PackageMeta::default()
    }
}
