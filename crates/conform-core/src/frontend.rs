use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::syntax::FileSyntax;

/// Package metadata as reported by the language's build tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMeta {
    /// Fully qualified import path.
    pub id: String,
    /// Declared package name. May be empty when only known from an import.
    pub name: String,
    pub dir: PathBuf,
    /// Absolute paths of the non-test source files.
    pub files: Vec<PathBuf>,
    /// Absolute paths of test files (both in-package and external tests).
    pub test_files: Vec<PathBuf>,
    /// Imports of the non-test files.
    pub imports: Vec<String>,
    /// Imports only reachable from test files.
    pub test_imports: Vec<String>,
    pub standard: bool,
}

/// The listing of a project: its module, root directory, and packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub module: String,
    pub root: PathBuf,
    pub packages: Vec<PackageMeta>,
}

impl Workspace {
    /// True if `id` belongs to the project's own module.
    pub fn is_application(&self, id: &str) -> bool {
        is_in_module(&self.module, id)
    }
}

/// True if `id` is the module path itself or one of its sub-packages.
pub fn is_in_module(module: &str, id: &str) -> bool {
    id == module
        || id
            .strip_prefix(module)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Trait implemented by the tooling that enumerates packages of a project.
pub trait PackageLister: Send + Sync {
    /// Short name of the lister (e.g., "go list", "source tree").
    fn name(&self) -> &'static str;

    /// Discover the module and every package reachable from the project root.
    fn list(&self, root: &Path) -> Result<Workspace>;
}

/// Trait implemented by a language front-end that summarizes source files.
pub trait SourceParser: Send + Sync {
    /// Language name (e.g., "go").
    fn language(&self) -> &'static str;

    /// Suffix that marks a file as a test file (e.g., "_test.go").
    fn test_suffix(&self) -> &'static str;

    /// Parse one source file belonging to `package_id` into a syntax summary.
    fn parse(&self, package_id: &str, path: &Path, source: &str) -> Result<FileSyntax>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_membership() {
        assert!(is_in_module("example.com/app", "example.com/app"));
        assert!(is_in_module("example.com/app", "example.com/app/internal/db"));
        assert!(!is_in_module("example.com/app", "example.com/application"));
        assert!(!is_in_module("example.com/app", "fmt"));
    }
}
