use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::{DirEntry, WalkDir};

use super::{base_name, display_path};
use crate::model::{Artifact, Package};
use crate::rule::Analyzer;
use crate::types::Category;

const CONFIG_EXTENSIONS: [&str; 4] = ["yml", "yaml", "json", "toml"];
const SKIPPED_DIRS: [&str; 3] = ["vendor", "node_modules", "testdata"];

/// Configuration files must live in `<root>/<folder>`.
pub struct ConfigurationFilesShouldBeInFolder {
    folder: String,
}

impl ConfigurationFilesShouldBeInFolder {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
}

impl Analyzer for ConfigurationFilesShouldBeInFolder {
    fn name(&self) -> &'static str {
        "configuration files should be in folder"
    }

    fn category(&self) -> Category {
        Category::Folder
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let expected = artifact.root().join(&self.folder);
        let entries = WalkDir::new(artifact.root())
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to walk '{}'", artifact.root().display()))?;
        let mut files: Vec<PathBuf> = entries
            .into_iter()
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext))
            })
            .filter(|p| p.parent() != Some(expected.as_path()))
            .collect();
        files.sort();

        Ok(files
            .iter()
            .map(|p| {
                format!(
                    "configuration file {} should be in folder {}",
                    display_path(artifact, p),
                    self.folder
                )
            })
            .collect())
    }
}

/// Non-source files referenced from tests must live under the package's `testdata` folder.
///
/// References are string literals passed to file-opening calls that look like
/// relative paths (a separator or an extension) and resolve to an existing
/// file, plus the targets of `//go:embed` directives in test files.
pub struct TestDataShouldBeInTestDataFolder;

fn looks_like_path(value: &str) -> bool {
    if value.is_empty() || Path::new(value).is_absolute() {
        return false;
    }
    value.contains('/') || Path::new(value).extension().is_some()
}

/// True when `path`, relative to the package directory, lies under `testdata/`.
///
/// The path is resolved lexically; a `..` leaving the package directory is outside.
fn is_under_testdata(relative: &Path) -> bool {
    let mut resolved: Vec<&std::ffi::OsStr> = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if resolved.pop().is_none() {
                    return false;
                }
            }
            Component::Normal(name) => resolved.push(name),
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    resolved.len() > 1 && resolved[0] == "testdata"
}

fn is_source_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

impl TestDataShouldBeInTestDataFolder {
    fn referenced_files(package: &Package, syntax: &crate::syntax::FileSyntax) -> Vec<(String, usize)> {
        let dir = package.dir();
        let mut out = Vec::new();

        for literal in &syntax.io_paths {
            if !looks_like_path(&literal.value) {
                continue;
            }
            let candidate = dir.join(&literal.value);
            if candidate.is_file() && !is_source_file(&candidate) {
                out.push((literal.value.clone(), literal.line));
            }
        }

        for pattern in &syntax.embed_patterns {
            let full = dir.join(&pattern.value);
            let Some(full) = full.to_str() else {
                continue;
            };
            let matches = match glob::glob(full) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::debug!(pattern = %pattern.value, "skipping embed pattern: {e}");
                    continue;
                }
            };
            for path in matches.filter_map(|p| p.ok()) {
                if path.is_file() && !is_source_file(&path) {
                    let relative = path.strip_prefix(dir).unwrap_or(&path);
                    out.push((relative.display().to_string(), pattern.line));
                }
            }
        }
        out
    }
}

impl Analyzer for TestDataShouldBeInTestDataFolder {
    fn name(&self) -> &'static str {
        "test data should be in testdata folder"
    }

    fn category(&self) -> Category {
        Category::Folder
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for syntax in package.syntax() {
                if !package.is_test_file(&syntax.path) {
                    continue;
                }
                for (reference, line) in Self::referenced_files(package, syntax) {
                    if !is_under_testdata(Path::new(&reference)) {
                        messages.push(format!(
                            "{}:{line}: test data {reference} should be in {}",
                            display_path(artifact, &syntax.path),
                            display_path(artifact, &package.dir().join("testdata"))
                        ));
                    }
                }
            }
        }
        Ok(messages)
    }
}

/// Package nesting below the module root must not exceed a maximum depth.
pub struct PackagesShouldNotExceedDepth {
    max_depth: usize,
}

impl PackagesShouldNotExceedDepth {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

/// Depth of a module-relative package path; the module root has depth 0.
pub fn package_depth(relative: &str) -> usize {
    if relative.is_empty() {
        0
    } else {
        relative.matches('/').count() + 1
    }
}

impl Analyzer for PackagesShouldNotExceedDepth {
    fn name(&self) -> &'static str {
        "packages should not exceed depth"
    }

    fn category(&self) -> Category {
        Category::Package
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            let Some(relative) = artifact.relative_path(package.id()) else {
                continue;
            };
            let depth = package_depth(relative);
            if depth > self.max_depth {
                messages.push(format!(
                    "package {} has depth {depth}, exceeding the maximum of {}",
                    package.id(),
                    self.max_depth
                ));
            }
        }
        Ok(messages)
    }
}

/// The declared package name must equal the last segment of its path.
/// `main` packages are exempt.
pub struct PackageNamedAsFolder;

impl Analyzer for PackageNamedAsFolder {
    fn name(&self) -> &'static str {
        "package named as folder"
    }

    fn category(&self) -> Category {
        Category::Naming
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            let declared = package.declared_name();
            if declared == "main" {
                continue;
            }
            let folder = base_name(Path::new(package.id()));
            if declared != folder {
                messages.push(format!(
                    "package {} is named {declared}, expected {folder}",
                    package.id()
                ));
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::PackageMeta;
    use crate::model::fixtures::*;
    use crate::syntax::{FileSyntax, PathLiteral};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_package_depth() {
        assert_eq!(package_depth(""), 0);
        assert_eq!(package_depth("a"), 1);
        assert_eq!(package_depth("a/b/c"), 3);
        assert_eq!(package_depth("a/b/c/d"), 4);
    }

    #[test]
    fn test_depth_limit() {
        let artifact = artifact(vec![
            package("a/b/c", vec![file("a/b/c", "c.go")]),
            package("a/b/c/d", vec![file("a/b/c/d", "d.go")]),
        ]);
        let messages = PackagesShouldNotExceedDepth::new(3).analyze(&artifact).unwrap();
        assert_eq!(
            messages,
            vec!["package example.com/app/a/b/c/d has depth 4, exceeding the maximum of 3"]
        );
    }

    #[test]
    fn test_package_named_as_folder() {
        let mut wrong = file("store", "store.go");
        wrong.package_name = "storage".into();
        let mut main = file("cmd/server", "main.go");
        main.package_name = "main".into();
        let artifact = artifact(vec![
            package("store", vec![wrong]),
            package("cmd/server", vec![main]),
            package("api", vec![file("api", "api.go")]),
        ]);
        let messages = PackageNamedAsFolder.analyze(&artifact).unwrap();
        assert_eq!(
            messages,
            vec!["package example.com/app/store is named storage, expected store"]
        );
    }

    #[test]
    fn test_configuration_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("configs")).unwrap();
        fs::create_dir_all(root.join("deploy")).unwrap();
        fs::create_dir_all(root.join(".github/workflows")).unwrap();
        fs::create_dir_all(root.join("vendor/x")).unwrap();
        fs::write(root.join("configs/app.yaml"), "a: 1").unwrap();
        fs::write(root.join("deploy/k8s.yml"), "a: 1").unwrap();
        fs::write(root.join("settings.json"), "{}").unwrap();
        fs::write(root.join(".github/workflows/ci.yml"), "a: 1").unwrap();
        fs::write(root.join("vendor/x/x.toml"), "").unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();

        let artifact = Artifact::new(MODULE, root, vec![], vec![]);
        let messages = ConfigurationFilesShouldBeInFolder::new("configs")
            .analyze(&artifact)
            .unwrap();
        assert_eq!(
            messages,
            vec![
                "configuration file deploy/k8s.yml should be in folder configs",
                "configuration file settings.json should be in folder configs",
            ]
        );
    }

    fn test_package(dir: &Path, syntax: FileSyntax) -> Package {
        let meta = PackageMeta {
            id: format!("{MODULE}/loader"),
            name: "loader".into(),
            dir: dir.to_path_buf(),
            files: vec![],
            test_files: vec![syntax.path.clone()],
            imports: vec![],
            test_imports: vec![],
            standard: false,
        };
        Package::from_syntax(&meta, vec![syntax], true)
    }

    #[test]
    fn test_testdata_references() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("testdata")).unwrap();
        fs::create_dir_all(root.join("fixtures")).unwrap();
        fs::write(root.join("testdata/ok.json"), "{}").unwrap();
        fs::write(root.join("fixtures/bad.json"), "{}").unwrap();
        fs::write(root.join("golden.txt"), "x").unwrap();
        fs::write(root.join("helper.go"), "package loader").unwrap();

        let literal = |value: &str, line: usize| PathLiteral {
            value: value.into(),
            line,
        };
        let syntax = FileSyntax {
            path: root.join("loader_test.go"),
            package_name: "loader".into(),
            io_paths: vec![
                literal("testdata/ok.json", 10),
                literal("./testdata/ok.json", 11),
                literal("fixtures/bad.json", 12),
                literal("golden.txt", 13),
                literal("helper.go", 14),
                literal("missing/file.json", 15),
                literal("not a path", 16),
            ],
            embed_patterns: vec![literal("fixtures/*.json", 5)],
            ..FileSyntax::default()
        };
        let artifact = Artifact::new(MODULE, root, vec![test_package(root, syntax)], vec![]);
        let messages = TestDataShouldBeInTestDataFolder.analyze(&artifact).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("loader_test.go:12: test data fixtures/bad.json"));
        assert!(messages[1].starts_with("loader_test.go:13: test data golden.txt"));
        assert!(messages[2].starts_with("loader_test.go:5: test data fixtures/bad.json"));
    }

    #[test]
    fn test_path_heuristics() {
        assert!(looks_like_path("testdata/a"));
        assert!(looks_like_path("a.json"));
        assert!(!looks_like_path("plain"));
        assert!(!looks_like_path("/etc/passwd"));
        assert!(is_under_testdata(Path::new("./testdata/a.json")));
        assert!(!is_under_testdata(Path::new("other/testdata/a.json")));
        assert!(!is_under_testdata(Path::new("testdata/../fixtures/x.json")));
        assert!(!is_under_testdata(Path::new("../testdata/x.json")));
        assert!(is_under_testdata(Path::new("fixtures/../testdata/x.json")));
    }

    #[test]
    fn test_configuration_walk_failure_is_an_error() {
        let artifact = Artifact::new(MODULE, "/nonexistent-conform-root", vec![], vec![]);
        let err = ConfigurationFilesShouldBeInFolder::new("configs")
            .analyze(&artifact)
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to walk '/nonexistent-conform-root'"));
    }
}
