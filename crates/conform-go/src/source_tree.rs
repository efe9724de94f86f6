use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::{DirEntry, WalkDir};

use conform_core::frontend::{PackageLister, PackageMeta, SourceParser, Workspace};

use crate::parser::TEST_SUFFIX;

const SKIPPED_DIRS: [&str; 2] = ["vendor", "testdata"];

/// Lists packages from `go.mod` and the directory tree, without a Go toolchain.
///
/// Every directory below the module root holding `.go` files is a package.
/// Files ending in the test suffix are test files. Imports are left empty;
/// they are taken from the parsed sources.
#[derive(Debug)]
pub struct SourceTree {
    test_suffix: &'static str,
}

impl Default for SourceTree {
    fn default() -> Self {
        Self {
            test_suffix: TEST_SUFFIX,
        }
    }
}

impl SourceTree {
    /// Classify test files with the suffix of the given parser.
    pub fn for_parser(parser: &dyn SourceParser) -> Self {
        Self {
            test_suffix: parser.test_suffix(),
        }
    }
}

/// Read the module path from the `module` directive of a `go.mod` file.
pub fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.split("//").next().unwrap_or(rest).trim();
        let path = path.trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.')
        || name.starts_with('_')
        || SKIPPED_DIRS.contains(&&*name)
        || entry.path().join("go.mod").is_file()
}

/// Every `.go` file of the module in file-name order. Walk failures are fatal.
fn go_files(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to walk '{}'", root.display()))?;
    Ok(entries
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "go"))
        .collect())
}

impl PackageLister for SourceTree {
    fn name(&self) -> &'static str {
        "source tree"
    }

    fn list(&self, root: &Path) -> Result<Workspace> {
        let go_mod = root.join("go.mod");
        let content = std::fs::read_to_string(&go_mod)
            .with_context(|| format!("failed to read '{}'", go_mod.display()))?;
        let module = module_path(&content)
            .with_context(|| format!("no module directive in '{}'", go_mod.display()))?;

        let mut dirs: BTreeMap<PathBuf, (Vec<PathBuf>, Vec<PathBuf>)> = BTreeMap::new();
        for path in go_files(root)? {
            let Some(dir) = path.parent().map(Path::to_path_buf) else {
                continue;
            };
            let is_test = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(self.test_suffix));
            let (files, tests) = dirs.entry(dir).or_default();
            if is_test {
                tests.push(path);
            } else {
                files.push(path);
            }
        }

        let packages = dirs
            .into_iter()
            .filter_map(|(dir, (files, test_files))| {
                let relative = dir.strip_prefix(root).ok()?;
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                let id = if segments.is_empty() {
                    module.clone()
                } else {
                    format!("{module}/{}", segments.join("/"))
                };
                Some(PackageMeta {
                    id,
                    dir,
                    files,
                    test_files,
                    ..PackageMeta::default()
                })
            })
            .collect();

        Ok(Workspace {
            module,
            root: root.to_path_buf(),
            packages,
        })
    }
}
