use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use conform_core::frontend::{PackageLister, PackageMeta, Workspace};

/// Lists packages by asking the installed Go toolchain.
///
/// Runs `go list -m -json` for the module and `go list -e -json -deps ./...`
/// for the packages, in the project root. Any non-zero exit is fatal.
pub struct GoToolchain {
    go: PathBuf,
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self { go: "go".into() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedModule {
    path: String,
    dir: Option<PathBuf>,
    main: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedError {
    err: String,
}

/// One package record of `go list -json`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedPackage {
    import_path: String,
    name: String,
    dir: PathBuf,
    go_files: Vec<String>,
    cgo_files: Vec<String>,
    test_go_files: Vec<String>,
    x_test_go_files: Vec<String>,
    imports: Vec<String>,
    test_imports: Vec<String>,
    x_test_imports: Vec<String>,
    standard: bool,
    error: Option<ListedError>,
}

impl ListedPackage {
    fn into_meta(self) -> PackageMeta {
        let dir = self.dir;
        let join = |files: Vec<String>| -> Vec<PathBuf> {
            files.into_iter().map(|f| dir.join(f)).collect()
        };

        let mut files = join(self.go_files);
        files.extend(join(self.cgo_files));
        let mut test_files = join(self.test_go_files);
        test_files.extend(join(self.x_test_go_files));

        let id = self.import_path;
        let imports: Vec<String> = self.imports.into_iter().filter(|i| i != "C").collect();
        let mut test_imports: Vec<String> = self
            .test_imports
            .into_iter()
            .chain(self.x_test_imports)
            .filter(|i| i != "C" && *i != id)
            .collect();
        test_imports.sort();
        test_imports.dedup();

        PackageMeta {
            id,
            name: self.name,
            dir,
            files,
            test_files,
            imports,
            test_imports,
            standard: self.standard,
        }
    }
}

fn parse_stream<T: DeserializeOwned>(input: &str) -> Result<Vec<T>, serde_json::Error> {
    let mut out = Vec::new();
    let deser = serde_json::Deserializer::from_str(input);
    for item in deser.into_iter::<T>() {
        out.push(item?);
    }
    Ok(out)
}

impl GoToolchain {
    /// Use a specific `go` binary.
    pub fn with_binary(go: impl Into<PathBuf>) -> Self {
        Self { go: go.into() }
    }

    fn run(&self, root: &Path, args: &[&str]) -> Result<String> {
        let rendered = args.join(" ");
        tracing::debug!(root = %root.display(), "running go {rendered}");
        let output = Command::new(&self.go)
            .args(args)
            .current_dir(root)
            .output()
            .with_context(|| format!("failed to run `go {rendered}`"))?;
        if !output.status.success() {
            bail!(
                "`go {rendered}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn select_module(modules: Vec<ListedModule>) -> Option<ListedModule> {
    let mut modules = modules.into_iter().filter(|m| !m.path.is_empty());
    let first = modules.next()?;
    if first.main {
        return Some(first);
    }
    Some(modules.find(|m| m.main).unwrap_or(first))
}

fn workspace_from(root: &Path, modules: &str, packages: &str) -> Result<Workspace> {
    let module = select_module(parse_stream(modules).context("invalid `go list -m` output")?)
        .context("`go list -m` reported no module")?;
    let listed: Vec<ListedPackage> =
        parse_stream(packages).context("invalid `go list -json` output")?;

    let packages = listed
        .into_iter()
        .inspect(|p| {
            if let Some(error) = &p.error {
                tracing::warn!(package = %p.import_path, "go list: {}", error.err);
            }
        })
        .filter(|p| !p.import_path.is_empty())
        .map(ListedPackage::into_meta)
        .collect();

    Ok(Workspace {
        module: module.path,
        root: module.dir.unwrap_or_else(|| root.to_path_buf()),
        packages,
    })
}

impl PackageLister for GoToolchain {
    fn name(&self) -> &'static str {
        "go list"
    }

    fn list(&self, root: &Path) -> Result<Workspace> {
        let modules = self.run(root, &["list", "-m", "-json"])?;
        let packages = self.run(root, &["list", "-e", "-json", "-deps", "./..."])?;
        workspace_from(root, &modules, &packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULES: &str = r#"{
	"Path": "example.com/app",
	"Main": true,
	"Dir": "/work/app",
	"GoMod": "/work/app/go.mod",
	"GoVersion": "1.22"
}
"#;

    const PACKAGES: &str = r#"{
	"Dir": "/usr/local/go/src/fmt",
	"ImportPath": "fmt",
	"Name": "fmt",
	"Standard": true,
	"GoFiles": ["print.go"],
	"Imports": ["errors", "io"]
}
{
	"Dir": "/work/app/store",
	"ImportPath": "example.com/app/store",
	"Name": "store",
	"GoFiles": ["store.go"],
	"CgoFiles": ["native.go"],
	"TestGoFiles": ["store_internal_test.go"],
	"XTestGoFiles": ["store_test.go"],
	"Imports": ["C", "fmt"],
	"TestImports": ["testing"],
	"XTestImports": ["example.com/app/store", "testing"]
}
{
	"Dir": "/work/app/broken",
	"ImportPath": "example.com/app/broken",
	"Error": {"Err": "no Go files"}
}
"#;

    #[test]
    fn test_workspace_from_go_list_output() {
        let workspace = workspace_from(Path::new("/work/app"), MODULES, PACKAGES).unwrap();
        assert_eq!(workspace.module, "example.com/app");
        assert_eq!(workspace.root, PathBuf::from("/work/app"));
        assert_eq!(workspace.packages.len(), 3);

        let fmt = &workspace.packages[0];
        assert!(fmt.standard);

        let store = &workspace.packages[1];
        assert_eq!(store.name, "store");
        assert_eq!(
            store.files,
            vec![
                PathBuf::from("/work/app/store/store.go"),
                PathBuf::from("/work/app/store/native.go"),
            ]
        );
        assert_eq!(store.test_files.len(), 2);
        assert_eq!(store.imports, vec!["fmt"]);
        assert_eq!(store.test_imports, vec!["testing"]);

        let broken = &workspace.packages[2];
        assert!(broken.files.is_empty());
    }

    #[test]
    fn test_module_selection_prefers_main() {
        let modules = r#"{"Path": "example.com/dep"}
{"Path": "example.com/app", "Main": true}"#;
        let workspace = workspace_from(Path::new("/work"), modules, "").unwrap();
        assert_eq!(workspace.module, "example.com/app");
        assert_eq!(workspace.root, PathBuf::from("/work"));
        assert!(workspace.packages.is_empty());
    }

    #[test]
    fn test_missing_module_is_an_error() {
        assert!(workspace_from(Path::new("/work"), "", "").is_err());
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let toolchain = GoToolchain::with_binary("/nonexistent/go-binary");
        let err = toolchain.list(Path::new(".")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to run `go list -m -json`"));
    }
}
