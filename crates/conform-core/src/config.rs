use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name searched for in the project directory and its ancestors.
pub const CONFIG_FILE: &str = ".conform.toml";

/// Top-level configuration from `.conform.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub rules: RulesConfig,
}

/// How package metadata is discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frontend {
    /// Ask the installed Go toolchain (`go list`).
    #[default]
    Toolchain,
    /// Read `go.mod` and walk the directory tree.
    SourceTree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub frontend: Frontend,
    #[serde(default = "default_true")]
    pub include_tests: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            frontend: Frontend::default(),
            include_tests: true,
        }
    }
}

/// A named layer rooted at a package pattern (`...` matches any suffix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub pattern: String,
}

/// Dependency constraints attached to one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRule {
    pub layer: String,
    #[serde(default)]
    pub should_only_refer: Vec<String>,
    #[serde(default)]
    pub should_not_refer: Vec<String>,
    #[serde(default)]
    pub should_not_be_referred_by: Vec<String>,
    #[serde(default)]
    pub should_only_be_referred_by: Vec<String>,
}

impl DependencyRule {
    /// Every layer name this rule mentions, starting with its subject.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.layer.as_str()).chain(
            self.should_only_refer
                .iter()
                .chain(&self.should_not_refer)
                .chain(&self.should_not_be_referred_by)
                .chain(&self.should_only_be_referred_by)
                .map(String::as_str),
        )
    }
}

/// Rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_true")]
    pub best_practices: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_config_folder")]
    pub config_folder: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyRule>,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    3
}

fn default_config_folder() -> String {
    "configs".to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            best_practices: true,
            max_depth: default_max_depth(),
            config_folder: default_config_folder(),
            dependencies: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a `.conform.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `conform init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.conform.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        for current in start.ancestors() {
            let config_path = current.join(CONFIG_FILE);
            if !config_path.exists() {
                continue;
            }
            return match Self::load(&config_path) {
                Ok(config) => {
                    tracing::debug!(path = %config_path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to load config from '{}': {e:#}. Using defaults.",
                        config_path.display()
                    );
                    Self::default()
                }
            };
        }
        Self::default()
    }

    /// Generate default TOML content for `conform init`.
    pub fn default_toml() -> String {
        r#"# conform - architecture conformance configuration

[project]
# "toolchain" asks `go list`; "source-tree" reads go.mod and walks the tree
frontend = "toolchain"
include_tests = true

# Layers are rooted at package patterns; a trailing "/..." matches sub-packages.
# [[layers]]
# name = "App"
# pattern = "example.com/app"
#
# [[layers]]
# name = "Internal"
# pattern = "example.com/app/internal/..."

[rules]
best_practices = true
max_depth = 3
config_folder = "configs"

# [[rules.dependencies]]
# layer = "App"
# should_only_refer = ["Internal"]
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.frontend, Frontend::Toolchain);
        assert!(config.project.include_tests);
        assert!(config.layers.is_empty());
        assert!(config.rules.best_practices);
        assert_eq!(config.rules.max_depth, 3);
        assert_eq!(config.rules.config_folder, "configs");
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[project]
frontend = "source-tree"
include_tests = false

[[layers]]
name = "App"
pattern = "example.com/app"

[[layers]]
name = "Internal"
pattern = "example.com/app/internal/..."

[rules]
best_practices = false
max_depth = 5

[[rules.dependencies]]
layer = "App"
should_only_refer = ["Internal"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project.frontend, Frontend::SourceTree);
        assert!(!config.project.include_tests);
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.layers[1].pattern, "example.com/app/internal/...");
        assert!(!config.rules.best_practices);
        assert_eq!(config.rules.max_depth, 5);
        assert_eq!(config.rules.config_folder, "configs");
        let dep = &config.rules.dependencies[0];
        assert_eq!(dep.should_only_refer, vec!["Internal"]);
        assert!(dep.should_not_refer.is_empty());
        assert_eq!(dep.layer_names().collect::<Vec<_>>(), vec!["App", "Internal"]);
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.project.frontend, Frontend::Toolchain);
        assert!(config.layers.is_empty());
        assert_eq!(config.rules.max_depth, 3);
    }

    #[test]
    fn test_load_or_default_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[rules]\nmax_depth = 7\n",
        )
        .unwrap();
        let config = Config::load_or_default(&nested);
        assert_eq!(config.rules.max_depth, 7);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[rules\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("conform init"));
    }
}
