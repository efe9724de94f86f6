#![allow(dead_code)]

use std::fs;
use std::path::Path;

use conform::config::ProjectConfig;
use conform::{Config, Frontend, LayerConfig};
use tempfile::TempDir;

pub const MODULE: &str = "example.com/app";

/// Write a throwaway Go module with the given files.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    write(dir.path(), "go.mod", &format!("module {MODULE}\n\ngo 1.22\n"));
    for (path, content) in files {
        write(dir.path(), path, content);
    }
    dir
}

pub fn write(root: &Path, path: &str, content: &str) {
    let target = root.join(path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).expect("failed to create directory");
    }
    fs::write(target, content).expect("failed to write file");
}

/// Configuration that loads through the source tree, with the given layers.
pub fn config(layers: &[(&str, &str)]) -> Config {
    Config {
        project: ProjectConfig {
            frontend: Frontend::SourceTree,
            include_tests: true,
        },
        layers: layers
            .iter()
            .map(|(name, pattern)| LayerConfig {
                name: name.to_string(),
                pattern: pattern.to_string(),
            })
            .collect(),
        ..Config::default()
    }
}
