use std::collections::HashSet;

use thiserror::Error;

use crate::config::LayerConfig;
use crate::model::{Artifact, Entity};
use crate::pattern::{PackagePattern, PatternError};
use crate::types::Category;

/// Configuration mistakes. These abort the process at the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate layer name '{0}'")]
    DuplicateLayerName(String),
    #[error("duplicate layer pattern '{pattern}' (layer '{layer}')")]
    DuplicateLayerPattern { layer: String, pattern: String },
    #[error("invalid pattern for layer '{layer}': {source}")]
    InvalidLayerPattern {
        layer: String,
        #[source]
        source: PatternError,
    },
    #[error("layer '{0}' is not declared")]
    UnknownLayer(String),
}

/// A named set of packages defined by a package pattern.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    pattern: PackagePattern,
    footprint: Vec<String>,
}

impl Layer {
    pub fn pattern(&self) -> &PackagePattern {
        &self.pattern
    }

    /// IDs of every loaded package matching the pattern, sorted.
    pub fn footprint(&self) -> &[String] {
        &self.footprint
    }

    pub fn contains(&self, package_id: &str) -> bool {
        self.footprint
            .binary_search_by(|id| id.as_str().cmp(package_id))
            .is_ok()
    }
}

impl Entity for Layer {
    const CATEGORY: Category = Category::Layer;

    fn name(&self) -> &str {
        &self.name
    }

    fn package_id(&self) -> &str {
        self.pattern.as_str()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// An artifact together with the declared layers. Entry point for selections.
#[derive(Debug)]
pub struct Architecture {
    artifact: Artifact,
    layers: Vec<Layer>,
}

impl Architecture {
    /// Declare layers over a loaded artifact. Layer names and patterns must be unique.
    pub fn new(artifact: Artifact, layers: &[LayerConfig]) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        let mut patterns = HashSet::new();
        let mut compiled = Vec::with_capacity(layers.len());

        for layer in layers {
            if !names.insert(layer.name.as_str()) {
                return Err(ConfigError::DuplicateLayerName(layer.name.clone()));
            }
            if !patterns.insert(layer.pattern.as_str()) {
                return Err(ConfigError::DuplicateLayerPattern {
                    layer: layer.name.clone(),
                    pattern: layer.pattern.clone(),
                });
            }
            let pattern = PackagePattern::compile(&layer.pattern).map_err(|source| {
                ConfigError::InvalidLayerPattern {
                    layer: layer.name.clone(),
                    source,
                }
            })?;
            let footprint: Vec<String> = artifact
                .packages(false)
                .into_iter()
                .filter(|p| pattern.is_match(p.id()))
                .map(|p| p.id().to_string())
                .collect();
            tracing::debug!(
                layer = %layer.name,
                pattern = %layer.pattern,
                packages = footprint.len(),
                "declared layer"
            );
            compiled.push(Layer {
                name: layer.name.clone(),
                pattern,
                footprint,
            });
        }

        Ok(Self {
            artifact,
            layers: compiled,
        })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Declared layers in declaration order.
    pub fn declared_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Names of the layers containing a package.
    pub fn layers_of(&self, package_id: &str) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|l| l.contains(package_id))
            .map(|l| l.name.as_str())
            .collect()
    }
}
