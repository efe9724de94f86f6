//! Architecture conformance for Go projects.
//!
//! Load a project once with [`architecture`], build rules from selections or
//! from the `[rules]` table of `.conform.toml`, and [`validate`] them:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let config = conform::Config::load_or_default(Path::new("."));
//! let arch = conform::architecture(Path::new("."), &config)?;
//! let rules = vec![
//!     arch.layers(&["App"]).should_only_refer(arch.layers(&["Internal"])),
//! ];
//! if let Some(report) = conform::validate(&arch, &rules) {
//!     println!("{report}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

pub use conform_core::config::{DependencyRule, Frontend, LayerConfig, RulesConfig};
pub use conform_core::*;

use conform_go::{GoParser, GoToolchain, SourceTree};

static ARCHITECTURE: Mutex<Option<Arc<Architecture>>> = Mutex::new(None);

/// Load a fresh snapshot of the project at `root` and declare its layers.
pub fn load(root: &Path, config: &Config) -> Result<Architecture> {
    let parser = GoParser::new().context("failed to initialize Go parser")?;
    let toolchain;
    let source_tree;
    let lister: &dyn PackageLister = match config.project.frontend {
        Frontend::Toolchain => {
            toolchain = GoToolchain::default();
            &toolchain
        }
        Frontend::SourceTree => {
            source_tree = SourceTree::for_parser(&parser);
            &source_tree
        }
    };

    let artifact = ArtifactLoader::new(lister, &parser)
        .include_tests(config.project.include_tests)
        .load(root)?;
    let arch = Architecture::new(artifact, &config.layers)
        .context("invalid layer configuration")?;
    Ok(arch)
}

/// The process-wide snapshot, loaded on first use.
///
/// Later calls return the cached snapshot regardless of their arguments.
pub fn architecture(root: &Path, config: &Config) -> Result<Arc<Architecture>> {
    let mut slot = ARCHITECTURE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(arch) = slot.as_ref() {
        tracing::debug!("reusing loaded snapshot");
        return Ok(Arc::clone(arch));
    }
    let arch = Arc::new(load(root, config)?);
    *slot = Some(Arc::clone(&arch));
    Ok(arch)
}

/// Drop the cached snapshot so the next [`architecture`] call loads again.
pub fn reset() {
    ARCHITECTURE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}

/// Translate the `[rules]` table into rules over `arch`.
///
/// The best-practice bundle comes first, followed by the dependency rules in
/// file order. Empty layer lists are skipped.
pub fn rules_from_config<'a>(
    arch: &'a Architecture,
    config: &RulesConfig,
) -> Result<Vec<Rule<'a>>, ConfigError> {
    let mut rules = Vec::new();
    if config.best_practices {
        rules.push(analyzers::best_practices(
            config.max_depth,
            &config.config_folder,
        ));
    }

    for dependency in &config.dependencies {
        if let Some(unknown) = dependency.layer_names().find(|n| arch.layer(n).is_none()) {
            return Err(ConfigError::UnknownLayer(unknown.to_string()));
        }

        let subject = [dependency.layer.as_str()];
        let targets = |names: &[String]| -> Result<Selection<'a, Layer>, ConfigError> {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            arch.try_layers(&names)
        };

        if !dependency.should_only_refer.is_empty() {
            let allowed = targets(&dependency.should_only_refer)?;
            rules.push(arch.try_layers(&subject)?.should_only_refer(allowed));
        }
        if !dependency.should_not_refer.is_empty() {
            let forbidden = targets(&dependency.should_not_refer)?;
            rules.push(arch.try_layers(&subject)?.should_not_refer(forbidden));
        }
        if !dependency.should_not_be_referred_by.is_empty() {
            let referrers = targets(&dependency.should_not_be_referred_by)?;
            rules.push(arch.try_layers(&subject)?.should_not_be_referred_by(referrers));
        }
        if !dependency.should_only_be_referred_by.is_empty() {
            let allowed = targets(&dependency.should_only_be_referred_by)?;
            rules.push(arch.try_layers(&subject)?.should_only_be_referred_by(allowed));
        }
    }

    tracing::debug!(rules = rules.len(), "rules from configuration");
    Ok(rules)
}
