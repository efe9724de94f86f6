pub mod analyzers;
pub mod architecture;
pub mod config;
pub mod frontend;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod pattern;
pub mod rule;
pub mod selection;
pub mod syntax;
pub mod types;

pub use architecture::{Architecture, ConfigError, Layer};
pub use config::Config;
pub use frontend::{PackageLister, PackageMeta, SourceParser, Workspace};
pub use loader::{ArtifactLoader, LoadError};
pub use matcher::Matcher;
pub use model::{Artifact, Entity, File, Function, Package, Type, Variable};
pub use rule::{validate, Analyzer, Report, Rule, RuleError, Violations};
pub use selection::{Exportable, Referable, Selection, SelectionError};
pub use types::*;
