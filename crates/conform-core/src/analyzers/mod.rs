//! Whole-program structural analyzers.
//!
//! Each analyzer only looks at application packages and reports messages in
//! package-ID order, then source order.

mod declarations;
mod functions;
mod layout;
mod usage;

use std::path::Path;

pub use declarations::{
    ConstantsAndVariablesShouldBeGrouped, ConstantsShouldBeConsolidated,
    NoPublicReAssignableVariables, VariablesAndConstantsShouldUseMixedCaps,
    VariablesShouldBeUsedInDefiningFile,
};
pub use functions::{
    AtMostOneInitFuncPerPackage, ContextKeysShouldBePrivateType, ContextShouldBeFirstParam,
    ErrorShouldBeLastReturn,
};
pub use layout::{
    ConfigurationFilesShouldBeInFolder, PackageNamedAsFolder, PackagesShouldNotExceedDepth,
    TestDataShouldBeInTestDataFolder,
};
pub use usage::NoUnusedPublicDeclarations;

use crate::model::Artifact;
use crate::rule::{self, Rule};

/// Type string of the standard context interface.
pub const CONTEXT_TYPE: &str = "context.Context";

/// The bundled best-practice checks as a single rule.
pub fn best_practices(max_depth: usize, config_folder: &str) -> Rule<'static> {
    rule::all(
        "best practices",
        vec![
            ConstantsShouldBeConsolidated.into(),
            VariablesShouldBeUsedInDefiningFile.into(),
            ConfigurationFilesShouldBeInFolder::new(config_folder).into(),
            NoPublicReAssignableVariables.into(),
            NoUnusedPublicDeclarations.into(),
            AtMostOneInitFuncPerPackage.into(),
            ErrorShouldBeLastReturn.into(),
            TestDataShouldBeInTestDataFolder.into(),
            PackagesShouldNotExceedDepth::new(max_depth).into(),
            ContextShouldBeFirstParam.into(),
            ContextKeysShouldBePrivateType.into(),
            ConstantsAndVariablesShouldBeGrouped.into(),
            PackageNamedAsFolder.into(),
            VariablesAndConstantsShouldUseMixedCaps.into(),
        ],
    )
}

/// Path relative to the project root for messages.
fn display_path(artifact: &Artifact, path: &Path) -> String {
    path.strip_prefix(artifact.root())
        .unwrap_or(path)
        .display()
        .to_string()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
