use std::collections::HashSet;

use anyhow::Result;

use crate::model::{Artifact, Entity};
use crate::rule::Analyzer;
use crate::syntax::UseTarget;
use crate::types::Category;

/// Function name prefixes reserved for the test runner.
const TEST_PREFIXES: [&str; 4] = ["Test", "Benchmark", "Example", "Fuzz"];

/// Methods satisfying standard-library interfaces, which are called implicitly.
const IMPLICIT_METHODS: [&str; 14] = [
    "Error",
    "String",
    "GoString",
    "Format",
    "Unwrap",
    "Is",
    "As",
    "ServeHTTP",
    "MarshalJSON",
    "UnmarshalJSON",
    "MarshalText",
    "UnmarshalText",
    "Read",
    "Write",
];

/// Exported types, functions, and methods must be used outside their package.
///
/// Types and functions count as used when another package refers to them
/// through an import-qualified reference. Methods count as used when another
/// package selects a member with the same name, when a loaded interface
/// declares a method of that name, or when the name belongs to a well-known
/// standard-library interface.
pub struct NoUnusedPublicDeclarations;

fn is_entry_point(name: &str) -> bool {
    name == "main"
        || name == "init"
        || TEST_PREFIXES.iter().any(|p| name.starts_with(p))
}

impl Analyzer for NoUnusedPublicDeclarations {
    fn name(&self) -> &'static str {
        "no unused public declarations"
    }

    fn category(&self) -> Category {
        Category::UnusedPublic
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut qualified: HashSet<(&str, &str)> = HashSet::new();
        let mut members: HashSet<(&str, &str)> = HashSet::new();

        for package in artifact.packages(false) {
            for use_ref in package.uses() {
                match &use_ref.site.target {
                    UseTarget::Qualified(r) if r.package != use_ref.from_package => {
                        qualified.insert((r.package.as_str(), r.name.as_str()));
                    }
                    UseTarget::Member(name) => {
                        members.insert((use_ref.from_package, name.as_str()));
                    }
                    _ => {}
                }
            }
        }

        let interface_methods: HashSet<&str> = artifact
            .packages(false)
            .into_iter()
            .flat_map(|p| p.types())
            .filter(|t| t.is_interface())
            .flat_map(|t| t.methods())
            .map(|m| m.name())
            .collect();

        let used_elsewhere = |package: &str, name: &str| {
            members
                .iter()
                .any(|(from, member)| *member == name && *from != package)
        };

        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for ty in package.types() {
                if ty.is_exported() && !qualified.contains(&(package.id(), ty.name())) {
                    messages.push(format!(
                        "exported type {} is not used outside its package",
                        ty.describe()
                    ));
                }
                if ty.is_interface() {
                    continue;
                }
                for method in ty.methods() {
                    let name = method.name();
                    if method.is_exported()
                        && !used_elsewhere(package.id(), name)
                        && !interface_methods.contains(name)
                        && !IMPLICIT_METHODS.contains(&name)
                    {
                        messages.push(format!(
                            "exported method {} is not used outside its package",
                            method.describe()
                        ));
                    }
                }
            }
            for function in package.functions() {
                let name = function.name();
                if function.is_exported()
                    && !is_entry_point(name)
                    && !qualified.contains(&(package.id(), name))
                {
                    messages.push(format!(
                        "exported function {} is not used outside its package",
                        function.describe()
                    ));
                }
            }
        }
        Ok(messages)
    }
}
