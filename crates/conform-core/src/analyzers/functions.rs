use anyhow::Result;

use super::{base_name, display_path, CONTEXT_TYPE};
use crate::model::{Artifact, Entity, Function, Package};
use crate::pattern::is_exported;
use crate::rule::Analyzer;
use crate::syntax::TypeShape;
use crate::types::Category;

/// Package-level functions followed by the methods of each type.
fn functions_and_methods(package: &Package) -> impl Iterator<Item = &Function> {
    package
        .functions()
        .iter()
        .chain(package.types().iter().flat_map(|t| t.methods()))
}

/// A package may declare at most one `init` function.
///
/// Functions are counted, not files: two `init` functions in the same file
/// are a violation too. Test files are ignored.
pub struct AtMostOneInitFuncPerPackage;

impl Analyzer for AtMostOneInitFuncPerPackage {
    fn name(&self) -> &'static str {
        "at most one init function per package"
    }

    fn category(&self) -> Category {
        Category::Function
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            let inits = package.init_functions();
            if inits.len() > 1 {
                let files: Vec<String> = package
                    .init_function_files()
                    .iter()
                    .map(|f| base_name(f))
                    .collect();
                messages.push(format!(
                    "package {} declares {} init functions in [{}]",
                    package.id(),
                    inits.len(),
                    files.join(", ")
                ));
            }
        }
        Ok(messages)
    }
}

pub struct ErrorShouldBeLastReturn;

impl Analyzer for ErrorShouldBeLastReturn {
    fn name(&self) -> &'static str {
        "error should be the last return value"
    }

    fn category(&self) -> Category {
        Category::Function
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for function in functions_and_methods(package) {
                let results = function.results();
                let misplaced = results
                    .iter()
                    .enumerate()
                    .any(|(i, r)| r.type_string == "error" && i != results.len() - 1);
                if misplaced {
                    messages.push(format!(
                        "function {} should return error as its last value",
                        function.describe()
                    ));
                }
            }
        }
        Ok(messages)
    }
}

pub struct ContextShouldBeFirstParam;

impl Analyzer for ContextShouldBeFirstParam {
    fn name(&self) -> &'static str {
        "context should be the first parameter"
    }

    fn category(&self) -> Category {
        Category::Context
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for function in functions_and_methods(package) {
                let misplaced = function
                    .params()
                    .iter()
                    .enumerate()
                    .any(|(i, p)| p.type_string == CONTEXT_TYPE && i != 0);
                if misplaced {
                    messages.push(format!(
                        "function {} should take {CONTEXT_TYPE} as its first parameter",
                        function.describe()
                    ));
                }
            }
        }
        Ok(messages)
    }
}

/// Keys passed to `context.WithValue` must have an unexported named type.
///
/// Built-in types, unnamed composite types, and exported named types are
/// reported. Keys whose type cannot be inferred are skipped.
pub struct ContextKeysShouldBePrivateType;

impl Analyzer for ContextKeysShouldBePrivateType {
    fn name(&self) -> &'static str {
        "context keys should be of a private type"
    }

    fn category(&self) -> Category {
        Category::Context
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for syntax in package.syntax() {
                for key in &syntax.context_keys {
                    let shape = artifact.resolve(&key.key);
                    let public = match shape.deref_once() {
                        TypeShape::Unknown => continue,
                        s if s.is_builtin() => true,
                        TypeShape::Named { name, .. } => is_exported(name),
                        _ => true,
                    };
                    if public {
                        messages.push(format!(
                            "{}:{}: context key {} should be of an unexported type, not {shape}",
                            display_path(artifact, &syntax.path),
                            key.line,
                            key.text
                        ));
                    }
                }
            }
        }
        Ok(messages)
    }
}
