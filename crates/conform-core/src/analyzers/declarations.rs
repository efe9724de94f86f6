use anyhow::Result;

use super::{base_name, display_path};
use crate::model::{Artifact, Entity};
use crate::pattern::{is_exported, is_snake_case};
use crate::rule::Analyzer;
use crate::syntax::{DeclKind, TypeShape};
use crate::types::Category;

/// A package's constants must live in a single file.
pub struct ConstantsShouldBeConsolidated;

impl Analyzer for ConstantsShouldBeConsolidated {
    fn name(&self) -> &'static str {
        "constants should be consolidated"
    }

    fn category(&self) -> Category {
        Category::Package
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            let files = package.constant_files();
            if files.len() > 1 {
                let names: Vec<String> = files.iter().map(|f| base_name(f)).collect();
                messages.push(format!(
                    "package {} declares constants in multiple files [{}]",
                    package.id(),
                    names.join(", ")
                ));
            }
        }
        Ok(messages)
    }
}

/// A package-level variable must be used in the file that declares it.
pub struct VariablesShouldBeUsedInDefiningFile;

impl Analyzer for VariablesShouldBeUsedInDefiningFile {
    fn name(&self) -> &'static str {
        "variables should be used in defining file"
    }

    fn category(&self) -> Category {
        Category::Variable
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for variable in package.variables_not_used_in_defining_file() {
                messages.push(format!(
                    "variable {} is not used in its defining file {}",
                    variable.describe(),
                    base_name(variable.file())
                ));
            }
        }
        Ok(messages)
    }
}

/// Exported package-level variables must not be re-assignable from other packages.
///
/// A variable passes only when its type, after one level of pointer
/// indirection, is a named type with an unexported name (the usual shape of
/// private context keys and sentinel errors). Variables whose type cannot be
/// inferred are skipped.
pub struct NoPublicReAssignableVariables;

impl Analyzer for NoPublicReAssignableVariables {
    fn name(&self) -> &'static str {
        "no public re-assignable variables"
    }

    fn category(&self) -> Category {
        Category::Variable
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for variable in artifact.variables() {
            if !variable.is_exported() {
                continue;
            }
            let shape = artifact.resolve(variable.inferred_type());
            let reassignable = match shape.deref_once() {
                TypeShape::Unknown => continue,
                TypeShape::Named { name, .. } => is_exported(name),
                _ => true,
            };
            if reassignable {
                messages.push(format!(
                    "exported variable {} of type {shape} can be re-assigned",
                    variable.describe()
                ));
            }
        }
        Ok(messages)
    }
}

/// Top-level declarations must be ordered imports, constants, variables, then
/// types and functions, with one constant block and one variable block.
///
/// Declarations carrying a `//go:embed` or `//go:linkname` directive are
/// ignored. Only the first problem of each file is reported.
pub struct ConstantsAndVariablesShouldBeGrouped;

fn rank(kind: DeclKind) -> u8 {
    match kind {
        DeclKind::Import => 0,
        DeclKind::Const => 1,
        DeclKind::Var => 2,
        DeclKind::Type | DeclKind::Func => 3,
    }
}

impl Analyzer for ConstantsAndVariablesShouldBeGrouped {
    fn name(&self) -> &'static str {
        "constants and variables should be grouped"
    }

    fn category(&self) -> Category {
        Category::File
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for syntax in package.syntax() {
                if package.is_test_file(&syntax.path) {
                    continue;
                }
                let file = display_path(artifact, &syntax.path);
                let mut current = DeclKind::Import;
                let mut consts = 0usize;
                let mut vars = 0usize;

                for decl in syntax.declarations.iter().filter(|d| !d.exempt) {
                    let problem = if rank(decl.kind) < rank(current) {
                        Some(format!(
                            "{file}:{}: {} declaration should come before {} declarations",
                            decl.line, decl.kind, current
                        ))
                    } else {
                        current = decl.kind;
                        let seen = match decl.kind {
                            DeclKind::Const => Some(&mut consts),
                            DeclKind::Var => Some(&mut vars),
                            _ => None,
                        };
                        match seen {
                            Some(count) => {
                                *count += 1;
                                if *count > 1 {
                                    Some(format!(
                                        "{file}:{}: {} declarations should be grouped in a single block",
                                        decl.line, decl.kind
                                    ))
                                } else if decl.specs == 1 && decl.parenthesized {
                                    Some(format!(
                                        "{file}:{}: single {} declaration should not be parenthesized",
                                        decl.line, decl.kind
                                    ))
                                } else {
                                    None
                                }
                            }
                            None => None,
                        }
                    };
                    if let Some(message) = problem {
                        messages.push(message);
                        break;
                    }
                }
            }
        }
        Ok(messages)
    }
}

/// Constant and variable names must not contain underscores.
pub struct VariablesAndConstantsShouldUseMixedCaps;

impl Analyzer for VariablesAndConstantsShouldUseMixedCaps {
    fn name(&self) -> &'static str {
        "variables and constants should use MixedCaps"
    }

    fn category(&self) -> Category {
        Category::Naming
    }

    fn analyze(&self, artifact: &Artifact) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for package in artifact.packages(true) {
            for constant in package.constants() {
                if is_snake_case(constant.name()) {
                    messages.push(format!(
                        "constant {} should use MixedCaps",
                        constant.qualified_name()
                    ));
                }
            }
            for variable in package.variables() {
                if is_snake_case(variable.name()) {
                    messages.push(format!(
                        "variable {} should use MixedCaps",
                        variable.describe()
                    ));
                }
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::syntax::{Declaration, InferredType, ObjectRef, TypeKind, UseSite, UseTarget};

    fn decl(kind: DeclKind, specs: usize, parenthesized: bool, line: usize) -> Declaration {
        Declaration {
            kind,
            specs,
            parenthesized,
            exempt: false,
            line,
        }
    }

    #[test]
    fn test_constants_in_two_files() {
        let mut a = file("cfg", "a.go");
        constant(&mut a, "A", 3);
        let mut b = file("cfg", "b.go");
        constant(&mut b, "B", 3);
        let messages = ConstantsShouldBeConsolidated
            .analyze(&artifact(vec![package("cfg", vec![a, b])]))
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("a.go"));
        assert!(messages[0].contains("b.go"));
    }

    #[test]
    fn test_constants_in_one_file_pass() {
        let mut a = file("cfg", "a.go");
        constant(&mut a, "A", 3);
        constant(&mut a, "B", 4);
        let messages = ConstantsShouldBeConsolidated
            .analyze(&artifact(vec![package("cfg", vec![a, file("cfg", "b.go")])]))
            .unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_variable_used_only_elsewhere() {
        let mut a = file("store", "a.go");
        variable(&mut a, "cache", InferredType::unknown(), 3);
        let mut b = file("store", "b.go");
        b.uses.push(UseSite {
            target: UseTarget::Local("cache".into()),
            line: 9,
        });
        let messages = VariablesShouldBeUsedInDefiningFile
            .analyze(&artifact(vec![package("store", vec![a, b])]))
            .unwrap();
        assert_eq!(
            messages,
            vec!["variable example.com/app/store.cache is not used in its defining file a.go"]
        );
    }

    #[test]
    fn test_public_reassignable_variables() {
        let pkg = format!("{MODULE}/keys");
        let mut f = file("keys", "keys.go");
        f.types.push(type_decl("k", TypeKind::Struct));
        f.types.push(type_decl("Config", TypeKind::Struct));
        variable(&mut f, "X", InferredType::known(TypeShape::Basic("int".into())), 3);
        variable(
            &mut f,
            "Key",
            InferredType::from_origin(ObjectRef::new(&pkg, "k")),
            4,
        );
        variable(&mut f, "ErrMissing", InferredType::known(TypeShape::error()), 5);
        variable(
            &mut f,
            "Default",
            InferredType::known(TypeShape::pointer(TypeShape::named(&pkg, "Config"))),
            6,
        );
        variable(&mut f, "Unknown", InferredType::unknown(), 7);
        variable(&mut f, "local", InferredType::known(TypeShape::Basic("int".into())), 8);

        let messages = NoPublicReAssignableVariables
            .analyze(&artifact(vec![package("keys", vec![f])]))
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("keys.X of type int"));
        assert!(messages[1].contains("keys.Default"));
    }

    fn grouped(decls: Vec<Declaration>) -> Vec<String> {
        let mut f = file("app", "app.go");
        f.declarations = decls;
        ConstantsAndVariablesShouldBeGrouped
            .analyze(&artifact(vec![package("app", vec![f])]))
            .unwrap()
    }

    #[test]
    fn test_grouping_accepts_canonical_order() {
        let messages = grouped(vec![
            decl(DeclKind::Import, 2, true, 3),
            decl(DeclKind::Const, 2, true, 8),
            decl(DeclKind::Var, 1, false, 13),
            decl(DeclKind::Type, 1, false, 15),
            decl(DeclKind::Func, 1, false, 20),
            decl(DeclKind::Type, 1, false, 30),
        ]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_grouping_flags_order() {
        let messages = grouped(vec![
            decl(DeclKind::Var, 1, false, 3),
            decl(DeclKind::Const, 1, false, 5),
            decl(DeclKind::Const, 1, false, 7),
        ]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with(":5: const declaration should come before var declarations"));
    }

    #[test]
    fn test_grouping_flags_split_blocks_and_parentheses() {
        let split = grouped(vec![
            decl(DeclKind::Const, 1, false, 3),
            decl(DeclKind::Const, 1, false, 4),
        ]);
        assert!(split[0].contains("should be grouped in a single block"));

        let parens = grouped(vec![decl(DeclKind::Var, 1, true, 3)]);
        assert!(parens[0].contains("should not be parenthesized"));
    }

    #[test]
    fn test_grouping_skips_exempt_declarations() {
        let mut embed = decl(DeclKind::Var, 1, false, 3);
        embed.exempt = true;
        let messages = grouped(vec![
            decl(DeclKind::Func, 1, false, 1),
            embed,
        ]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_mixed_caps() {
        let mut f = file("app", "app.go");
        constant(&mut f, "max_size", 3);
        constant(&mut f, "MaxSize", 4);
        variable(&mut f, "_", InferredType::unknown(), 5);
        variable(&mut f, "user_name", InferredType::unknown(), 6);
        let messages = VariablesAndConstantsShouldUseMixedCaps
            .analyze(&artifact(vec![package("app", vec![f])]))
            .unwrap();
        assert_eq!(
            messages,
            vec![
                "constant example.com/app/app.max_size should use MixedCaps",
                "variable example.com/app/app.user_name should use MixedCaps",
            ]
        );
    }
}
