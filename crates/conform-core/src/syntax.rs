//! Per-file syntax summaries produced by a language front-end.
//!
//! The model never holds parser trees. Everything the analyzers need from
//! a source file is extracted once into a [`FileSyntax`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Structural shape of a type, as far as the analyzers need it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeShape {
    /// A built-in basic type such as `int` or `string`.
    Basic(String),
    /// A named (defined) type. `error` is named with an empty package.
    Named { package: String, name: String },
    Pointer(Box<TypeShape>),
    /// Slices, maps, channels, function signatures, anonymous structs.
    Composite(String),
    Unknown,
}

impl TypeShape {
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeShape::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn error() -> Self {
        TypeShape::named("", "error")
    }

    pub fn pointer(inner: TypeShape) -> Self {
        TypeShape::Pointer(Box::new(inner))
    }

    pub fn is_known(&self) -> bool {
        match self {
            TypeShape::Unknown => false,
            TypeShape::Pointer(inner) => inner.is_known(),
            _ => true,
        }
    }

    /// Strips at most one level of pointer indirection.
    pub fn deref_once(&self) -> &TypeShape {
        match self {
            TypeShape::Pointer(inner) => inner,
            other => other,
        }
    }

    /// True for types declared in the universe scope (basic types and `error`).
    pub fn is_builtin(&self) -> bool {
        match self {
            TypeShape::Basic(_) => true,
            TypeShape::Named { package, .. } => package.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Basic(name) => f.write_str(name),
            TypeShape::Named { package, name } if package.is_empty() => f.write_str(name),
            TypeShape::Named { package, name } => write!(f, "{package}.{name}"),
            TypeShape::Pointer(inner) => write!(f, "*{inner}"),
            TypeShape::Composite(text) => f.write_str(text),
            TypeShape::Unknown => f.write_str("<unknown>"),
        }
    }
}

/// Reference to a package-level object by package ID and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub package: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// An expression whose type was inferred syntactically.
///
/// When the shape cannot be read off the expression itself, `origin` names
/// the object (function, variable, constant, or type) it comes from so the
/// artifact can resolve it once every package is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredType {
    pub shape: TypeShape,
    pub origin: Option<ObjectRef>,
}

impl InferredType {
    pub fn known(shape: TypeShape) -> Self {
        Self {
            shape,
            origin: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            shape: TypeShape::Unknown,
            origin: None,
        }
    }

    pub fn from_origin(origin: ObjectRef) -> Self {
        Self {
            shape: TypeShape::Unknown,
            origin: Some(origin),
        }
    }
}

/// An import spec: optional alias and the imported package path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
    pub line: usize,
}

impl ImportSpec {
    /// Name the import is referred to by inside the file.
    ///
    /// Without an alias this is the conventional package name: the last
    /// path segment, skipping a major-version suffix (`/v2`, `.v3`) and a
    /// `go-` prefix.
    pub fn local_name(&self) -> &str {
        if let Some(alias) = self.alias.as_deref() {
            return alias;
        }
        let mut segments = self.path.rsplit('/');
        let mut last = segments.next().unwrap_or(&self.path);
        if is_major_version(last) {
            last = segments.next().unwrap_or(last);
        }
        if let Some((base, version)) = last.rsplit_once('.') {
            if is_major_version(version) {
                last = base;
            }
        }
        last.strip_prefix("go-").unwrap_or(last)
    }
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Kind of a top-level declaration, in the canonical file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Import,
    Const,
    Var,
    Type,
    Func,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Import => write!(f, "import"),
            DeclKind::Const => write!(f, "const"),
            DeclKind::Var => write!(f, "var"),
            DeclKind::Type => write!(f, "type"),
            DeclKind::Func => write!(f, "func"),
        }
    }
}

/// A top-level declaration in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    /// Number of specs (names for const/var blocks count per spec line).
    pub specs: usize,
    pub parenthesized: bool,
    /// Carries a `//go:embed` or `//go:linkname` directive.
    pub exempt: bool,
    pub line: usize,
}

/// A package-level constant or variable spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub name: String,
    pub ty: InferredType,
    pub line: usize,
}

/// One parameter or result of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: Option<String>,
    /// Canonical type string: package-qualified by import path.
    pub type_string: String,
    pub shape: TypeShape,
}

impl Param {
    pub fn new(name: Option<&str>, type_string: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.map(str::to_string),
            type_string: type_string.into(),
            shape,
        }
    }
}

/// A function or method declaration (or an interface method element).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Base type name of the receiver, without pointer or type arguments.
    pub receiver: Option<String>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub line: usize,
}

/// Underlying kind of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Interface,
    Struct,
    /// A function signature type, e.g. `type Handler func(string) error`.
    Signature,
    /// A defined type over another type, carrying the canonical underlying text.
    Named(String),
    /// An alias declaration `type A = B`.
    Alias(String),
}

/// A type declaration with its syntactic members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// Method elements declared directly in an interface body.
    pub interface_methods: Vec<FunctionDecl>,
    /// Embedded interfaces or embedded struct fields.
    pub embedded: Vec<ObjectRef>,
    pub line: usize,
}

/// What a use-site refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseTarget {
    /// An unqualified identifier, resolved within the using package.
    Local(String),
    /// An import-qualified reference such as `pkg.Name`.
    Qualified(ObjectRef),
    /// A selector on a value (`x.Method`), whose receiver type is unknown.
    Member(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseSite {
    pub target: UseTarget,
    pub line: usize,
}

/// A string literal referenced from the file, e.g. an I/O path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLiteral {
    pub value: String,
    pub line: usize,
}

/// Key argument of a context value-binding call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextKey {
    pub key: InferredType,
    pub text: String,
    pub line: usize,
}

/// Everything extracted from a single source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSyntax {
    pub path: PathBuf,
    pub package_name: String,
    pub imports: Vec<ImportSpec>,
    pub declarations: Vec<Declaration>,
    pub constants: Vec<ValueSpec>,
    pub variables: Vec<ValueSpec>,
    /// Package-level functions and methods; `init` functions are excluded.
    pub functions: Vec<FunctionDecl>,
    pub types: Vec<TypeDecl>,
    /// Lines of `init` functions without receiver.
    pub init_functions: Vec<usize>,
    pub uses: Vec<UseSite>,
    pub io_paths: Vec<PathLiteral>,
    pub embed_patterns: Vec<PathLiteral>,
    pub context_keys: Vec<ContextKey>,
    pub has_errors: bool,
}

impl FileSyntax {
    /// Import paths of the file, in declaration order.
    pub fn import_paths(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|i| i.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_display() {
        assert_eq!(TypeShape::Basic("int".into()).to_string(), "int");
        assert_eq!(TypeShape::error().to_string(), "error");
        assert_eq!(
            TypeShape::pointer(TypeShape::named("example.com/app/model", "User")).to_string(),
            "*example.com/app/model.User"
        );
    }

    #[test]
    fn test_deref_once_strips_single_level() {
        let inner = TypeShape::named("p", "T");
        let double = TypeShape::pointer(TypeShape::pointer(inner.clone()));
        assert_eq!(
            double.deref_once(),
            &TypeShape::pointer(inner.clone())
        );
        assert_eq!(inner.deref_once(), &inner);
    }

    #[test]
    fn test_builtin_shapes() {
        assert!(TypeShape::Basic("string".into()).is_builtin());
        assert!(TypeShape::error().is_builtin());
        assert!(!TypeShape::named("p", "key").is_builtin());
        assert!(!TypeShape::pointer(TypeShape::Unknown).is_known());
    }

    #[test]
    fn test_import_local_name() {
        let plain = ImportSpec {
            alias: None,
            path: "github.com/acme/app/internal/store".into(),
            line: 3,
        };
        assert_eq!(plain.local_name(), "store");

        let aliased = ImportSpec {
            alias: Some("st".into()),
            ..plain
        };
        assert_eq!(aliased.local_name(), "st");
    }

    #[test]
    fn test_import_local_name_skips_versions() {
        let spec = |path: &str| ImportSpec {
            alias: None,
            path: path.into(),
            line: 1,
        };
        assert_eq!(spec("github.com/acme/lib/v2").local_name(), "lib");
        assert_eq!(spec("gopkg.in/yaml.v3").local_name(), "yaml");
        assert_eq!(spec("github.com/acme/go-cache").local_name(), "cache");
    }
}
