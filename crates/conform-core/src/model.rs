//! The immutable program model.
//!
//! All cross-entity relationships are stable string identifiers (package IDs
//! and qualified names). The [`Artifact`] owns every entity; selections and
//! rules only borrow.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::frontend::{is_in_module, PackageMeta};
use crate::pattern;
use crate::syntax::{
    FileSyntax, FunctionDecl, InferredType, ObjectRef, Param, TypeDecl, TypeKind, TypeShape,
    UseSite, UseTarget,
};
use crate::types::{Category, SourceLocation};

/// Something a selection can hold and a rule can report on.
pub trait Entity: Send + Sync {
    /// Category violations about this kind of entity are reported under.
    const CATEGORY: Category;

    /// Short name used by name matchers.
    fn name(&self) -> &str;

    /// ID of the package the entity belongs to.
    fn package_id(&self) -> &str;

    /// Description used in violation messages.
    fn describe(&self) -> String;
}

/// Errors resolving a type by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("type name '{0}' must be of the form 'package.Type'")]
    Malformed(String),
    #[error("type '{0}' not found")]
    NotFound(String),
    #[error("type '{name}' is ambiguous: {}", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

/// A source file of a loaded package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub(crate) path: PathBuf,
    pub(crate) base_name: String,
    pub(crate) package: String,
    pub(crate) is_test: bool,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>, is_test: bool) -> Self {
        let path = path.into();
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            base_name,
            package: package.into(),
            is_test,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn package_path(&self) -> &str {
        &self.package
    }

    pub fn is_test(&self) -> bool {
        self.is_test
    }
}

impl Entity for File {
    const CATEGORY: Category = Category::File;

    fn name(&self) -> &str {
        &self.base_name
    }

    fn package_id(&self) -> &str {
        &self.package
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A package-level constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) file: PathBuf,
    pub(crate) ty: InferredType,
    pub(crate) line: usize,
}

impl Constant {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_path(&self) -> &str {
        &self.package
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn inferred_type(&self) -> &InferredType {
        &self.ty
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// A package-level variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) file: PathBuf,
    pub(crate) ty: InferredType,
    pub(crate) line: usize,
}

impl Variable {
    pub fn package_path(&self) -> &str {
        &self.package
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Syntactically inferred type; see [`Artifact::resolve`] for the
    /// cross-package resolution.
    pub fn inferred_type(&self) -> &InferredType {
        &self.ty
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_exported(&self) -> bool {
        pattern::is_exported(&self.name)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

impl Entity for Variable {
    const CATEGORY: Category = Category::Variable;

    fn name(&self) -> &str {
        &self.name
    }

    fn package_id(&self) -> &str {
        &self.package
    }

    fn describe(&self) -> String {
        self.qualified_name()
    }
}

/// A function, or a method when `receiver` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) file: PathBuf,
    pub(crate) receiver: Option<String>,
    pub(crate) params: Vec<Param>,
    pub(crate) results: Vec<Param>,
    pub(crate) line: usize,
}

impl Function {
    fn from_decl(decl: FunctionDecl, package: &str, file: &Path) -> Self {
        Self {
            name: decl.name,
            package: package.to_string(),
            file: file.to_path_buf(),
            receiver: decl.receiver,
            params: decl.params,
            results: decl.results,
            line: decl.line,
        }
    }

    pub fn package_path(&self) -> &str {
        &self.package
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn results(&self) -> &[Param] {
        &self.results
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn is_exported(&self) -> bool {
        pattern::is_exported(&self.name)
    }

    /// Receiver-qualified when the function is a method.
    pub fn qualified_name(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}.{}", self.package, recv, self.name),
            None => format!("{}.{}", self.package, self.name),
        }
    }

    /// Canonical signature without parameter names, e.g. `func(string, int) (T, error)`.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.type_string.as_str()).collect();
        let mut sig = format!("func({})", params.join(", "));
        match self.results.as_slice() {
            [] => {}
            [single] => {
                sig.push(' ');
                sig.push_str(&single.type_string);
            }
            many => {
                let results: Vec<&str> = many.iter().map(|p| p.type_string.as_str()).collect();
                sig.push_str(&format!(" ({})", results.join(", ")));
            }
        }
        sig
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
        }
    }
}

impl Entity for Function {
    const CATEGORY: Category = Category::Function;

    fn name(&self) -> &str {
        &self.name
    }

    fn package_id(&self) -> &str {
        &self.package
    }

    fn describe(&self) -> String {
        self.qualified_name()
    }
}

/// A declared type with its methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Type {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) file: PathBuf,
    pub(crate) kind: TypeKind,
    pub(crate) methods: Vec<Function>,
    pub(crate) embedded: Vec<ObjectRef>,
    pub(crate) line: usize,
}

impl Type {
    fn from_decl(decl: TypeDecl, package: &str, file: &Path) -> Self {
        let methods = decl
            .interface_methods
            .into_iter()
            .map(|mut m| {
                m.receiver = Some(decl.name.clone());
                Function::from_decl(m, package, file)
            })
            .collect();
        Self {
            name: decl.name,
            package: package.to_string(),
            file: file.to_path_buf(),
            kind: decl.kind,
            methods,
            embedded: decl.embedded,
            line: decl.line,
        }
    }

    pub fn package_path(&self) -> &str {
        &self.package
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Declared methods (for interfaces, the method elements of the body).
    pub fn methods(&self) -> &[Function] {
        &self.methods
    }

    pub fn embedded(&self) -> &[ObjectRef] {
        &self.embedded
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    pub fn is_exported(&self) -> bool {
        pattern::is_exported(&self.name)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(&self.package, &self.name)
    }
}

impl Entity for Type {
    const CATEGORY: Category = Category::Type;

    fn name(&self) -> &str {
        &self.name
    }

    fn package_id(&self) -> &str {
        &self.package
    }

    fn describe(&self) -> String {
        self.qualified_name()
    }
}

/// A top-level object of a package scope.
#[derive(Debug, Clone, Copy)]
pub enum ScopeObject<'a> {
    Constant(&'a Constant),
    Variable(&'a Variable),
    Function(&'a Function),
    Type(&'a Type),
}

impl ScopeObject<'_> {
    pub fn name(&self) -> &str {
        match self {
            ScopeObject::Constant(c) => &c.name,
            ScopeObject::Variable(v) => &v.name,
            ScopeObject::Function(f) => &f.name,
            ScopeObject::Type(t) => &t.name,
        }
    }

    pub fn file(&self) -> &Path {
        match self {
            ScopeObject::Constant(c) => &c.file,
            ScopeObject::Variable(v) => &v.file,
            ScopeObject::Function(f) => &f.file,
            ScopeObject::Type(t) => &t.file,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ScopeObject::Constant(c) => c.line,
            ScopeObject::Variable(v) => v.line,
            ScopeObject::Function(f) => f.line,
            ScopeObject::Type(t) => t.line,
        }
    }
}

/// A use-site together with the package and file it occurs in.
#[derive(Debug, Clone, Copy)]
pub struct UseRef<'a> {
    /// ID of the using package; external test files use `<id>_test`.
    pub from_package: &'a str,
    pub file: &'a Path,
    pub site: &'a UseSite,
}

/// A loaded package.
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) dir: PathBuf,
    pub(crate) files: Vec<File>,
    pub(crate) imports: Vec<String>,
    pub(crate) test_imports: Vec<String>,
    pub(crate) application: bool,
    pub(crate) standard: bool,
    pub(crate) constants: Vec<Constant>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) functions: Vec<Function>,
    pub(crate) types: Vec<Type>,
    #[serde(skip)]
    pub(crate) syntax: Vec<FileSyntax>,
    #[serde(skip)]
    pub(crate) external_test_id: String,
}

impl Package {
    /// Build a package from its metadata and the syntax of its files.
    ///
    /// Declarations from test files are not part of the package scope; test
    /// files contribute use-sites and test-data references only. Methods are
    /// attached to their receiver types.
    pub fn from_syntax(meta: &PackageMeta, syntax: Vec<FileSyntax>, application: bool) -> Self {
        let test_set: HashSet<&Path> = meta.test_files.iter().map(PathBuf::as_path).collect();

        let mut files: Vec<File> = meta
            .files
            .iter()
            .map(|p| File::new(p, &meta.id, false))
            .chain(meta.test_files.iter().map(|p| File::new(p, &meta.id, true)))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut constants = Vec::new();
        let mut variables = Vec::new();
        let mut functions = Vec::new();
        let mut types: Vec<Type> = Vec::new();
        let mut methods = Vec::new();
        let mut imports: BTreeSet<String> = meta.imports.iter().cloned().collect();
        let mut test_imports: BTreeSet<String> = meta.test_imports.iter().cloned().collect();
        let mut declared_name = meta.name.clone();

        for file in &syntax {
            if test_set.contains(file.path.as_path()) {
                test_imports.extend(file.import_paths().map(str::to_string));
                continue;
            }
            if declared_name.is_empty() {
                declared_name = file.package_name.clone();
            }
            imports.extend(file.import_paths().map(str::to_string));

            for c in &file.constants {
                constants.push(Constant {
                    name: c.name.clone(),
                    package: meta.id.clone(),
                    file: file.path.clone(),
                    ty: c.ty.clone(),
                    line: c.line,
                });
            }
            for v in &file.variables {
                variables.push(Variable {
                    name: v.name.clone(),
                    package: meta.id.clone(),
                    file: file.path.clone(),
                    ty: v.ty.clone(),
                    line: v.line,
                });
            }
            for f in &file.functions {
                let function = Function::from_decl(f.clone(), &meta.id, &file.path);
                if function.is_method() {
                    methods.push(function);
                } else {
                    functions.push(function);
                }
            }
            for t in &file.types {
                types.push(Type::from_decl(t.clone(), &meta.id, &file.path));
            }
        }

        for method in methods {
            let receiver = method.receiver.as_deref().unwrap_or_default();
            match types.iter_mut().find(|t| t.name == receiver) {
                Some(ty) => ty.methods.push(method),
                None => tracing::debug!(
                    package = %meta.id,
                    method = %method.name,
                    "method receiver type not declared in package"
                ),
            }
        }

        imports.remove(&meta.id);
        test_imports.remove(&meta.id);
        let test_imports: Vec<String> = test_imports
            .into_iter()
            .filter(|i| !imports.contains(i))
            .collect();

        if declared_name.is_empty() {
            declared_name = meta.id.rsplit('/').next().unwrap_or(&meta.id).to_string();
        }

        Self {
            id: meta.id.clone(),
            name: declared_name,
            dir: meta.dir.clone(),
            files,
            imports: imports.into_iter().collect(),
            test_imports,
            application,
            standard: meta.standard,
            constants,
            variables,
            functions,
            types,
            syntax,
            external_test_id: format!("{}_test", meta.id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared package name.
    pub fn declared_name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn go_files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    pub fn source_files(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| !f.is_test)
    }

    pub fn test_files(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| f.is_test)
    }

    /// Imported package IDs of the non-test files.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn test_imports(&self) -> &[String] {
        &self.test_imports
    }

    pub fn is_application(&self) -> bool {
        self.application
    }

    pub fn is_standard(&self) -> bool {
        self.standard
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn syntax(&self) -> &[FileSyntax] {
        &self.syntax
    }

    pub fn syntax_for(&self, path: &Path) -> Option<&FileSyntax> {
        self.syntax.iter().find(|s| s.path == path)
    }

    pub fn is_test_file(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path && f.is_test)
    }

    /// Top-level objects ordered by file and line.
    pub fn scope(&self) -> Vec<ScopeObject<'_>> {
        let mut scope: Vec<ScopeObject<'_>> = self
            .constants
            .iter()
            .map(ScopeObject::Constant)
            .chain(self.variables.iter().map(ScopeObject::Variable))
            .chain(self.functions.iter().map(ScopeObject::Function))
            .chain(self.types.iter().map(ScopeObject::Type))
            .collect();
        scope.sort_by(|a, b| a.file().cmp(b.file()).then(a.line().cmp(&b.line())));
        scope
    }

    pub fn lookup(&self, name: &str) -> Option<ScopeObject<'_>> {
        self.scope().into_iter().find(|o| o.name() == name)
    }

    pub fn find_type(&self, name: &str) -> Option<&Type> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Files declaring at least one constant, deduplicated, in file order.
    pub fn constant_files(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        let mut out: Vec<&Path> = self
            .constants
            .iter()
            .map(|c| c.file.as_path())
            .filter(|f| seen.insert(*f))
            .collect();
        out.sort();
        out
    }

    /// Locations of `init` functions (no receiver) in non-test files.
    pub fn init_functions(&self) -> Vec<SourceLocation> {
        self.syntax
            .iter()
            .filter(|s| !self.is_test_file(&s.path))
            .flat_map(|s| {
                s.init_functions.iter().map(|line| SourceLocation {
                    file: s.path.clone(),
                    line: *line,
                })
            })
            .collect()
    }

    /// Files containing an `init` function, deduplicated.
    pub fn init_function_files(&self) -> Vec<&Path> {
        let mut out: Vec<&Path> = self
            .syntax
            .iter()
            .filter(|s| !s.init_functions.is_empty() && !self.is_test_file(&s.path))
            .map(|s| s.path.as_path())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Package-level variables never referenced from their own source file.
    pub fn variables_not_used_in_defining_file(&self) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|v| {
                let Some(syntax) = self.syntax_for(&v.file) else {
                    return false;
                };
                !syntax
                    .uses
                    .iter()
                    .any(|u| matches!(&u.target, UseTarget::Local(n) if *n == v.name))
            })
            .collect()
    }

    /// Every use-site of every parsed file, tagged with the using package.
    pub fn uses(&self) -> impl Iterator<Item = UseRef<'_>> {
        self.syntax.iter().flat_map(move |s| {
            let from_package = if self.is_test_file(&s.path) && s.package_name.ends_with("_test")
            {
                self.external_test_id.as_str()
            } else {
                self.id.as_str()
            };
            s.uses.iter().map(move |site| UseRef {
                from_package,
                file: s.path.as_path(),
                site,
            })
        })
    }
}

impl Entity for Package {
    const CATEGORY: Category = Category::Package;

    fn name(&self) -> &str {
        &self.name
    }

    fn package_id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> String {
        self.id.clone()
    }
}

/// The loaded, immutable snapshot of a project.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    module: String,
    root: PathBuf,
    packages: BTreeMap<String, Package>,
    load_errors: Vec<String>,
}

impl Artifact {
    pub fn new(
        module: impl Into<String>,
        root: impl Into<PathBuf>,
        packages: impl IntoIterator<Item = Package>,
        load_errors: Vec<String>,
    ) -> Self {
        Self {
            module: module.into(),
            root: root.into(),
            packages: packages.into_iter().map(|p| (p.id.clone(), p)).collect(),
            load_errors,
        }
    }

    /// Module path of the project.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Non-fatal errors collected while parsing the snapshot.
    pub fn load_errors(&self) -> &[String] {
        &self.load_errors
    }

    /// Packages sorted by ID.
    pub fn packages(&self, application_only: bool) -> Vec<&Package> {
        self.packages
            .values()
            .filter(|p| !application_only || p.application)
            .collect()
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    pub fn is_application(&self, id: &str) -> bool {
        is_in_module(&self.module, id)
    }

    /// Package path relative to the module, `""` for the module root package.
    pub fn relative_path<'p>(&self, id: &'p str) -> Option<&'p str> {
        if id == self.module {
            return Some("");
        }
        id.strip_prefix(self.module.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Resolve a type by name.
    ///
    /// A name whose first path segment contains a dot is fully qualified and
    /// must match a package ID exactly. Otherwise the name is resolved inside
    /// the project module, where the package ID must end with the given
    /// sub-path. More than one candidate is an error.
    pub fn type_named(&self, name: &str) -> Result<&Type, LookupError> {
        let (pkg, ty) = name
            .rsplit_once('.')
            .filter(|(p, t)| !p.is_empty() && !t.is_empty() && !t.contains('/'))
            .ok_or_else(|| LookupError::Malformed(name.to_string()))?;

        let first = pkg.split('/').next().unwrap_or(pkg);
        let foreign = first.contains('.');
        let suffix = format!("/{pkg}");

        let candidates: Vec<&Type> = self
            .packages
            .values()
            .filter(|p| {
                if foreign {
                    p.id == pkg
                } else {
                    p.application && (p.id == pkg || p.id.ends_with(&suffix))
                }
            })
            .filter_map(|p| p.find_type(ty))
            .collect();

        match candidates.as_slice() {
            [] => Err(LookupError::NotFound(name.to_string())),
            [single] => Ok(*single),
            many => Err(LookupError::Ambiguous {
                name: name.to_string(),
                candidates: many.iter().map(|t| t.qualified_name()).collect(),
            }),
        }
    }

    pub fn find_type(&self, r: &ObjectRef) -> Option<&Type> {
        self.packages.get(&r.package)?.find_type(&r.name)
    }

    /// Types declared in application packages.
    pub fn types(&self) -> Vec<&Type> {
        self.application_packages().flat_map(|p| &p.types).collect()
    }

    /// Package-level functions of application packages (methods excluded).
    pub fn functions(&self) -> Vec<&Function> {
        self.application_packages()
            .flat_map(|p| &p.functions)
            .collect()
    }

    /// Methods of every type in application packages.
    pub fn methods(&self) -> Vec<&Function> {
        self.application_packages()
            .flat_map(|p| &p.types)
            .flat_map(|t| &t.methods)
            .collect()
    }

    pub fn variables(&self) -> Vec<&Variable> {
        self.application_packages()
            .flat_map(|p| &p.variables)
            .collect()
    }

    pub fn constants(&self) -> Vec<&Constant> {
        self.application_packages()
            .flat_map(|p| &p.constants)
            .collect()
    }

    /// Files of application packages.
    pub fn files(&self) -> Vec<&File> {
        self.application_packages().flat_map(|p| &p.files).collect()
    }

    /// Every source file path across all loaded packages.
    pub fn go_files(&self) -> Vec<&Path> {
        self.packages.values().flat_map(|p| p.go_files()).collect()
    }

    fn application_packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().filter(|p| p.application)
    }

    /// Resolve an inferred type through the object it originates from.
    pub fn resolve(&self, ty: &InferredType) -> TypeShape {
        self.resolve_depth(ty, 0)
    }

    fn resolve_depth(&self, ty: &InferredType, depth: usize) -> TypeShape {
        if ty.shape.is_known() || depth > 4 {
            return ty.shape.clone();
        }
        let Some(origin) = &ty.origin else {
            return ty.shape.clone();
        };
        let Some(pkg) = self.packages.get(&origin.package) else {
            return TypeShape::Unknown;
        };
        match pkg.lookup(&origin.name) {
            Some(ScopeObject::Type(t)) => TypeShape::named(&t.package, &t.name),
            Some(ScopeObject::Function(f)) if f.results.len() == 1 => f.results[0].shape.clone(),
            Some(ScopeObject::Variable(v)) => self.resolve_depth(&v.ty, depth + 1),
            Some(ScopeObject::Constant(c)) => self.resolve_depth(&c.ty, depth + 1),
            _ => TypeShape::Unknown,
        }
    }

    /// Method name to canonical signature, including promoted methods of
    /// embedded types. Both value and pointer receivers count.
    pub fn method_set(&self, ty: &Type) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let mut visited = HashSet::new();
        self.collect_methods(ty, &mut out, &mut visited);
        out
    }

    fn collect_methods(
        &self,
        ty: &Type,
        out: &mut BTreeMap<String, String>,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(ty.qualified_name()) {
            return;
        }
        for m in &ty.methods {
            out.entry(m.name.clone()).or_insert_with(|| m.signature());
        }
        for embedded in &ty.embedded {
            if let Some(inner) = self.find_type(embedded) {
                self.collect_methods(inner, out, visited);
            }
        }
    }

    /// Structural interface satisfaction of `ty` against `iface`.
    pub fn implements(&self, ty: &Type, iface: &Type) -> bool {
        if !iface.is_interface() {
            return false;
        }
        let required = self.method_set(iface);
        let provided = self.method_set(ty);
        required
            .iter()
            .all(|(name, sig)| provided.get(name) == Some(sig))
    }
}
