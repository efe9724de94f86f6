use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator, TreeCursor};

use conform_core::frontend::SourceParser;
use conform_core::syntax::{
    ContextKey, DeclKind, Declaration, FileSyntax, FunctionDecl, ImportSpec, InferredType,
    ObjectRef, Param, PathLiteral, TypeDecl, TypeKind, TypeShape, UseSite, UseTarget, ValueSpec,
};

/// Predeclared type names other than `error`.
const BASIC_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "float32", "float64", "int",
    "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32",
    "uint64", "uintptr",
];

/// Standard-library calls whose string arguments name files on disk.
const IO_CALLS: &[(&str, &str)] = &[
    ("os", "Open"),
    ("os", "OpenFile"),
    ("os", "ReadFile"),
    ("os", "ReadDir"),
    ("os", "Stat"),
    ("os", "Lstat"),
    ("io/ioutil", "ReadFile"),
    ("io/ioutil", "ReadDir"),
];

/// Standard-library constructors returning a bare `error`.
const ERROR_CONSTRUCTORS: &[(&str, &str)] = &[
    ("errors", "New"),
    ("errors", "Join"),
    ("fmt", "Errorf"),
];

/// File-name suffix of Go test files.
pub const TEST_SUFFIX: &str = "_test.go";

const EMBED_DIRECTIVE: &str = "//go:embed";
const LINKNAME_DIRECTIVE: &str = "//go:linkname";

/// Go source parser using tree-sitter.
pub struct GoParser {
    language: Language,
    import_query: Query,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();

        let import_query = Query::new(
            &language,
            r#"
            (import_spec
              path: (_) @path) @spec
            "#,
        )
        .context("failed to compile import query")?;

        Ok(Self {
            language,
            import_query,
        })
    }

    fn extract_imports(&self, root: Node<'_>, source: &str) -> Vec<ImportSpec> {
        let mut cursor = QueryCursor::new();
        let spec_idx = self.import_query.capture_index_for_name("spec");

        let mut imports = Vec::new();
        let mut matches = cursor.matches(&self.import_query, root, source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if Some(capture.index) != spec_idx {
                    continue;
                }
                let spec = capture.node;
                let Some(path) = spec.child_by_field_name("path") else {
                    continue;
                };
                imports.push(ImportSpec {
                    alias: spec
                        .child_by_field_name("name")
                        .map(|n| node_text(n, source).to_string()),
                    path: unquote(node_text(path, source)).to_string(),
                    line: line_of(spec),
                });
            }
        }
        imports
    }
}

impl SourceParser for GoParser {
    fn language(&self) -> &'static str {
        "go"
    }

    fn test_suffix(&self) -> &'static str {
        TEST_SUFFIX
    }

    fn parse(&self, package_id: &str, path: &Path, source: &str) -> Result<FileSyntax> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set Go language")?;
        let tree = parser
            .parse(source, None)
            .context("failed to parse Go file")?;
        let root = tree.root_node();

        let imports = self.extract_imports(root, source);
        let mut syntax = FileSyntax {
            path: path.to_path_buf(),
            has_errors: root.has_error(),
            ..FileSyntax::default()
        };

        {
            let file = FileContext::new(package_id, source, &imports);
            file.top_level(root, &mut syntax);
            let mut cursor = root.walk();
            file.walk(&mut cursor, &mut syntax);
        }

        syntax.imports = imports;
        Ok(syntax)
    }
}

/// Per-file state shared by the extraction passes.
struct FileContext<'a> {
    package_id: &'a str,
    source: &'a str,
    /// Local import name to import path. Blank and dot imports are absent.
    imports: HashMap<&'a str, &'a str>,
}

impl<'a> FileContext<'a> {
    fn new(package_id: &'a str, source: &'a str, imports: &'a [ImportSpec]) -> Self {
        let imports = imports
            .iter()
            .map(|i| (i.local_name(), i.path.as_str()))
            .filter(|(name, _)| *name != "_" && *name != ".")
            .collect();
        Self {
            package_id,
            source,
            imports,
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    // ----- top-level declarations -----

    fn top_level(&self, root: Node<'_>, out: &mut FileSyntax) {
        for node in children(root) {
            match node.kind() {
                "package_clause" => {
                    if let Some(name) = node.named_child(0) {
                        out.package_name = self.text(name).to_string();
                    }
                }
                "import_declaration" => {
                    out.declarations.push(self.declaration(node, DeclKind::Import));
                }
                "const_declaration" => {
                    out.declarations.push(self.declaration(node, DeclKind::Const));
                    self.value_specs(node, "const_spec", &mut out.constants);
                }
                "var_declaration" => {
                    out.declarations.push(self.declaration(node, DeclKind::Var));
                    self.value_specs(node, "var_spec", &mut out.variables);
                }
                "type_declaration" => {
                    out.declarations.push(self.declaration(node, DeclKind::Type));
                    self.type_specs(node, &mut out.types);
                }
                "function_declaration" | "method_declaration" => {
                    out.declarations.push(self.declaration(node, DeclKind::Func));
                    self.function(node, out);
                }
                _ => {}
            }
        }
    }

    fn declaration(&self, node: Node<'_>, kind: DeclKind) -> Declaration {
        let mut specs = 0;
        let mut parenthesized = false;
        if kind == DeclKind::Func {
            specs = 1;
        } else {
            for child in children(node) {
                match child.kind() {
                    "(" => parenthesized = true,
                    "import_spec_list" | "var_spec_list" => {
                        parenthesized = true;
                        specs += named_children(child)
                            .iter()
                            .filter(|c| is_spec(c.kind()))
                            .count();
                    }
                    k if is_spec(k) => specs += 1,
                    _ => {}
                }
            }
        }
        Declaration {
            kind,
            specs,
            parenthesized,
            exempt: self.has_directive(node),
            line: line_of(node),
        }
    }

    /// True when the comment lines directly above `node` carry an embed or linkname directive.
    fn has_directive(&self, node: Node<'_>) -> bool {
        let mut expected_row = node.start_position().row;
        let mut previous = node.prev_sibling();
        while let Some(comment) = previous {
            if comment.kind() != "comment" || comment.end_position().row + 1 != expected_row {
                break;
            }
            let text = self.text(comment);
            if text.starts_with(EMBED_DIRECTIVE) || text.starts_with(LINKNAME_DIRECTIVE) {
                return true;
            }
            expected_row = comment.start_position().row;
            previous = comment.prev_sibling();
        }
        false
    }

    fn value_specs(&self, node: Node<'_>, spec_kind: &str, out: &mut Vec<ValueSpec>) {
        let specs: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .flat_map(|child| {
                if child.kind() == "var_spec_list" {
                    named_children(child)
                } else {
                    vec![child]
                }
            })
            .filter(|child| child.kind() == spec_kind)
            .collect();

        // Constants without a value repeat the previous spec's expression.
        let mut previous = InferredType::unknown();
        for spec in specs {
            let names = field_children(spec, "name");
            let values = spec
                .child_by_field_name("value")
                .map(named_children)
                .unwrap_or_default();
            let explicit = spec
                .child_by_field_name("type")
                .map(|t| InferredType::known(self.shape_of_type(t)));

            for (i, name) in names.iter().enumerate() {
                let ty = match &explicit {
                    Some(t) => t.clone(),
                    None if values.is_empty() && spec_kind == "const_spec" => previous.clone(),
                    None if values.len() == names.len() => self.infer(values[i]),
                    None => InferredType::unknown(),
                };
                if i == 0 && (explicit.is_some() || !values.is_empty()) {
                    previous = ty.clone();
                }
                let name_text = self.text(*name);
                if name_text == "_" {
                    continue;
                }
                out.push(ValueSpec {
                    name: name_text.to_string(),
                    ty,
                    line: line_of(*name),
                });
            }
        }
    }

    fn type_specs(&self, node: Node<'_>, out: &mut Vec<TypeDecl>) {
        for spec in named_children(node) {
            if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
                continue;
            }
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };

            let kind = if spec.kind() == "type_alias" {
                TypeKind::Alias(self.type_string(ty))
            } else {
                match ty.kind() {
                    "interface_type" => TypeKind::Interface,
                    "struct_type" => TypeKind::Struct,
                    "function_type" => TypeKind::Signature,
                    _ => TypeKind::Named(self.type_string(ty)),
                }
            };

            let mut decl = TypeDecl {
                name: self.text(name).to_string(),
                kind,
                interface_methods: Vec::new(),
                embedded: Vec::new(),
                line: line_of(spec),
            };
            match ty.kind() {
                "interface_type" => self.interface_body(ty, &mut decl),
                "struct_type" => self.struct_body(ty, &mut decl),
                _ => {}
            }
            out.push(decl);
        }
    }

    fn interface_body(&self, node: Node<'_>, decl: &mut TypeDecl) {
        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    decl.interface_methods.push(FunctionDecl {
                        name: self.text(name).to_string(),
                        receiver: None,
                        params: self.params(elem.child_by_field_name("parameters")),
                        results: self.results(elem.child_by_field_name("result")),
                        line: line_of(elem),
                    });
                }
                "type_elem" | "constraint_elem" => {
                    // Unions are constraints, not embedded interfaces.
                    if let [single] = named_children(elem).as_slice() {
                        if let Some(r) = self.object_ref(*single) {
                            decl.embedded.push(r);
                        }
                    }
                }
                "interface_type_name" | "type_identifier" | "qualified_type" => {
                    if let Some(r) = self.object_ref(elem) {
                        decl.embedded.push(r);
                    }
                }
                _ => {}
            }
        }
    }

    fn struct_body(&self, node: Node<'_>, decl: &mut TypeDecl) {
        let Some(list) = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return;
        };
        for field in named_children(list) {
            if field.kind() != "field_declaration" || !field_children(field, "name").is_empty() {
                continue;
            }
            if let Some(r) = field
                .child_by_field_name("type")
                .and_then(|t| self.object_ref(t))
            {
                decl.embedded.push(r);
            }
        }
    }

    /// The declared type a type expression names, looking through pointers and type arguments.
    fn object_ref(&self, node: Node<'_>) -> Option<ObjectRef> {
        match node.kind() {
            "type_identifier" => Some(ObjectRef::new(self.package_id, self.text(node))),
            "qualified_type" => {
                let package = node.child_by_field_name("package")?;
                let name = node.child_by_field_name("name")?;
                Some(ObjectRef::new(
                    self.import_path(self.text(package)),
                    self.text(name),
                ))
            }
            "pointer_type" | "parenthesized_type" | "interface_type_name" => {
                node.named_child(0).and_then(|n| self.object_ref(n))
            }
            "generic_type" => node
                .child_by_field_name("type")
                .and_then(|n| self.object_ref(n)),
            _ => None,
        }
    }

    fn function(&self, node: Node<'_>, out: &mut FileSyntax) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name);
        let is_method = node.kind() == "method_declaration";

        let receiver = if is_method {
            match node
                .child_by_field_name("receiver")
                .and_then(|r| self.receiver_type(r))
            {
                Some(r) => Some(r),
                None => return,
            }
        } else {
            None
        };

        if !is_method && name == "init" {
            out.init_functions.push(line_of(node));
            return;
        }

        out.functions.push(FunctionDecl {
            name: name.to_string(),
            receiver,
            params: self.params(node.child_by_field_name("parameters")),
            results: self.results(node.child_by_field_name("result")),
            line: line_of(node),
        });
    }

    /// Base type name of a receiver list such as `(s *Store[T])`.
    fn receiver_type(&self, list: Node<'_>) -> Option<String> {
        let decl = named_children(list)
            .into_iter()
            .find(|c| c.kind() == "parameter_declaration")?;
        let mut ty = decl.child_by_field_name("type")?;
        loop {
            ty = match ty.kind() {
                "pointer_type" | "parenthesized_type" => ty.named_child(0)?,
                "generic_type" => ty.child_by_field_name("type")?,
                "type_identifier" => return Some(self.text(ty).to_string()),
                _ => return None,
            };
        }
    }

    fn params(&self, list: Option<Node<'_>>) -> Vec<Param> {
        let Some(list) = list else {
            return Vec::new();
        };
        let mut params = Vec::new();
        for decl in named_children(list) {
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            match decl.kind() {
                "parameter_declaration" => {
                    let type_string = self.type_string(ty);
                    let shape = self.shape_of_type(ty);
                    let names = field_children(decl, "name");
                    if names.is_empty() {
                        params.push(Param::new(None, type_string.clone(), shape.clone()));
                    }
                    for name in names {
                        params.push(Param::new(
                            Some(self.text(name)),
                            type_string.clone(),
                            shape.clone(),
                        ));
                    }
                }
                "variadic_parameter_declaration" => {
                    let inner = self.type_string(ty);
                    let name = decl.child_by_field_name("name").map(|n| self.text(n));
                    params.push(Param::new(
                        name,
                        format!("...{inner}"),
                        TypeShape::Composite(format!("[]{inner}")),
                    ));
                }
                _ => {}
            }
        }
        params
    }

    fn results(&self, result: Option<Node<'_>>) -> Vec<Param> {
        match result {
            None => Vec::new(),
            Some(list) if list.kind() == "parameter_list" => self.params(Some(list)),
            Some(ty) => vec![Param::new(None, self.type_string(ty), self.shape_of_type(ty))],
        }
    }

    // ----- types -----

    fn import_path(&self, local: &'a str) -> &'a str {
        self.imports.get(local).copied().unwrap_or(local)
    }

    fn qualify(&self, name: &str) -> String {
        if name == "error" || BASIC_TYPES.contains(&name) {
            name.to_string()
        } else {
            format!("{}.{name}", self.package_id)
        }
    }

    /// Canonical type text: local names qualified by package ID, import aliases replaced by paths.
    fn type_string(&self, node: Node<'_>) -> String {
        let field = |name: &str| {
            node.child_by_field_name(name)
                .map(|n| self.type_string(n))
                .unwrap_or_default()
        };
        match node.kind() {
            "type_identifier" => self.qualify(self.text(node)),
            "qualified_type" => match (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ) {
                (Some(package), Some(name)) => format!(
                    "{}.{}",
                    self.import_path(self.text(package)),
                    self.text(name)
                ),
                _ => collapse(self.text(node)),
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => format!("*{}", self.type_string(inner)),
                None => collapse(self.text(node)),
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.type_string(inner),
                None => collapse(self.text(node)),
            },
            "slice_type" => format!("[]{}", field("element")),
            "array_type" => {
                let length = node
                    .child_by_field_name("length")
                    .map(|n| collapse(self.text(n)))
                    .unwrap_or_default();
                format!("[{length}]{}", field("element"))
            }
            "map_type" => format!("map[{}]{}", field("key"), field("value")),
            "channel_type" => {
                let text = self.text(node);
                let direction = if text.starts_with("<-") {
                    "<-chan "
                } else if text
                    .strip_prefix("chan")
                    .is_some_and(|rest| rest.trim_start().starts_with("<-"))
                {
                    "chan<- "
                } else {
                    "chan "
                };
                format!("{direction}{}", field("value"))
            }
            "function_type" => render_signature(
                &self.params(node.child_by_field_name("parameters")),
                &self.results(node.child_by_field_name("result")),
            ),
            "generic_type" => {
                let args: Vec<String> = node
                    .child_by_field_name("type_arguments")
                    .map(named_children)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|arg| {
                        if arg.kind() == "type_elem" {
                            named_children(arg)
                                .into_iter()
                                .map(|t| self.type_string(t))
                                .collect::<Vec<_>>()
                                .join(" | ")
                        } else {
                            self.type_string(arg)
                        }
                    })
                    .collect();
                format!("{}[{}]", field("type"), args.join(", "))
            }
            _ => collapse(self.text(node)),
        }
    }

    fn shape_of_name(&self, name: &str) -> TypeShape {
        if name == "error" {
            TypeShape::error()
        } else if BASIC_TYPES.contains(&name) {
            TypeShape::Basic(name.to_string())
        } else {
            TypeShape::named(self.package_id, name)
        }
    }

    fn shape_of_type(&self, node: Node<'_>) -> TypeShape {
        match node.kind() {
            "type_identifier" => self.shape_of_name(self.text(node)),
            "qualified_type" => match (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ) {
                (Some(package), Some(name)) => TypeShape::named(
                    self.import_path(self.text(package)),
                    self.text(name),
                ),
                _ => TypeShape::Unknown,
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeShape::pointer(self.shape_of_type(inner)),
                None => TypeShape::Unknown,
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.shape_of_type(inner),
                None => TypeShape::Unknown,
            },
            "generic_type" => match node.child_by_field_name("type") {
                Some(base) => self.shape_of_type(base),
                None => TypeShape::Unknown,
            },
            _ => TypeShape::Composite(self.type_string(node)),
        }
    }

    /// Shape of a type written in expression position, e.g. the argument of `new`.
    fn shape_of_type_expr(&self, node: Node<'_>) -> TypeShape {
        match node.kind() {
            "identifier" => self.shape_of_name(self.text(node)),
            "selector_expression" => match self.qualified(node) {
                Some(r) => TypeShape::named(r.package, r.name),
                None => TypeShape::Unknown,
            },
            _ => self.shape_of_type(node),
        }
    }

    // ----- expressions -----

    /// `pkg.Name` where `pkg` is an import of this file.
    fn qualified(&self, selector: Node<'_>) -> Option<ObjectRef> {
        let operand = selector.child_by_field_name("operand")?;
        let field = selector.child_by_field_name("field")?;
        if operand.kind() != "identifier" {
            return None;
        }
        let path = self.imports.get(self.text(operand))?;
        Some(ObjectRef::new(*path, self.text(field)))
    }

    fn infer(&self, expr: Node<'_>) -> InferredType {
        let basic = |name: &str| InferredType::known(TypeShape::Basic(name.to_string()));
        match expr.kind() {
            "interpreted_string_literal" | "raw_string_literal" => basic("string"),
            "int_literal" | "iota" => basic("int"),
            "float_literal" => basic("float64"),
            "imaginary_literal" => basic("complex128"),
            "rune_literal" => basic("rune"),
            "true" | "false" => basic("bool"),
            "composite_literal" => match expr.child_by_field_name("type") {
                Some(ty) => InferredType::known(self.shape_of_type(ty)),
                None => InferredType::unknown(),
            },
            "func_literal" => InferredType::known(TypeShape::Composite(render_signature(
                &self.params(expr.child_by_field_name("parameters")),
                &self.results(expr.child_by_field_name("result")),
            ))),
            "unary_expression" => {
                let operator = expr
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                let Some(operand) = expr.child_by_field_name("operand") else {
                    return InferredType::unknown();
                };
                match operator {
                    "&" if operand.kind() == "composite_literal" => {
                        let inner = self.infer(operand);
                        InferredType::known(TypeShape::pointer(inner.shape))
                    }
                    "!" => basic("bool"),
                    "-" | "+" | "^" => self.infer(operand),
                    _ => InferredType::unknown(),
                }
            }
            "binary_expression" => {
                let operator = expr
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                match operator {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => basic("bool"),
                    _ => expr
                        .child_by_field_name("left")
                        .map(|l| self.infer(l))
                        .unwrap_or_else(InferredType::unknown),
                }
            }
            "parenthesized_expression" => expr
                .named_child(0)
                .map(|inner| self.infer(inner))
                .unwrap_or_else(InferredType::unknown),
            "identifier" => {
                InferredType::from_origin(ObjectRef::new(self.package_id, self.text(expr)))
            }
            "selector_expression" => self
                .qualified(expr)
                .map(InferredType::from_origin)
                .unwrap_or_else(InferredType::unknown),
            "call_expression" => self.infer_call(expr),
            "type_conversion_expression" => expr
                .child_by_field_name("type")
                .map(|ty| InferredType::known(self.shape_of_type(ty)))
                .unwrap_or_else(InferredType::unknown),
            _ => InferredType::unknown(),
        }
    }

    fn infer_call(&self, call: Node<'_>) -> InferredType {
        let Some(function) = call.child_by_field_name("function") else {
            return InferredType::unknown();
        };
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        match function.kind() {
            "identifier" => match self.text(function) {
                "new" => args
                    .first()
                    .map(|a| InferredType::known(TypeShape::pointer(self.shape_of_type_expr(*a))))
                    .unwrap_or_else(InferredType::unknown),
                "make" => args
                    .first()
                    .map(|a| InferredType::known(self.shape_of_type_expr(*a)))
                    .unwrap_or_else(InferredType::unknown),
                "len" | "cap" | "copy" => InferredType::known(TypeShape::Basic("int".into())),
                "append" => args
                    .first()
                    .map(|a| self.infer(*a))
                    .unwrap_or_else(InferredType::unknown),
                name if name == "error" || BASIC_TYPES.contains(&name) => {
                    InferredType::known(self.shape_of_name(name))
                }
                name => InferredType::from_origin(ObjectRef::new(self.package_id, name)),
            },
            "selector_expression" => match self.qualified(function) {
                Some(r)
                    if ERROR_CONSTRUCTORS
                        .iter()
                        .any(|(p, n)| r.package == *p && r.name == *n) =>
                {
                    InferredType::known(TypeShape::error())
                }
                Some(r) => InferredType::from_origin(r),
                None => InferredType::unknown(),
            },
            _ => InferredType::unknown(),
        }
    }

    // ----- use-sites -----

    /// Pre-order walk of the subtree the cursor was created on. Iterative, so
    /// nesting depth does not grow the call stack.
    fn walk(&self, cursor: &mut TreeCursor<'_>, out: &mut FileSyntax) {
        loop {
            self.visit(cursor.node(), cursor.field_name(), out);
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    fn visit(&self, node: Node<'_>, field: Option<&str>, out: &mut FileSyntax) {
        let line = line_of(node);
        match node.kind() {
            "identifier" => {
                if field == Some("name") {
                    return;
                }
                let name = self.text(node);
                let is_package_operand = field == Some("operand")
                    && node
                        .parent()
                        .is_some_and(|p| p.kind() == "selector_expression")
                    && self.imports.contains_key(name);
                if name != "_" && !is_package_operand {
                    out.uses.push(UseSite {
                        target: UseTarget::Local(name.to_string()),
                        line,
                    });
                }
            }
            "selector_expression" => {
                let target = match self.qualified(node) {
                    Some(r) => UseTarget::Qualified(r),
                    None => match node.child_by_field_name("field") {
                        Some(f) => UseTarget::Member(self.text(f).to_string()),
                        None => return,
                    },
                };
                out.uses.push(UseSite { target, line });
            }
            "qualified_type" => {
                if let Some(r) = self.object_ref(node) {
                    out.uses.push(UseSite {
                        target: UseTarget::Qualified(r),
                        line,
                    });
                }
            }
            "call_expression" => self.visit_call(node, out),
            "comment" => {
                let text = self.text(node);
                if let Some(rest) = text.strip_prefix(EMBED_DIRECTIVE) {
                    for pattern in rest.split_whitespace() {
                        out.embed_patterns.push(PathLiteral {
                            value: unquote(pattern).to_string(),
                            line,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_call(&self, call: Node<'_>, out: &mut FileSyntax) {
        let Some(callee) = call
            .child_by_field_name("function")
            .filter(|f| f.kind() == "selector_expression")
            .and_then(|f| self.qualified(f))
        else {
            return;
        };
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        if IO_CALLS
            .iter()
            .any(|(p, n)| callee.package == *p && callee.name == *n)
        {
            for arg in &args {
                if matches!(arg.kind(), "interpreted_string_literal" | "raw_string_literal") {
                    out.io_paths.push(PathLiteral {
                        value: unquote(self.text(*arg)).to_string(),
                        line: line_of(*arg),
                    });
                }
            }
        }

        if callee.package == "context" && callee.name == "WithValue" {
            if let Some(key) = args.get(1) {
                out.context_keys.push(ContextKey {
                    key: self.infer(*key),
                    text: collapse(self.text(*key)),
                    line: line_of(*key),
                });
            }
        }
    }
}

fn is_spec(kind: &str) -> bool {
    matches!(
        kind,
        "import_spec" | "const_spec" | "var_spec" | "type_spec" | "type_alias"
    )
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn render_signature(params: &[Param], results: &[Param]) -> String {
    let params: Vec<&str> = params.iter().map(|p| p.type_string.as_str()).collect();
    let mut sig = format!("func({})", params.join(", "));
    match results {
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

/// Extract text from a tree-sitter node.
fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn unquote(literal: &str) -> &str {
    for quote in ['"', '`'] {
        if let Some(inner) = literal
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    literal
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: &str = "example.com/app/svc";

    fn parse(source: &str) -> FileSyntax {
        GoParser::new()
            .unwrap()
            .parse(PKG, Path::new("/src/svc/svc.go"), source)
            .unwrap()
    }

    fn shape(syntax: &FileSyntax, name: &str) -> InferredType {
        syntax
            .variables
            .iter()
            .chain(&syntax.constants)
            .find(|v| v.name == name)
            .map(|v| v.ty.clone())
            .unwrap_or_else(|| panic!("no value named {name}"))
    }

    #[test]
    fn test_package_and_imports() {
        let syntax = parse(
            r#"package svc

import (
	"context"
	st "example.com/app/store"
	_ "embed"
)
"#,
        );
        assert_eq!(syntax.package_name, "svc");
        let paths: Vec<&str> = syntax.import_paths().collect();
        assert_eq!(paths, vec!["context", "example.com/app/store", "embed"]);
        assert_eq!(syntax.imports[1].alias.as_deref(), Some("st"));
        assert_eq!(syntax.imports[1].local_name(), "st");
        assert_eq!(syntax.imports[0].line, 4);
        assert!(!syntax.has_errors);
    }

    #[test]
    fn test_deeply_nested_expressions() {
        let depth = 1000;
        let source = format!(
            "package svc\n\nvar limit = 1\n\nfunc f() int {{\n\treturn {}limit{}\n}}\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let syntax = parse(&source);
        assert!(!syntax.has_errors);
        let uses = syntax
            .uses
            .iter()
            .filter(|u| matches!(&u.target, UseTarget::Local(name) if name == "limit"))
            .count();
        assert_eq!(uses, 1);
    }

    #[test]
    fn test_declarations_in_source_order() {
        let syntax = parse(
            r#"package svc

import (
	"context"
	"errors"
)

const (
	A = 1
	B = 2
)

var single = "x"

type Service struct{}

func (s *Service) Run(ctx context.Context, name string) (string, error) {
	return name, errors.New("x")
}

func init() {}
"#,
        );
        let kinds: Vec<DeclKind> = syntax.declarations.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DeclKind::Import,
                DeclKind::Const,
                DeclKind::Var,
                DeclKind::Type,
                DeclKind::Func,
                DeclKind::Func,
            ]
        );
        let import = &syntax.declarations[0];
        assert_eq!((import.specs, import.parenthesized), (2, true));
        let consts = &syntax.declarations[1];
        assert_eq!((consts.specs, consts.parenthesized, consts.line), (2, true, 8));
        let var = &syntax.declarations[2];
        assert_eq!((var.specs, var.parenthesized, var.line), (1, false, 13));

        assert_eq!(syntax.init_functions, vec![21]);
        assert_eq!(syntax.functions.len(), 1);
        let run = &syntax.functions[0];
        assert_eq!(run.receiver.as_deref(), Some("Service"));
        let params: Vec<&str> = run.params.iter().map(|p| p.type_string.as_str()).collect();
        assert_eq!(params, vec!["context.Context", "string"]);
        let results: Vec<&str> = run.results.iter().map(|p| p.type_string.as_str()).collect();
        assert_eq!(results, vec!["string", "error"]);
        assert_eq!(run.results[1].shape, TypeShape::error());
    }

    #[test]
    fn test_parenthesized_single_var() {
        let syntax = parse(
            r#"package svc

var (
	only = 1
)
"#,
        );
        let var = &syntax.declarations[0];
        assert_eq!(var.kind, DeclKind::Var);
        assert_eq!((var.specs, var.parenthesized), (1, true));
        assert_eq!(syntax.variables.len(), 1);
    }

    #[test]
    fn test_variable_shapes() {
        let syntax = parse(
            r#"package svc

import "errors"

type ctxKey struct{}

type Config struct{}

var Key = ctxKey{}
var ErrMissing = errors.New("missing")
var Default = &Config{}
var Count int
var ptr = new(Config)
var built = build()
var name = "svc"
var _ = Count
"#,
        );
        assert_eq!(
            shape(&syntax, "Key"),
            InferredType::known(TypeShape::named(PKG, "ctxKey"))
        );
        assert_eq!(
            shape(&syntax, "ErrMissing"),
            InferredType::known(TypeShape::error())
        );
        assert_eq!(
            shape(&syntax, "Default"),
            InferredType::known(TypeShape::pointer(TypeShape::named(PKG, "Config")))
        );
        assert_eq!(
            shape(&syntax, "Count"),
            InferredType::known(TypeShape::Basic("int".into()))
        );
        assert_eq!(
            shape(&syntax, "ptr"),
            InferredType::known(TypeShape::pointer(TypeShape::named(PKG, "Config")))
        );
        assert_eq!(
            shape(&syntax, "built"),
            InferredType::from_origin(ObjectRef::new(PKG, "build"))
        );
        assert_eq!(
            shape(&syntax, "name"),
            InferredType::known(TypeShape::Basic("string".into()))
        );
        assert!(syntax.variables.iter().all(|v| v.name != "_"));
    }

    #[test]
    fn test_iota_constants_repeat_type() {
        let syntax = parse(
            r#"package svc

type Level int

const (
	Debug Level = iota
	Info
)
"#,
        );
        assert_eq!(
            shape(&syntax, "Info"),
            InferredType::known(TypeShape::named(PKG, "Level"))
        );
        assert_eq!(
            syntax.types[0].kind,
            TypeKind::Named("int".into())
        );
    }

    #[test]
    fn test_interfaces_and_embedding() {
        let syntax = parse(
            r#"package svc

import "io"

type Reader interface {
	io.Closer
	Read(p []byte) (n int, err error)
}

type Base struct{}

type File struct {
	*Base
	name string
}
"#,
        );
        let reader = &syntax.types[0];
        assert_eq!(reader.kind, TypeKind::Interface);
        assert_eq!(reader.embedded, vec![ObjectRef::new("io", "Closer")]);
        let read = &reader.interface_methods[0];
        assert_eq!(read.name, "Read");
        assert_eq!(read.params[0].type_string, "[]byte");
        let results: Vec<&str> = read.results.iter().map(|p| p.type_string.as_str()).collect();
        assert_eq!(results, vec!["int", "error"]);

        let file = syntax.types.iter().find(|t| t.name == "File").unwrap();
        assert_eq!(file.kind, TypeKind::Struct);
        assert_eq!(file.embedded, vec![ObjectRef::new(PKG, "Base")]);
    }

    #[test]
    fn test_canonical_type_strings() {
        let syntax = parse(
            r#"package svc

import m "example.com/app/model"

func Load(users map[string]*m.User, ch <-chan int, opts ...Option) func(int) error {
	return nil
}
"#,
        );
        let load = &syntax.functions[0];
        let params: Vec<&str> = load.params.iter().map(|p| p.type_string.as_str()).collect();
        assert_eq!(
            params,
            vec![
                "map[string]*example.com/app/model.User",
                "<-chan int",
                "...example.com/app/svc.Option",
            ]
        );
        assert_eq!(load.results[0].type_string, "func(int) error");
    }

    #[test]
    fn test_use_sites() {
        let syntax = parse(
            r#"package svc

import (
	"context"
	"os"

	"example.com/app/store"
)

var counter int

func Handle(ctx context.Context) {
	counter++
	s := store.New()
	s.Save()
	ctx = context.WithValue(ctx, "user", 1)
	_, _ = os.ReadFile("testdata/in.json")
}
"#,
        );
        let targets: Vec<&UseTarget> = syntax.uses.iter().map(|u| &u.target).collect();
        assert!(targets.contains(&&UseTarget::Local("counter".into())));
        assert!(targets.contains(&&UseTarget::Qualified(ObjectRef::new(
            "example.com/app/store",
            "New"
        ))));
        assert!(targets.contains(&&UseTarget::Qualified(ObjectRef::new("context", "Context"))));
        assert!(targets.contains(&&UseTarget::Member("Save".into())));
        assert!(!targets.contains(&&UseTarget::Local("store".into())));
        assert!(!targets.contains(&&UseTarget::Local("Handle".into())));

        assert_eq!(syntax.context_keys.len(), 1);
        assert_eq!(syntax.context_keys[0].text, "\"user\"");
        assert_eq!(
            syntax.context_keys[0].key,
            InferredType::known(TypeShape::Basic("string".into()))
        );
        assert_eq!(syntax.io_paths.len(), 1);
        assert_eq!(syntax.io_paths[0].value, "testdata/in.json");
        assert_eq!(syntax.io_paths[0].line, 17);
    }

    #[test]
    fn test_embed_directive() {
        let syntax = parse(
            r#"package svc

import "embed"

//go:embed static/*.css templates
var files embed.FS
"#,
        );
        let values: Vec<&str> = syntax.embed_patterns.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["static/*.css", "templates"]);
        assert_eq!(syntax.embed_patterns[0].line, 5);
        let var = syntax.declarations.last().unwrap();
        assert_eq!(var.kind, DeclKind::Var);
        assert!(var.exempt);
        assert!(!syntax.declarations[0].exempt);
    }

    #[test]
    fn test_generic_receiver() {
        let syntax = parse(
            r#"package svc

type List[T any] struct{}

func (l *List[T]) Push(v T) {}
"#,
        );
        assert_eq!(syntax.functions[0].receiver.as_deref(), Some("List"));
    }

    #[test]
    fn test_external_test_package_and_errors() {
        let syntax = parse("package svc_test\n\nfunc TestX(t *testing.T) {\n");
        assert_eq!(syntax.package_name, "svc_test");
        assert!(syntax.has_errors);
    }
}
