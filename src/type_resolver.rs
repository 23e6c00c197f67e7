use crate::declaration::{Declaration, DeclarationTable};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::module_path::{ModulePath, QualifiedName};
use crate::parser::{AstParser, ParsedFile};
use log::debug;
use std::collections::HashSet;
use std::path::PathBuf;

/// Primitive types with a fixed schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    /// `Vec<u8>`, `&[u8]`
    Bytes,
    DateTime,
    Date,
    Uuid,
}

impl PrimitiveType {
    /// Maps a type name to a primitive; time and id types are matched by their usual crate names.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "String" | "str" => PrimitiveType::String,
            "char" => PrimitiveType::Char,
            "i8" => PrimitiveType::I8,
            "i16" => PrimitiveType::I16,
            "i32" => PrimitiveType::I32,
            "i64" => PrimitiveType::I64,
            "i128" => PrimitiveType::I128,
            "isize" => PrimitiveType::Isize,
            "u8" => PrimitiveType::U8,
            "u16" => PrimitiveType::U16,
            "u32" => PrimitiveType::U32,
            "u64" => PrimitiveType::U64,
            "u128" => PrimitiveType::U128,
            "usize" => PrimitiveType::Usize,
            "f32" => PrimitiveType::F32,
            "f64" => PrimitiveType::F64,
            "bool" => PrimitiveType::Bool,
            "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" => {
                PrimitiveType::DateTime
            }
            "NaiveDate" => PrimitiveType::Date,
            "Uuid" => PrimitiveType::Uuid,
            _ => return None,
        })
    }

    /// Maps the scalar names accepted by `openapi:param` (OpenAPI or Rust spelling).
    pub fn from_param_type(name: &str) -> Option<Self> {
        match name {
            "string" => Some(PrimitiveType::String),
            "integer" | "int" => Some(PrimitiveType::I64),
            "int32" => Some(PrimitiveType::I32),
            "int64" => Some(PrimitiveType::I64),
            "number" | "double" => Some(PrimitiveType::F64),
            "float" => Some(PrimitiveType::F32),
            "boolean" => Some(PrimitiveType::Bool),
            "uuid" => Some(PrimitiveType::Uuid),
            "date-time" => Some(PrimitiveType::DateTime),
            "date" => Some(PrimitiveType::Date),
            other => Self::from_name(other),
        }
    }
}

/// A field or signature type, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Primitive(PrimitiveType),
    /// `Option<T>`, `Box<T>`, `&T` and friends: transparent
    Pointer(Box<TypeExpr>),
    Array(Box<TypeExpr>),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// A bare identifier, looked up in the current module
    Named(String),
    /// A multi-segment path such as `errors::ErrorResponse`
    Selector { qualifier: Vec<String>, name: String },
    /// Free-form JSON value, trait object or generic parameter
    Any,
    Unsupported(String),
}

const POINTERS: &[&str] = &["Option", "Box", "Rc", "Arc", "Cow", "Json", "RefCell", "Cell"];
const SEQUENCES: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet"];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];
/// Library type names that a crate may also declare itself
const WELL_KNOWN: &[&str] = &[
    "Value",
    "DateTime",
    "NaiveDateTime",
    "OffsetDateTime",
    "PrimitiveDateTime",
    "SystemTime",
    "NaiveDate",
    "Uuid",
];

impl TypeExpr {
    /// Classifies a `syn` type; `generics` are the enclosing declaration's type parameters.
    pub fn classify(ty: &syn::Type, generics: &[String]) -> TypeExpr {
        match ty {
            syn::Type::Path(type_path) if type_path.qself.is_none() => {
                Self::classify_path(&type_path.path, generics)
            }
            syn::Type::Reference(reference) => Self::pointer(Self::classify(&reference.elem, generics)),
            syn::Type::Slice(slice) => Self::sequence(Self::classify(&slice.elem, generics)),
            syn::Type::Array(array) => Self::sequence(Self::classify(&array.elem, generics)),
            syn::Type::Paren(paren) => Self::classify(&paren.elem, generics),
            syn::Type::Group(group) => Self::classify(&group.elem, generics),
            syn::Type::TraitObject(_) | syn::Type::ImplTrait(_) => TypeExpr::Any,
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => TypeExpr::Unsupported("()".to_string()),
            syn::Type::Tuple(_) => TypeExpr::Unsupported("tuple".to_string()),
            syn::Type::BareFn(_) => TypeExpr::Unsupported("function pointer".to_string()),
            syn::Type::Ptr(_) => TypeExpr::Unsupported("raw pointer".to_string()),
            _ => TypeExpr::Unsupported("type expression".to_string()),
        }
    }

    /// Parses and classifies a type written in an annotation, e.g. `Vec<Pet>`.
    pub fn parse(source: &str) -> std::result::Result<TypeExpr, String> {
        syn::parse_str::<syn::Type>(source)
            .map(|ty| Self::classify(&ty, &[]))
            .map_err(|e| format!("`{}` is not a type: {}", source, e))
    }

    fn classify_path(path: &syn::Path, generics: &[String]) -> TypeExpr {
        let Some(last) = path.segments.last() else {
            return TypeExpr::Unsupported("empty path".to_string());
        };
        let ident = last.ident.to_string();
        let args: Vec<&syn::Type> = match &last.arguments {
            syn::PathArguments::AngleBracketed(angle) => angle
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(ty) => Some(ty),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let single = path.segments.len() == 1;

        if single && generics.contains(&ident) {
            return TypeExpr::Any;
        }
        if POINTERS.contains(&ident.as_str()) {
            if let Some(inner) = args.last() {
                return Self::pointer(Self::classify(inner, generics));
            }
        }
        if SEQUENCES.contains(&ident.as_str()) {
            if let Some(inner) = args.first() {
                return Self::sequence(Self::classify(inner, generics));
            }
        }
        if MAPS.contains(&ident.as_str()) && args.len() >= 2 {
            return TypeExpr::Map {
                key: Box::new(Self::classify(args[0], generics)),
                value: Box::new(Self::classify(args[1], generics)),
            };
        }
        if WELL_KNOWN.contains(&ident.as_str()) {
            // A bare name stays `Named` so a declaration in scope can shadow the library type
            let local = single
                || matches!(path.segments[0].ident.to_string().as_str(), "crate" | "self" | "super");
            if !local {
                if let Some(known) = Self::well_known(&ident) {
                    return known;
                }
            }
        } else if let Some(primitive) = PrimitiveType::from_name(&ident) {
            return TypeExpr::Primitive(primitive);
        }

        if single {
            TypeExpr::Named(ident)
        } else {
            TypeExpr::Selector {
                qualifier: path
                    .segments
                    .iter()
                    .take(path.segments.len() - 1)
                    .map(|s| s.ident.to_string())
                    .collect(),
                name: ident,
            }
        }
    }

    fn pointer(inner: TypeExpr) -> TypeExpr {
        match inner {
            // `&str` and `&[u8]` are already leaves
            TypeExpr::Primitive(_) => inner,
            other => TypeExpr::Pointer(Box::new(other)),
        }
    }

    fn sequence(inner: TypeExpr) -> TypeExpr {
        match inner {
            TypeExpr::Primitive(PrimitiveType::U8) => TypeExpr::Primitive(PrimitiveType::Bytes),
            other => TypeExpr::Array(Box::new(other)),
        }
    }

    /// Built-in reading of a library type name (`Value`, `Uuid`, `DateTime`...).
    pub fn well_known(name: &str) -> Option<TypeExpr> {
        if !WELL_KNOWN.contains(&name) {
            return None;
        }
        if name == "Value" {
            return Some(TypeExpr::Any);
        }
        PrimitiveType::from_name(name).map(TypeExpr::Primitive)
    }

    /// Whether values of this type serialize as JSON object keys without coercion.
    pub fn is_string_like(&self) -> bool {
        match self {
            TypeExpr::Primitive(p) => matches!(
                p,
                PrimitiveType::String
                    | PrimitiveType::Char
                    | PrimitiveType::Uuid
                    | PrimitiveType::DateTime
                    | PrimitiveType::Date
            ),
            TypeExpr::Pointer(inner) => inner.is_string_like(),
            TypeExpr::Named(_) | TypeExpr::Selector { .. } => true,
            _ => false,
        }
    }

    /// Path segments of a named or selector expression.
    pub fn segments(&self) -> Option<Vec<String>> {
        match self {
            TypeExpr::Named(name) => Some(vec![name.clone()]),
            TypeExpr::Selector { qualifier, name } => {
                let mut segments = qualifier.clone();
                segments.push(name.clone());
                Some(segments)
            }
            _ => None,
        }
    }
}

/// Supplies modules that were not part of the scanned files.
pub trait ModuleLoader {
    /// Returns the parsed file defining `module`, or `None` when it is unknown.
    fn load(&self, module: &ModulePath) -> Result<Option<ParsedFile>>;
}

/// Loader that never finds anything.
pub struct NoopLoader;

impl ModuleLoader for NoopLoader {
    fn load(&self, _module: &ModulePath) -> Result<Option<ParsedFile>> {
        Ok(None)
    }
}

/// Looks modules up under crate `src/` directories (`a/b.rs` or `a/b/mod.rs`).
pub struct FsModuleLoader {
    source_roots: Vec<PathBuf>,
}

impl FsModuleLoader {
    pub fn new(source_roots: Vec<PathBuf>) -> Self {
        Self { source_roots }
    }
}

impl ModuleLoader for FsModuleLoader {
    fn load(&self, module: &ModulePath) -> Result<Option<ParsedFile>> {
        let Some((last, parents)) = module.segments().split_last() else {
            return Ok(None);
        };

        for root in &self.source_roots {
            let dir = parents.iter().fold(root.clone(), |dir, segment| dir.join(segment));
            for candidate in [dir.join(format!("{}.rs", last)), dir.join(last).join("mod.rs")] {
                if !candidate.is_file() {
                    continue;
                }
                debug!("Loading {} on demand from {}", module, candidate.display());
                return AstParser::parse_in_module(&candidate, module.clone())
                    .map(Some)
                    .map_err(|e| Error::ParseError {
                        file: candidate.clone(),
                        message: format!("{:#}", e),
                    });
            }
        }
        Ok(None)
    }
}

/// Import chains longer than this are treated as cyclic
const MAX_IMPORT_DEPTH: usize = 8;

/// Resolves type names to declarations through module scopes and imports.
pub struct TypeResolver {
    table: DeclarationTable,
    loader: Box<dyn ModuleLoader>,
    /// Modules already requested from the loader
    requested: HashSet<ModulePath>,
}

impl TypeResolver {
    pub fn new(table: DeclarationTable) -> Self {
        Self::with_loader(table, Box::new(NoopLoader))
    }

    pub fn with_loader(table: DeclarationTable, loader: Box<dyn ModuleLoader>) -> Self {
        debug!("Initializing TypeResolver with {} declarations", table.len());
        Self {
            table,
            loader,
            requested: HashSet::new(),
        }
    }

    pub fn table(&self) -> &DeclarationTable {
        &self.table
    }

    pub fn declaration(&self, name: &QualifiedName) -> Option<&Declaration> {
        self.table.get(name)
    }

    /// Resolves a path as written inside `scope` to a declared qualified name.
    ///
    /// Bare names are tried as local declarations, then named imports, then glob imports.
    /// Multi-segment paths resolve their qualifier through `crate`/`self`/`super`, imports,
    /// child modules and finally the crate root.
    pub fn lookup(
        &mut self,
        segments: &[String],
        scope: &ModulePath,
        diagnostics: &mut Diagnostics,
    ) -> Option<QualifiedName> {
        let (name, qualifier) = segments.split_last()?;

        if qualifier.is_empty() {
            return self.lookup_bare(name, scope, diagnostics);
        }

        let module = self.resolve_module(qualifier, scope)?;
        self.declared(QualifiedName::new(module, name.clone()), diagnostics)
    }

    fn lookup_bare(
        &mut self,
        name: &str,
        scope: &ModulePath,
        diagnostics: &mut Diagnostics,
    ) -> Option<QualifiedName> {
        let local = QualifiedName::new(scope.clone(), name);
        if self.table.contains(&local) {
            return Some(local);
        }

        let imports = self.table.imports(scope).to_vec();
        for import in imports.iter().filter(|i| !i.glob && i.alias == name) {
            let Some((target, qualifier)) = import.path.split_last() else {
                continue;
            };
            let Some(module) = self.resolve_module(qualifier, scope) else {
                continue;
            };
            if let Some(found) = self.declared(QualifiedName::new(module, target.clone()), diagnostics) {
                return Some(found);
            }
        }

        for import in imports.iter().filter(|i| i.glob) {
            let Some(module) = self.resolve_module(&import.path, scope) else {
                continue;
            };
            if let Some(found) = self.declared(QualifiedName::new(module, name), diagnostics) {
                return Some(found);
            }
        }

        None
    }

    /// The only declaration with this local name anywhere in the run.
    pub fn find_unique(&self, name: &str) -> Option<QualifiedName> {
        let mut matches = self.table.find_by_local_name(name);
        let first = matches.next()?;
        if matches.next().is_some() {
            debug!("Local name {} is ambiguous", name);
            return None;
        }
        Some(first.name.clone())
    }

    fn resolve_module(&self, qualifier: &[String], scope: &ModulePath) -> Option<ModulePath> {
        self.resolve_module_within(qualifier, scope, MAX_IMPORT_DEPTH)
    }

    fn resolve_module_within(&self, qualifier: &[String], scope: &ModulePath, depth: usize) -> Option<ModulePath> {
        let (first, rest) = qualifier.split_first()?;
        match first.as_str() {
            "crate" => Some(ModulePath::root().join(rest)),
            "self" => Some(scope.join(rest)),
            "super" => {
                let mut module = scope.parent()?;
                let mut rest = rest;
                while let Some((next, tail)) = rest.split_first() {
                    if next != "super" {
                        break;
                    }
                    module = module.parent()?;
                    rest = tail;
                }
                Some(module.join(rest))
            }
            _ => {
                let imported = self
                    .table
                    .imports(scope)
                    .iter()
                    .find(|i| !i.glob && &i.alias == first)
                    .map(|i| i.path.clone());
                if let Some(path) = imported.filter(|_| depth > 0) {
                    let base = self.resolve_module_within(&path, scope, depth - 1)?;
                    return Some(base.join(rest));
                }

                let child = scope.child(first);
                if self.table.has_module(&child) {
                    return Some(child.join(rest));
                }
                Some(ModulePath::root().join(qualifier))
            }
        }
    }

    /// Returns the name when declared, loading its module on demand first.
    fn declared(&mut self, name: QualifiedName, diagnostics: &mut Diagnostics) -> Option<QualifiedName> {
        if !self.table.contains(&name) {
            self.ensure_module(&name.module, diagnostics);
        }
        self.table.contains(&name).then_some(name)
    }

    fn ensure_module(&mut self, module: &ModulePath, diagnostics: &mut Diagnostics) {
        if self.table.has_module(module) || !self.requested.insert(module.clone()) {
            return;
        }

        match self.loader.load(module) {
            Ok(Some(file)) => {
                if let Err(e) = self.table.extract_file(&file, diagnostics) {
                    diagnostics.error(module.to_string(), format!("module loaded on demand was not extracted: {}", e));
                }
            }
            Ok(None) => debug!("Module {} is not available", module),
            Err(e) => diagnostics.error(module.to_string(), e.to_string()),
        }
    }
}
