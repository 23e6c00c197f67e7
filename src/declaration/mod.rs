//! Declaration extraction.
//!
//! Every parsed file is walked once and its types, traits, inherent impls, functions and
//! `use` imports are recorded in a [`DeclarationTable`] keyed by [`QualifiedName`]. Nothing is
//! resolved here: the table only has to be complete before the schema generator starts, so
//! declarations may reference each other in any order and across files.

mod extract;
pub mod serde_attrs;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::module_path::{ModulePath, QualifiedName};
use crate::parser::ParsedFile;
pub use serde_attrs::{ContainerSerde, FieldSerde, RenameRule};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One `use` binding visible in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Name the binding introduces (`*` for globs)
    pub alias: String,
    /// Path as written, e.g. `["crate", "models", "Pet"]`
    pub path: Vec<String>,
    pub glob: bool,
}

/// Imports and source files of one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    pub imports: Vec<Import>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// `None` for tuple fields
    pub ident: Option<String>,
    pub ty: syn::Type,
    pub docs: Vec<String>,
    pub serde: FieldSerde,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub ident: String,
    pub docs: Vec<String>,
    pub serde: FieldSerde,
    /// Carries no data
    pub is_unit: bool,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub ident: String,
    pub docs: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum DeclarationKind {
    Struct { fields: Vec<FieldDecl> },
    /// `type X = T;` or a newtype struct `struct X(T);`
    Alias { target: syn::Type },
    Enum { variants: Vec<VariantDecl> },
    /// A trait and its method list
    Interface { methods: Vec<MethodDecl> },
}

impl DeclarationKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeclarationKind::Struct { .. } => "struct",
            DeclarationKind::Alias { .. } => "alias",
            DeclarationKind::Enum { .. } => "enum",
            DeclarationKind::Interface { .. } => "interface",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: QualifiedName,
    pub kind: DeclarationKind,
    pub docs: Vec<String>,
    /// Generic type parameter names
    pub generics: Vec<String>,
    pub serde: ContainerSerde,
    pub source: PathBuf,
}

/// Trait or inherent impl an operation candidate belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub docs: Vec<String>,
}

/// A function or method whose doc comment carries annotations.
#[derive(Debug, Clone)]
pub struct OperationCandidate {
    /// `Owner::method` or the function name
    pub subject: String,
    /// Module whose imports resolve the candidate's type names
    pub module: ModulePath,
    pub docs: Vec<String>,
    pub owner: Option<Owner>,
    pub source: PathBuf,
}

/// All declarations of one run, keyed by qualified name.
#[derive(Debug, Default)]
pub struct DeclarationTable {
    declarations: BTreeMap<QualifiedName, Declaration>,
    modules: BTreeMap<ModulePath, ModuleScope>,
    candidates: Vec<OperationCandidate>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every file into a fresh table.
    ///
    /// # Errors
    ///
    /// Fails on the first qualified name declared twice.
    pub fn extract(files: &[ParsedFile], diagnostics: &mut Diagnostics) -> Result<Self> {
        let mut table = Self::new();
        for file in files {
            table.extract_file(file, diagnostics)?;
        }
        log::debug!(
            "Extracted {} declarations and {} operation candidates from {} modules",
            table.declarations.len(),
            table.candidates.len(),
            table.modules.len()
        );
        Ok(table)
    }

    /// Adds one file's declarations to the table.
    pub fn extract_file(&mut self, file: &ParsedFile, diagnostics: &mut Diagnostics) -> Result<()> {
        extract::extract_file(self, file, diagnostics)
    }

    pub(crate) fn insert(&mut self, declaration: Declaration) -> Result<()> {
        if let Some(existing) = self.declarations.get(&declaration.name) {
            return Err(Error::Redeclaration {
                name: declaration.name.to_string(),
                first: existing.source.clone(),
                second: declaration.source,
            });
        }
        self.declarations.insert(declaration.name.clone(), declaration);
        Ok(())
    }

    pub(crate) fn scope_mut(&mut self, module: &ModulePath) -> &mut ModuleScope {
        self.modules.entry(module.clone()).or_default()
    }

    pub(crate) fn push_candidate(&mut self, candidate: OperationCandidate) {
        self.candidates.push(candidate);
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.declarations.contains_key(name)
    }

    /// Declarations in canonical name order.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.values()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn has_module(&self, module: &ModulePath) -> bool {
        self.modules.contains_key(module)
    }

    pub fn imports(&self, module: &ModulePath) -> &[Import] {
        self.modules
            .get(module)
            .map(|scope| scope.imports.as_slice())
            .unwrap_or(&[])
    }

    /// Operation candidates in discovery order.
    pub fn candidates(&self) -> &[OperationCandidate] {
        &self.candidates
    }

    /// Every declaration with the given local name, in canonical order.
    pub fn find_by_local_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.declarations.values().filter(move |d| d.name.name == name)
    }
}
