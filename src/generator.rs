//! End-to-end generation over a set of parsed files.
//!
//! The pipeline runs in fixed phases: every file is extracted before any type is resolved,
//! then every opted-in declaration is synthesized, then operations are assembled and the
//! document metadata is attached. Only a redeclaration or an unreadable metadata source is
//! fatal; everything else ends up in the returned [`Diagnostics`].

use crate::annotation::{doc_lines, lex, DocumentAnnotations};
use crate::declaration::DeclarationTable;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::operation::OperationAssembler;
use crate::parser::{AstParser, ParsedFile};
use crate::schema_generator::SchemaGenerator;
use crate::type_resolver::{ModuleLoader, NoopLoader, TypeResolver};
use log::debug;
use std::path::{Path, PathBuf};

/// Result of one generation run.
#[derive(Debug)]
pub struct Generation {
    pub document: OpenApiDocument,
    pub diagnostics: Diagnostics,
}

/// Configures and runs one generation.
pub struct Generator {
    loader: Box<dyn ModuleLoader>,
    metadata_source: Option<PathBuf>,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            loader: Box::new(NoopLoader),
            metadata_source: None,
        }
    }

    /// Loader for modules referenced but not among the parsed files.
    pub fn with_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Restricts document metadata to the inner doc comments of this file.
    pub fn with_metadata_source(mut self, path: PathBuf) -> Self {
        self.metadata_source = Some(path);
        self
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    ///
    /// Fails when two declarations share a qualified name, or when the metadata source
    /// cannot be read or parsed.
    pub fn generate(self, files: &[ParsedFile]) -> Result<Generation> {
        let mut diagnostics = Diagnostics::new();

        let table = DeclarationTable::extract(files, &mut diagnostics)?;
        let metadata = collect_metadata(files, self.metadata_source.as_deref(), &mut diagnostics)?;
        let candidates = table.candidates().to_vec();

        let mut schemas = SchemaGenerator::new(TypeResolver::with_loader(table, self.loader));
        schemas.synthesize_all();

        let mut operation_diagnostics = Diagnostics::new();
        let mut assembler = OperationAssembler::new();
        let records = assembler.assemble_all(&candidates, &mut schemas, &mut operation_diagnostics);
        // Bodies and responses may have loaded further modules
        schemas.synthesize_all();

        let mut builder = OpenApiBuilder::new().with_metadata(&metadata);
        for tag in assembler.tags() {
            builder.add_tag(tag.clone());
        }
        for record in records {
            builder.add_operation(record, &mut operation_diagnostics);
        }
        let document = builder.build(&schemas);

        diagnostics.append(schemas.take_diagnostics());
        diagnostics.append(operation_diagnostics);
        debug!(
            "Generated {} paths and {} schemas with {} diagnostics",
            document.paths.len(),
            schemas.len(),
            diagnostics.len()
        );

        Ok(Generation {
            document,
            diagnostics,
        })
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds document metadata from the metadata source, or from every crate root file.
fn collect_metadata(
    files: &[ParsedFile],
    metadata_source: Option<&Path>,
    diagnostics: &mut Diagnostics,
) -> Result<DocumentAnnotations> {
    let mut metadata = DocumentAnnotations::default();

    let sources: Vec<ParsedFile> = match metadata_source {
        Some(path) => {
            let known = files.iter().find(|file| same_file(&file.path, path));
            match known {
                Some(file) => vec![file.clone()],
                None => vec![AstParser::parse_file(path).map_err(|e| Error::ParseError {
                    file: path.to_path_buf(),
                    message: format!("{:#}", e),
                })?],
            }
        }
        None => {
            let mut roots: Vec<ParsedFile> = files
                .iter()
                .filter(|file| file.module.is_root())
                .cloned()
                .collect();
            roots.sort_by(|a, b| a.path.cmp(&b.path));
            roots
        }
    };

    for file in &sources {
        let lines = doc_lines(&file.syntax_tree.attrs);
        if lines.is_empty() {
            continue;
        }
        let subject = file.path.display().to_string();
        debug!("Reading document metadata from {}", subject);
        let block = lex(&lines, &subject, diagnostics);
        metadata.fold(&block, &subject, diagnostics);
    }

    Ok(metadata)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
