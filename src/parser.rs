use crate::module_path::ModulePath;
use crate::scanner::SourceFile;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// AST parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into a syntax tree whose
/// doc comments and declarations are later mined for `openapi:` annotations.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module the file defines inside its crate
    pub module: ModulePath,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single Rust source file as the crate root module.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        Self::parse_in_module(path, ModulePath::root())
    }

    /// Parses a Rust source file that defines `module`.
    pub fn parse_in_module(path: &Path, module: ModulePath) -> Result<ParsedFile> {
        debug!("Parsing file: {} ({})", path.display(), module);

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_str(path, module, &content)
    }

    /// Parses in-memory source text as if it were read from `path`.
    pub fn parse_str(path: &Path, module: ModulePath, content: &str) -> Result<ParsedFile> {
        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            module,
            syntax_tree,
        })
    }

    /// Parses every scanned file, returning one result per input.
    ///
    /// Failures are logged here; the caller decides whether they abort the run.
    pub fn parse_files(files: &[SourceFile]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", files.len());

        let results: Vec<Result<ParsedFile>> = files
            .iter()
            .map(|file| {
                Self::parse_in_module(&file.path, file.module.clone()).map_err(|e| {
                    warn!("Failed to parse {}: {:#}", file.path.display(), e);
                    e
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}
