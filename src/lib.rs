//! OpenAPI documents from `openapi:` annotations in Rust doc comments.
//!
//! Types opt in as component schemas with `/// openapi:schema`; trait methods, inherent
//! methods and free functions become operations with `/// openapi:operation GET /pets listPets`
//! plus body, response and parameter directives. Document metadata lives in the crate root's
//! inner doc comments.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds `.rs` files and the module each one defines
//! 2. [`parser`] - Parses them with `syn`
//! 3. [`annotation`] - Lexes doc comments into directives and typed annotation records
//! 4. [`declaration`] - Extracts every type, trait, impl, function and import into a table
//! 5. [`type_resolver`] - Classifies type expressions and resolves names across modules
//! 6. [`schema_generator`] - Synthesizes interned component schemas
//! 7. [`operation`] - Assembles operations from annotated methods and functions
//! 8. [`openapi_builder`] - Builds the document
//! 9. [`generator`] - Runs the pipeline end to end
//! 10. [`merge`] and [`serializer`] - Overlay override documents and write YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_comments::{
//!     generator::Generator,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     type_resolver::FsModuleLoader,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./petstore")).scan().unwrap();
//! let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let generation = Generator::new()
//!     .with_loader(Box::new(FsModuleLoader::new(vec![scan_result.source_root])))
//!     .generate(&parsed_files)
//!     .unwrap();
//! for diagnostic in generation.diagnostics.iter() {
//!     eprintln!("{}", diagnostic);
//! }
//! println!("{}", serialize_yaml(&generation.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod declaration;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod merge;
pub mod module_path;
pub mod openapi_builder;
pub mod operation;
pub mod parser;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod type_resolver;
