//! The `openapi:` comment annotation grammar.
//!
//! [`lexer`] turns the doc-comment lines attached to one declaration into `(directive,
//! argument)` pairs, handling `start` blocks and the `---` description delimiter. [`record`]
//! folds those pairs into typed records for containers, fields, operations and the document.
//!
//! ```text
//! /// A pet in the store.
//! ///
//! /// openapi:schema Pet
//! /// openapi:xml pet
//! pub struct Pet { .. }
//! ```

pub mod lexer;
pub mod record;

pub use lexer::{doc_lines, has_directive, lex, CommentBlock, Directive, DELIMITER, NAMESPACE};
pub use record::{
    BodyAnnotation, ContainerAnnotations, DocumentAnnotations, ExternalDocs, FieldAnnotations,
    OperationAnnotations, ParamAnnotation, ResponseAnnotation, SecurityRequirement,
    ServerAnnotation, TagAnnotation,
};
