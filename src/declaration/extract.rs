use super::serde_attrs::{parse_container_serde, parse_field_serde};
use super::{
    Declaration, DeclarationKind, DeclarationTable, FieldDecl, Import, MethodDecl,
    OperationCandidate, Owner, VariantDecl,
};
use crate::annotation::{doc_lines, has_directive};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::module_path::{ModulePath, QualifiedName};
use crate::parser::ParsedFile;
use log::debug;
use std::path::Path;
use syn::visit::{self, Visit};

pub(super) fn extract_file(
    table: &mut DeclarationTable,
    file: &ParsedFile,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    debug!("Extracting declarations from {} ({})", file.path.display(), file.module);
    table.scope_mut(&file.module).files.push(file.path.clone());

    let mut visitor = DeclarationVisitor {
        table,
        diagnostics,
        source: &file.path,
        module: file.module.clone(),
        fatal: None,
    };
    visitor.visit_file(&file.syntax_tree);

    match visitor.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Records declarations while tracking the module inline `mod` blocks open.
///
/// Function bodies are not entered: items declared inside them are not reachable by path.
struct DeclarationVisitor<'a> {
    table: &'a mut DeclarationTable,
    diagnostics: &'a mut Diagnostics,
    source: &'a Path,
    module: ModulePath,
    fatal: Option<Error>,
}

impl DeclarationVisitor<'_> {
    fn record(&mut self, ident: &syn::Ident, attrs: &[syn::Attribute], generics: &syn::Generics, kind: DeclarationKind) {
        if self.fatal.is_some() {
            return;
        }

        let name = QualifiedName::new(self.module.clone(), unraw(ident));
        let docs = doc_lines(attrs);
        if docs.is_empty() {
            self.diagnostics.warn(
                name.to_string(),
                format!("{} has no attached comment", kind.label()),
            );
        }

        let declaration = Declaration {
            name,
            kind,
            docs,
            generics: generics
                .type_params()
                .map(|param| param.ident.to_string())
                .collect(),
            serde: parse_container_serde(attrs),
            source: self.source.to_path_buf(),
        };
        if let Err(err) = self.table.insert(declaration) {
            self.fatal = Some(err);
        }
    }

    fn candidate(&mut self, subject: String, attrs: &[syn::Attribute], owner: Option<&Owner>) {
        let docs = doc_lines(attrs);
        if !has_directive(&docs) {
            if owner.is_some() && docs.is_empty() {
                self.diagnostics.warn(subject, "method has no attached comment");
            } else {
                debug!("Skipping {}: no annotations", subject);
            }
            return;
        }

        self.table.push_candidate(OperationCandidate {
            subject,
            module: self.module.clone(),
            docs,
            owner: owner.cloned(),
            source: self.source.to_path_buf(),
        });
    }
}

impl<'ast> Visit<'ast> for DeclarationVisitor<'_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        // `mod foo;` is picked up through its own file
        if node.content.is_none() {
            return;
        }
        let child = self.module.child(&unraw(&node.ident));
        self.table.scope_mut(&child);
        let parent = std::mem::replace(&mut self.module, child);
        visit::visit_item_mod(self, node);
        self.module = parent;
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let kind = match &node.fields {
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => DeclarationKind::Alias {
                target: unnamed.unnamed[0].ty.clone(),
            },
            fields => DeclarationKind::Struct {
                fields: fields
                    .iter()
                    .map(|field| FieldDecl {
                        ident: field.ident.as_ref().map(unraw),
                        ty: field.ty.clone(),
                        docs: doc_lines(&field.attrs),
                        serde: parse_field_serde(&field.attrs),
                    })
                    .collect(),
            },
        };
        self.record(&node.ident, &node.attrs, &node.generics, kind);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        let variants = node
            .variants
            .iter()
            .map(|variant| VariantDecl {
                ident: unraw(&variant.ident),
                docs: doc_lines(&variant.attrs),
                serde: parse_field_serde(&variant.attrs),
                is_unit: matches!(variant.fields, syn::Fields::Unit),
            })
            .collect();
        self.record(
            &node.ident,
            &node.attrs,
            &node.generics,
            DeclarationKind::Enum { variants },
        );
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.record(
            &node.ident,
            &node.attrs,
            &node.generics,
            DeclarationKind::Alias {
                target: (*node.ty).clone(),
            },
        );
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        let trait_name = unraw(&node.ident);
        let owner = Owner {
            name: trait_name.clone(),
            docs: doc_lines(&node.attrs),
        };

        let mut methods = Vec::new();
        for item in &node.items {
            if let syn::TraitItem::Fn(method) = item {
                let ident = unraw(&method.sig.ident);
                self.candidate(format!("{}::{}", trait_name, ident), &method.attrs, Some(&owner));
                methods.push(MethodDecl {
                    ident,
                    docs: doc_lines(&method.attrs),
                });
            }
        }

        self.record(
            &node.ident,
            &node.attrs,
            &node.generics,
            DeclarationKind::Interface { methods },
        );
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        // Trait impls repeat the trait's own annotations
        if node.trait_.is_some() {
            return;
        }
        let syn::Type::Path(self_ty) = node.self_ty.as_ref() else {
            return;
        };
        let Some(segment) = self_ty.path.segments.last() else {
            return;
        };

        let owner = Owner {
            name: unraw(&segment.ident),
            docs: doc_lines(&node.attrs),
        };
        for item in &node.items {
            if let syn::ImplItem::Fn(method) = item {
                // Undocumented inherent methods are ordinary code, not missing annotations
                if doc_lines(&method.attrs).is_empty() {
                    continue;
                }
                let subject = format!("{}::{}", owner.name, unraw(&method.sig.ident));
                self.candidate(subject, &method.attrs, Some(&owner));
            }
        }
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        let subject = unraw(&node.sig.ident);
        self.candidate(subject, &node.attrs, None);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        let mut imports = Vec::new();
        flatten_use(&node.tree, &mut Vec::new(), &mut imports);
        self.table.scope_mut(&self.module).imports.extend(imports);
    }
}

fn flatten_use(tree: &syn::UseTree, prefix: &mut Vec<String>, out: &mut Vec<Import>) {
    match tree {
        syn::UseTree::Path(path) => {
            prefix.push(unraw(&path.ident));
            flatten_use(&path.tree, prefix, out);
            prefix.pop();
        }
        syn::UseTree::Name(name) => push_binding(prefix, &unraw(&name.ident), None, out),
        syn::UseTree::Rename(rename) => {
            push_binding(prefix, &unraw(&rename.ident), Some(unraw(&rename.rename)), out)
        }
        syn::UseTree::Glob(_) => out.push(Import {
            alias: "*".to_string(),
            path: prefix.clone(),
            glob: true,
        }),
        syn::UseTree::Group(group) => {
            for item in &group.items {
                flatten_use(item, prefix, out);
            }
        }
    }
}

fn push_binding(prefix: &[String], ident: &str, rename: Option<String>, out: &mut Vec<Import>) {
    let path = if ident == "self" {
        prefix.to_vec()
    } else {
        let mut path = prefix.to_vec();
        path.push(ident.to_string());
        path
    };
    let Some(last) = path.last() else {
        return;
    };
    // `use x as _;` binds nothing nameable
    let alias = rename.unwrap_or_else(|| last.clone());
    if alias == "_" {
        return;
    }
    out.push(Import {
        alias,
        path,
        glob: false,
    });
}

fn unraw(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    match name.strip_prefix("r#") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}
