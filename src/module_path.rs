//! Module paths and qualified declaration names.
//!
//! A module path is the `crate::a::b` location of a source file or inline module. Every
//! declaration is keyed by its [`QualifiedName`], which is also the canonical name used to
//! intern schemas.

use std::fmt;
use std::path::{Component, Path};

/// Path of a module relative to the crate root (`crate` itself has no segments).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Derives the module path of a file from its location relative to the crate's `src/`.
    ///
    /// `lib.rs` and `main.rs` at the top are the crate root, `mod.rs` names its directory.
    pub fn from_relative_file(relative: &Path) -> Self {
        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();

        if let Some(last) = segments.pop() {
            let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
            let names_parent = stem == "mod" || (segments.is_empty() && (stem == "lib" || stem == "main"));
            if !names_parent {
                segments.push(stem);
            }
        }

        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn join<S: AsRef<str>>(&self, rest: &[S]) -> Self {
        let mut segments = self.0.clone();
        segments.extend(rest.iter().map(|s| s.as_ref().to_string()));
        Self(segments)
    }

    /// Dotted form used to disambiguate colliding component names.
    pub fn dotted(&self) -> String {
        if self.0.is_empty() {
            "crate".to_string()
        } else {
            self.0.join(".")
        }
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "crate")?;
        for segment in &self.0 {
            write!(f, "::{}", segment)?;
        }
        Ok(())
    }
}

/// Fully qualified name of a declaration: its module plus its local identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub module: ModulePath,
    pub name: String,
}

impl QualifiedName {
    pub fn new(module: ModulePath, name: impl Into<String>) -> Self {
        Self {
            module,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}
