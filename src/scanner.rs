use crate::module_path::ModulePath;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing source directories.
///
/// The `FileScanner` recursively walks a directory to find all Rust source files and assigns
/// each one the module path it has inside its crate. It skips `target` and hidden directories
/// (those starting with `.`).
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-service/src"));
/// let result = scanner.scan().unwrap();
/// for file in &result.rust_files {
///     println!("{} -> {}", file.path.display(), file.module);
/// }
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// A discovered source file and the module it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub module: ModulePath,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Discovered `.rs` files, sorted by path
    pub rust_files: Vec<SourceFile>,
    /// Directory module paths are relative to (the crate's `src/` when one encloses the scan root)
    pub source_root: PathBuf,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// Inaccessible entries are recorded as warnings and scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be accessed.
    pub fn scan(&self) -> Result<ScanResult> {
        let root = fs::canonicalize(&self.root_path)
            .with_context(|| format!("Failed to access directory: {}", self.root_path.display()))?;
        let source_root = find_source_root(&root);
        debug!(
            "Scanning {} (modules relative to {})",
            root.display(),
            source_root.display()
        );

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == root {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        let relative = path
                            .strip_prefix(&source_root)
                            .or_else(|_| path.strip_prefix(&root))
                            .unwrap_or(path);
                        rust_files.push(SourceFile {
                            path: path.to_path_buf(),
                            module: ModulePath::from_relative_file(relative),
                        });
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort_by(|a, b| a.path.cmp(&b.path));

        // `main.rs` beside `lib.rs` is a separate binary crate, not part of the library root
        let library = source_root.join("lib.rs");
        let binary = source_root.join("main.rs");
        if rust_files.iter().any(|f| f.path == library) {
            rust_files.retain(|f| {
                let keep = f.path != binary;
                if !keep {
                    debug!("Skipping binary crate root {}", binary.display());
                }
                keep
            });
        }

        Ok(ScanResult {
            rust_files,
            source_root,
            warnings,
        })
    }
}

/// Locates the `src/` directory of the crate enclosing `dir`, falling back to `dir` itself.
fn find_source_root(dir: &Path) -> PathBuf {
    for ancestor in dir.ancestors() {
        if ancestor.join("Cargo.toml").is_file() {
            let src = ancestor.join("src");
            if src.is_dir() && (ancestor == dir || dir.starts_with(&src)) {
                return src;
            }
            break;
        }
    }
    dir.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn modules_of(result: &ScanResult) -> Vec<String> {
        result
            .rust_files
            .iter()
            .map(|f| f.module.to_string())
            .collect()
    }

    #[test]
    fn test_scan_plain_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("lib.rs"), "pub mod models;").unwrap();
        fs::write(root.join("models.rs"), "pub struct Pet {}").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 2);
        assert!(result.warnings.is_empty());
        assert_eq!(modules_of(&result), vec!["crate", "crate::models"]);
    }

    #[test]
    fn test_scan_crate_directory_uses_src_as_module_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("Cargo.toml"), "[package]\nname = \"pets\"").unwrap();
        fs::create_dir_all(root.join("src/models")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/models/mod.rs"), "pub mod pet;").unwrap();
        fs::write(root.join("src/models/pet.rs"), "pub struct Pet {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(
            modules_of(&result),
            vec!["crate", "crate::models", "crate::models::pet"]
        );
        assert!(result.source_root.ends_with("src"));
    }

    #[test]
    fn test_scan_skips_binary_root_beside_library_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("Cargo.toml"), "[package]\nname = \"pets\"").unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/lib.rs"), "pub struct Config {}").unwrap();
        fs::write(root.join("src/main.rs"), "struct Config {}\nfn main() {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(modules_of(&result), vec!["crate"]);
        assert!(result.rust_files[0].path.ends_with("src/lib.rs"));
    }

    #[test]
    fn test_scan_subdirectory_of_crate_keeps_crate_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("Cargo.toml"), "[package]\nname = \"pets\"").unwrap();
        fs::create_dir_all(root.join("src/api")).unwrap();
        fs::write(root.join("src/api/pets.rs"), "pub trait PetApi {}").unwrap();

        let result = FileScanner::new(root.join("src/api")).scan().unwrap();

        assert_eq!(modules_of(&result), vec!["crate::api::pets"]);
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/build.rs"), "fn main() {}").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/config.rs"), "// config").unwrap();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        // Should only find main.rs
        assert_eq!(result.rust_files.len(), 1);
        assert_eq!(
            result.rust_files[0].path.file_name().unwrap().to_string_lossy(),
            "main.rs"
        );
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        assert!(FileScanner::new(missing).scan().is_err());
    }
}
