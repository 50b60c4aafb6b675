//! Patch documents on disk.
//!
//! A patch file holds the text form of the dictionary written by
//! [`Patcher::write`]: plain UTF-8, pretty-printed. Writing truncates and
//! overwrites.

use std::path::Path;

use patchwerk_core::{Dico, Patcher, Runtime, TagRegistry};

use crate::error::ConfigError;

/// Extension of patch files.
pub const PATCH_EXTENSION: &str = "pwk";

/// Reads the document `filename` in `directory`.
pub fn read_document(
    tags: &TagRegistry,
    filename: &str,
    directory: impl AsRef<Path>,
) -> Result<Dico, ConfigError> {
    load(tags, &directory.as_ref().join(filename))
}

/// Writes `dico` as `filename` in `directory`, creating the directory when
/// missing.
pub fn write_document(
    dico: &Dico,
    filename: &str,
    directory: impl AsRef<Path>,
) -> Result<(), ConfigError> {
    store(dico, &directory.as_ref().join(filename))
}

/// Opens the patch file at `path` into a new patcher.
///
/// Every node type the file uses must be registered in `runtime`.
pub fn open_patch(runtime: &Runtime, path: impl AsRef<Path>) -> Result<Patcher, ConfigError> {
    let path = path.as_ref();
    let dico = load(runtime.tags(), path)?;
    let patcher = Patcher::new(runtime);
    patcher.add(&dico)?;
    tracing::info!(
        "opened {} ({} nodes, {} links)",
        path.display(),
        patcher.node_count(),
        patcher.link_count()
    );
    Ok(patcher)
}

/// Saves `patcher` to the patch file at `path`.
pub fn save_patch(patcher: &Patcher, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    store(&patcher.write(), path)?;
    tracing::info!("saved {}", path.display());
    Ok(())
}

fn load(tags: &TagRegistry, path: &Path) -> Result<Dico, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    Dico::from_text(tags, &content).map_err(|e| ConfigError::document(path, e))
}

fn store(dico: &Dico, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }
    let mut content = dico.to_text();
    content.push('\n');
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwerk_core::Atom;
    use tempfile::TempDir;

    #[test]
    fn document_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let tags = TagRegistry::new();
        let mut dico = Dico::new();
        dico.set_one(tags.intern("name"), tags.intern("+"));
        dico.set(tags.intern("position"), vec![Atom::Float(1.5), Atom::Float(2.5)]);

        write_document(&dico, "doc.pwk", temp_dir.path()).unwrap();
        let back = read_document(&tags, "doc.pwk", temp_dir.path()).unwrap();
        assert_eq!(back, dico);
    }

    #[test]
    fn write_creates_directory_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("deeper");
        let tags = TagRegistry::new();
        let key = tags.intern("v");

        let mut long = Dico::new();
        long.set(key.clone(), (0..50).map(Atom::from).collect::<Vec<_>>());
        write_document(&long, "doc.pwk", &dir).unwrap();

        let mut short = Dico::new();
        short.set_one(key.clone(), 1);
        write_document(&short, "doc.pwk", &dir).unwrap();

        let back = read_document(&tags, "doc.pwk", &dir).unwrap();
        assert_eq!(back.get(&key), [Atom::Int(1)]);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let tags = TagRegistry::new();
        let err = read_document(&tags, "absent.pwk", temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn malformed_file_is_a_document_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.pwk"), "[1, 2]").unwrap();
        let tags = TagRegistry::new();
        let err = read_document(&tags, "bad.pwk", temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Document { .. }));
    }
}
