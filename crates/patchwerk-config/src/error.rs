//! Error types for configuration and patch file operations.

use std::path::PathBuf;

use patchwerk_core::{DicoError, PatchError};
use thiserror::Error;

/// Errors that can occur during configuration and patch file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A patch file is not a valid document
    #[error("invalid patch document '{path}': {source}")]
    Document {
        /// Path of the offending file.
        path: PathBuf,
        /// Decoding error.
        #[source]
        source: DicoError,
    },

    /// The patcher refused the document
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Patch not found
    #[error("patch not found: {0}")]
    PatchNotFound(String),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create a document decoding error.
    pub fn document(path: impl Into<PathBuf>, source: DicoError) -> Self {
        ConfigError::Document {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwerk_core::{Dico, TagRegistry};
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_file_display() {
        let err = ConfigError::read_file("/a/b.pwk", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/a/b.pwk"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn create_dir_factory_produces_correct_variant() {
        let err = ConfigError::create_dir("/dir/path", mock_io_err());
        assert!(
            matches!(err, ConfigError::CreateDir { ref path, .. } if path == std::path::Path::new("/dir/path"))
        );
    }

    #[test]
    fn document_error_names_the_file_and_position() {
        let tags = TagRegistry::new();
        let source = Dico::from_text(&tags, "{\n  \"a\": }").unwrap_err();
        let err = ConfigError::document("/p/broken.pwk", source);
        let msg = err.to_string();
        assert!(msg.contains("/p/broken.pwk"), "got: {msg}");
        assert!(msg.contains("line 2"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn patch_not_found_display() {
        let err = ConfigError::PatchNotFound("synth".to_string());
        assert_eq!(err.to_string(), "patch not found: synth");
        assert!(err.source().is_none());
    }

    #[test]
    fn patch_error_is_transparent() {
        let err = ConfigError::from(PatchError::UnknownNodeType("zorg".to_string()));
        assert_eq!(err.to_string(), "unknown node type \"zorg\"");
    }
}
