//! Platform-specific paths for patches and configuration.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/patchwerk/` (Linux), `~/Library/Application Support/patchwerk/` (macOS), `%APPDATA%\patchwerk\` (Windows)
//! - **User patches**: `patches/` inside the user config directory
//! - **Settings**: `settings.toml` inside the user config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use patchwerk_config::paths;
//!
//! // Find a patch by name (current directory, extra directories, then user patches)
//! if let Some(path) = paths::find_patch("counter", &[]) {
//!     println!("Found patch at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::document::PATCH_EXTENSION;

/// Application name used for directory paths.
const APP_NAME: &str = "patchwerk";

/// Subdirectory name for patches.
const PATCHES_SUBDIR: &str = "patches";

/// File name of the settings file.
const SETTINGS_FILE: &str = "settings.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific patches directory.
pub fn user_patches_dir() -> PathBuf {
    user_config_dir().join(PATCHES_SUBDIR)
}

/// Returns the path of the user settings file.
pub fn settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}

/// Find a patch file by name.
///
/// Searches in the following order:
/// 1. The name itself, if it is an existing file
/// 2. Each of `extra_dirs`, in order
/// 3. User patches directory
///
/// The patch extension is added when the name has none.
pub fn find_patch(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if path.extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.{PATCH_EXTENSION}")
    };

    extra_dirs
        .iter()
        .cloned()
        .chain(std::iter::once(user_patches_dir()))
        .map(|dir| dir.join(&filename))
        .find(|candidate| candidate.is_file())
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    ensure_dir(user_config_dir())
}

/// Ensure the user patches directory exists.
pub fn ensure_user_patches_dir() -> Result<PathBuf, crate::ConfigError> {
    ensure_dir(user_patches_dir())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, crate::ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// List the patch files in a directory, sorted by path.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_patches_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut patches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == PATCH_EXTENSION))
        .collect();
    patches.sort();
    patches
}

/// Get the patch name from a file path.
///
/// ```rust
/// use patchwerk_config::paths::patch_name_from_path;
/// use std::path::Path;
///
/// let name = patch_name_from_path(Path::new("/path/to/counter.pwk"));
/// assert_eq!(name, Some("counter".to_string()));
/// ```
pub fn patch_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_dirs() {
        assert!(user_config_dir().to_string_lossy().contains("patchwerk"));
        assert!(user_patches_dir().ends_with("patchwerk/patches"));
        assert!(settings_path().ends_with("patchwerk/settings.toml"));
    }

    #[test]
    fn test_find_patch_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let patch_path = temp_dir.path().join("test.pwk");
        fs::write(&patch_path, "{}").unwrap();

        let found = find_patch(patch_path.to_str().unwrap(), &[]);
        assert_eq!(found, Some(patch_path));
    }

    #[test]
    fn test_find_patch_in_extra_dir_adds_extension() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("synth.pwk"), "{}").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = find_patch("synth", &dirs);
        assert_eq!(found, Some(second.path().join("synth.pwk")));
    }

    #[test]
    fn test_find_patch_not_found() {
        assert!(find_patch("nonexistent_patch_12345", &[]).is_none());
    }

    #[test]
    fn test_list_patches_in_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.pwk"), "{}").unwrap();
        fs::write(temp_dir.path().join("a.pwk"), "{}").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let patches = list_patches_in_dir(temp_dir.path());
        let names: Vec<String> = patches.iter().filter_map(|p| patch_name_from_path(p)).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_list_patches_nonexistent_dir() {
        assert!(list_patches_in_dir(Path::new("/nonexistent/path/12345")).is_empty());
    }
}
