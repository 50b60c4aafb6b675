//! Patch files, settings and platform paths for the patchwerk dataflow patcher.
//!
//! # Features
//!
//! - **Documents**: Read and write patch documents in their JSON text form
//! - **Patches**: Open a file into a [`Patcher`](patchwerk_core::Patcher) and save it back
//! - **Settings**: Runtime settings (log filter, audio format, patch search path) in TOML
//! - **Paths**: Platform-specific config and patch directories
//!
//! # Example
//!
//! ```rust,no_run
//! use patchwerk_config::{Settings, open_patch, save_patch, user_patches_dir};
//! use patchwerk_core::Runtime;
//!
//! let settings = Settings::load_or_default().unwrap();
//!
//! let runtime = Runtime::new();
//! patchwerk_registry::install(&runtime);
//! let patcher = open_patch(&runtime, "counter.pwk").unwrap();
//!
//! save_patch(&patcher, user_patches_dir().join("counter.pwk")).unwrap();
//! ```

mod document;
mod error;
mod settings;

/// Platform-specific paths for patches and configuration.
pub mod paths;

pub use document::{PATCH_EXTENSION, open_patch, read_document, save_patch, write_document};
pub use error::ConfigError;
pub use paths::{
    ensure_user_config_dir, ensure_user_patches_dir, find_patch, list_patches_in_dir,
    patch_name_from_path, settings_path, user_config_dir, user_patches_dir,
};
pub use settings::Settings;
