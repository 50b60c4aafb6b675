//! CLI command implementations.

pub mod common;
pub mod format;
pub mod info;
pub mod objects;
pub mod send;
