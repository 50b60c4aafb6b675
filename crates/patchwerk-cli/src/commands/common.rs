//! Shared CLI helpers used across multiple commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use patchwerk_config::{Settings, find_patch, read_document};
use patchwerk_core::{ConsoleHistory, NodeId, Patcher, Runtime};

/// A patch opened from disk.
///
/// Node IDs are reallocated when a document is added to a patcher, so the
/// IDs written in the file are kept alongside to let commands refer to
/// nodes the way the file does.
pub struct LoadedPatch {
    /// Resolved file path.
    pub path: PathBuf,
    /// Runtime hosting the patch, with the built-in node types installed.
    pub runtime: Runtime,
    /// The opened patch.
    pub patcher: Patcher,
    file_ids: HashMap<NodeId, i64>,
}

impl LoadedPatch {
    /// Returns the ID a node carries in the patch file.
    pub fn file_id(&self, id: NodeId) -> i64 {
        self.file_ids
            .get(&id)
            .copied()
            .unwrap_or_else(|| i64::from(id.index()))
    }

    /// Finds a node by its file ID, or else by its text or type name.
    pub fn find_node(&self, key: &str) -> Option<NodeId> {
        if let Ok(wanted) = key.parse::<i64>() {
            return self
                .file_ids
                .iter()
                .find(|(_, file_id)| **file_id == wanted)
                .map(|(id, _)| *id);
        }
        let nodes = self.patcher.nodes();
        nodes
            .iter()
            .find(|node| node.text() == key)
            .or_else(|| nodes.iter().find(|node| node.name().as_str() == key))
            .map(|node| node.id())
    }
}

/// Resolve a patch name or path using the configured patch directories.
pub fn resolve_patch(name: &str, settings: &Settings) -> anyhow::Result<PathBuf> {
    find_patch(name, &settings.patch_dirs).ok_or_else(|| {
        anyhow::anyhow!(
            "Patch '{}' not found. Searched the current directory, {} configured director{} and the user patches directory.",
            name,
            settings.patch_dirs.len(),
            if settings.patch_dirs.len() == 1 { "y" } else { "ies" }
        )
    })
}

/// Open a patch by name or path.
///
/// `listener` is attached to the console before any node is created, so it
/// sees what nodes post while loading.
pub fn load_patch(
    name: &str,
    settings: &Settings,
    listener: Option<&Arc<ConsoleHistory>>,
) -> anyhow::Result<LoadedPatch> {
    let path = resolve_patch(name, settings)?;
    let runtime = Runtime::new();
    patchwerk_registry::install(&runtime);
    if let Some(listener) = listener {
        runtime.console().add_listener(listener);
    }

    let (directory, filename) = split_path(&path)?;
    let document = read_document(runtime.tags(), filename, directory)?;
    let file_ids: Vec<i64> = document
        .get(&runtime.tag("objects"))
        .iter()
        .filter_map(|object| object.as_dico())
        .map(|object| object.get_first(&runtime.tag("id")).as_int())
        .collect();

    let patcher = Patcher::new(&runtime);
    let ids = patcher
        .add(&document)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    tracing::debug!(
        "loaded {} ({} nodes, {} links)",
        path.display(),
        patcher.node_count(),
        patcher.link_count()
    );

    Ok(LoadedPatch {
        path,
        runtime,
        patcher,
        file_ids: ids.into_iter().zip(file_ids).collect(),
    })
}

fn split_path(path: &Path) -> anyhow::Result<(&Path, &str)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid patch path: {}", path.display()))?;
    Ok((path.parent().unwrap_or_else(|| Path::new("")), filename))
}
