//! Item plugins and the graph item that keeps them alive.

use crate::config_map::ConfigMap;
use crate::error::AttachError;
use crate::graph::Graph;
use crate::library::LibraryResolver;
use crate::tree::TreeView;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// An extension object attached to a frame.
pub trait ItemPlugin {
    /// Called once, right after resolution and before the plugin is stored
    /// in the graph. `config` is the plugin's own entry of the `plugins` list.
    fn init_plugin(&mut self, graph: &mut Graph, tree: &TreeView, frame: &str, config: &ConfigMap);

    /// Name of the library this plugin was created from.
    fn lib_name(&self) -> &str;
}

/// Graph item wrapping an initialized plugin.
///
/// The wrapped plugin is released when this item is dropped, i.e. together
/// with its frame or graph.
pub struct PluginItem {
    plugin: Box<dyn ItemPlugin>,
    lib_name: String,
}

impl PluginItem {
    /// Wraps `plugin`, recording `lib_name` as the name it was resolved by.
    pub fn new(plugin: Box<dyn ItemPlugin>, lib_name: impl Into<String>) -> Self {
        let lib_name = lib_name.into();
        if plugin.lib_name() != lib_name {
            warn!(
                library = %lib_name,
                reported = %plugin.lib_name(),
                "plugin reports a different library name"
            );
        }
        Self { plugin, lib_name }
    }

    pub fn lib_name(&self) -> &str {
        &self.lib_name
    }

    pub fn plugin(&self) -> &dyn ItemPlugin {
        self.plugin.as_ref()
    }

    /// The persisted form of this item.
    pub fn record(&self) -> PluginItemRecord {
        PluginItemRecord {
            lib_name: self.lib_name.clone(),
        }
    }
}

impl fmt::Debug for PluginItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginItem")
            .field("lib_name", &self.lib_name)
            .finish_non_exhaustive()
    }
}

/// Persisted form of a [`PluginItem`]: just the library name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginItemRecord {
    pub lib_name: String,
}

impl PluginItemRecord {
    /// Re-resolves the plugin. The original plugin configuration is not part
    /// of the record, so the restored plugin is not initialized again.
    pub fn restore<R>(&self, resolver: &mut R) -> Result<PluginItem, AttachError>
    where
        R: LibraryResolver + ?Sized,
    {
        let plugin = resolver.resolve_item_plugin(&self.lib_name)?;
        Ok(PluginItem::new(plugin, self.lib_name.clone()))
    }
}
