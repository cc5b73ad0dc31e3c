//! Attaches item plugins requested by entity configurations.
//!
//! The entry point is [`PluginAttacher`]. Subscribe it to an
//! [`EventDispatcher`](crate::EventDispatcher) and every supported entity
//! added to the graph has its `plugins` list resolved, initialized and stored
//! next to it on the same frame.
//!
//! A configuration requesting two plugins looks like this:
//!
//! ```yaml
//! name: wheel
//! plugins:
//!   - plugin_lib_name: odometry
//!     rate: 50
//!   - plugin_lib_name: wheel_slip
//! ```

use crate::config_map::{ConfigItem, ConfigMap};
use crate::error::{AttachError, ConfigError, GraphError};
use crate::events::ItemAddedSubscriber;
use crate::geometry::{Entity, EntityKind, FullConfigMap};
use crate::graph::{EventPayload, Graph, Item, ItemAddedEvent};
use crate::library::{LibInterface, LibraryResolver};
use crate::plugin::{ItemPlugin, PluginItem};
use crate::tree::TreeView;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// What happens to the rest of a `plugins` list after one entry fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing entry. Earlier attachments stay.
    #[default]
    FailFast,
    /// Log the failing entry and continue with the next one.
    SkipEntry,
}

/// Configuration for plugin attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttacherConfig {
    pub policy: FailurePolicy,
    /// Key of the plugin list in an entity configuration. Default: `plugins`.
    pub plugins_key: String,
    /// Key of the library name in a plugin entry. Default: `plugin_lib_name`.
    pub lib_name_key: String,
}

impl Default for AttacherConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::FailFast,
            plugins_key: "plugins".to_owned(),
            lib_name_key: "plugin_lib_name".to_owned(),
        }
    }
}

impl AttacherConfig {
    /// Reads a configuration from YAML. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Outcome of handling one entity configuration.
#[derive(Debug, Default)]
pub struct AttachReport {
    /// Library names attached, in list order.
    pub attached: Vec<String>,
    pub failures: Vec<AttachError>,
}

impl AttachReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves and attaches the item plugins that entity configurations ask for.
pub struct PluginAttacher<R> {
    resolver: R,
    config: AttacherConfig,
}

impl<R: LibraryResolver> PluginAttacher<R> {
    /// Library name under which the attacher itself is known.
    pub const LIB_NAME: &'static str = "scene_item_plugins";

    /// Creates an attacher with the default configuration.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            config: AttacherConfig::default(),
        }
    }

    /// Replaces the configuration (builder pattern).
    pub fn with_config(mut self, config: AttacherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AttacherConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn into_resolver(self) -> R {
        self.resolver
    }

    /// Handles an entity that was added to `frame`.
    pub fn entity_added(
        &mut self,
        graph: &mut Graph,
        tree: &TreeView,
        entity: &Entity,
        frame: &str,
    ) -> AttachReport {
        let config = entity.full_config_map();
        self.handle_config(graph, tree, &config, frame)
    }

    /// Attaches every plugin listed in `config` to `frame`.
    ///
    /// Without a plugin list this is a no-op that leaves the graph untouched.
    /// Entries are processed in list order; failures are logged and reported
    /// but never undo earlier attachments. Handling the same configuration
    /// twice attaches everything twice.
    pub fn handle_config(
        &mut self,
        graph: &mut Graph,
        tree: &TreeView,
        config: &ConfigMap,
        frame: &str,
    ) -> AttachReport {
        let mut report = AttachReport::default();

        let entries = match config.get(self.config.plugins_key.as_str()) {
            None | Some(ConfigItem::Null) => {
                debug!(frame = %frame, "no plugins requested");
                return report;
            }
            Some(ConfigItem::Sequence(entries)) => entries,
            Some(_) => {
                let err = AttachError::MalformedPlugins {
                    key: self.config.plugins_key.clone(),
                    frame: frame.to_owned(),
                };
                error!(frame = %frame, error = %err, "cannot attach item plugins");
                report.failures.push(err);
                return report;
            }
        };

        for entry in entries {
            match self.attach_entry(graph, tree, entry, frame) {
                Ok(lib_name) => {
                    info!(frame = %frame, library = %lib_name, "item plugin attached");
                    report.attached.push(lib_name);
                }
                Err(err) => {
                    error!(
                        frame = %frame,
                        library = %err.library().unwrap_or("-"),
                        error = %err,
                        "cannot attach item plugin"
                    );
                    report.failures.push(err);
                    if self.config.policy == FailurePolicy::FailFast {
                        break;
                    }
                }
            }
        }
        report
    }

    /// Resolve, initialize and store a single plugin entry.
    fn attach_entry(
        &mut self,
        graph: &mut Graph,
        tree: &TreeView,
        entry: &ConfigItem,
        frame: &str,
    ) -> Result<String, AttachError> {
        let key = self.config.lib_name_key.as_str();
        let Some((entry, lib_name)) = entry
            .as_mapping()
            .and_then(|map| lib_name_of(map.get(key)?).map(|name| (map, name)))
        else {
            return Err(AttachError::MissingLibName {
                key: key.to_owned(),
                frame: frame.to_owned(),
            });
        };

        // Nothing is resolved or initialized for a frame that does not exist.
        if !graph.contains_frame(frame) {
            return Err(GraphError::UnknownFrame(frame.to_owned()).into());
        }

        let mut plugin = self.resolver.resolve_item_plugin(&lib_name)?;
        plugin.init_plugin(graph, tree, frame, entry);

        let item = PluginItem::new(plugin, lib_name.clone());
        graph
            .add_item_to_frame(frame, Item::Plugin(item))
            .map_err(|source| AttachError::Graph {
                library: Some(lib_name.clone()),
                source,
            })?;
        Ok(lib_name)
    }
}

/// Library names are strings; numeric scalars are accepted in their textual form.
fn lib_name_of(value: &ConfigItem) -> Option<String> {
    match value {
        ConfigItem::String(name) => Some(name.clone()),
        ConfigItem::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl<R: LibraryResolver> ItemAddedSubscriber for PluginAttacher<R> {
    fn subscriptions(&self) -> Vec<EntityKind> {
        EntityKind::ALL.to_vec()
    }

    fn item_added(&mut self, event: &ItemAddedEvent, graph: &mut Graph, tree: &TreeView) {
        if let EventPayload::Entity(entity) = &event.payload {
            // Failures are already logged per entry.
            let _ = self.entity_added(graph, tree, entity, &event.frame);
        }
    }
}

impl<R: LibraryResolver + 'static> LibInterface for PluginAttacher<R> {
    fn lib_name(&self) -> &str {
        Self::LIB_NAME
    }

    fn into_item_plugin(self: Box<Self>) -> Result<Box<dyn ItemPlugin>, Box<dyn LibInterface>> {
        Err(self)
    }
}
