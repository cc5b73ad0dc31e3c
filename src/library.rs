//! Name-based resolution of plugin libraries.
//!
//! A [`LibraryResolver`] hands out fresh [`LibInterface`] instances by library
//! name and can be asked to load a library it does not know yet. The
//! [`LibManager`] is an in-memory resolver backed by registered factories.

use crate::error::AttachError;
use crate::plugin::ItemPlugin;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Base contract of everything a library resolver can instantiate.
pub trait LibInterface: 'static {
    fn lib_name(&self) -> &str;

    fn lib_version(&self) -> i32 {
        1
    }

    /// Narrows this instance to the item plugin contract.
    ///
    /// Implementors that are item plugins return `Ok(self)`; all others hand
    /// themselves back unchanged as `Err(self)`.
    fn into_item_plugin(self: Box<Self>) -> Result<Box<dyn ItemPlugin>, Box<dyn LibInterface>>;
}

/// Produces one fresh instance of a library per call.
pub type LibFactory = Box<dyn Fn() -> Box<dyn LibInterface>>;

/// Source of library instances, looked up by name.
pub trait LibraryResolver {
    /// A fresh instance of `name`, or `None` if the library is not loaded.
    fn get_new_instance(&mut self, name: &str) -> Option<Box<dyn LibInterface>>;

    /// Loads `name`. Best effort: failure only shows up as a later
    /// [`get_new_instance`](Self::get_new_instance) returning `None`.
    fn load_library(&mut self, name: &str);

    /// Resolves `name` to a verified item plugin.
    ///
    /// Tries a fresh instance first and loads the library once if that fails.
    /// An instance that is not an item plugin is dropped before returning.
    fn resolve_item_plugin(&mut self, name: &str) -> Result<Box<dyn ItemPlugin>, AttachError> {
        let instance = match self.get_new_instance(name) {
            Some(instance) => instance,
            None => {
                debug!(library = %name, "library not loaded, trying to load it");
                self.load_library(name);
                self.get_new_instance(name)
                    .ok_or_else(|| AttachError::LibraryNotFound {
                        library: name.to_owned(),
                    })?
            }
        };

        instance.into_item_plugin().map_err(|rejected| {
            debug!(
                library = %name,
                reported = %rejected.lib_name(),
                "releasing instance without item plugin contract"
            );
            AttachError::NotAnItemPlugin {
                library: name.to_owned(),
            }
        })
    }
}

struct LibraryEntry {
    factory: LibFactory,
    loaded: bool,
    instances: usize,
}

/// In-memory library resolver.
///
/// Libraries are *registered* (available, comparable to being installed on
/// disk) and only hand out instances once *loaded*.
#[derive(Default)]
pub struct LibManager {
    libraries: HashMap<String, LibraryEntry>,
}

impl LibManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `name` available for [`load_library`](LibraryResolver::load_library).
    ///
    /// Registering an already known name replaces its factory and keeps its
    /// loaded state.
    pub fn register_library<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn LibInterface> + 'static,
    {
        let name = name.into();
        let loaded = self.is_loaded(&name);
        self.libraries.insert(
            name,
            LibraryEntry {
                factory: Box::new(factory),
                loaded,
                instances: 0,
            },
        );
    }

    /// Registers and loads `name` in one step.
    pub fn register_loaded<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn LibInterface> + 'static,
    {
        let name = name.into();
        self.register_library(name.clone(), factory);
        self.load_library(&name);
    }

    /// Builder form of [`register_loaded`](Self::register_loaded).
    pub fn with_loaded_library<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn LibInterface> + 'static,
    {
        self.register_loaded(name, factory);
        self
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.libraries.get(name).is_some_and(|entry| entry.loaded)
    }

    /// Number of instances handed out for `name` so far.
    pub fn instances_created(&self, name: &str) -> usize {
        self.libraries.get(name).map_or(0, |entry| entry.instances)
    }

    /// Names of all loaded libraries, sorted.
    pub fn loaded_libraries(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .libraries
            .iter()
            .filter(|(_, entry)| entry.loaded)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl LibraryResolver for LibManager {
    fn get_new_instance(&mut self, name: &str) -> Option<Box<dyn LibInterface>> {
        let entry = self.libraries.get_mut(name).filter(|entry| entry.loaded)?;
        entry.instances += 1;
        Some((entry.factory)())
    }

    fn load_library(&mut self, name: &str) {
        match self.libraries.get_mut(name) {
            Some(entry) => {
                if !entry.loaded {
                    debug!(library = %name, "library loaded");
                }
                entry.loaded = true;
            }
            None => warn!(library = %name, "no such library available"),
        }
    }
}
