//! # scene-item-plugins
//!
//! Attaches item plugins to the frames of a scene graph.
//!
//! Geometry and link entities carry a free-form configuration map. When such
//! an entity is added to the [`Graph`] and its configuration lists `plugins`,
//! the [`PluginAttacher`] resolves each entry's `plugin_lib_name` through a
//! [`LibraryResolver`], initializes the plugin against the graph at the
//! entity's frame and stores it there as a [`PluginItem`].
//!
//! The graph, its [`TreeView`] and the resolver are always passed in
//! explicitly; nothing in this crate holds global state.

pub mod attacher;
pub mod config_map;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod library;
pub mod plugin;
pub mod tree;

pub use attacher::*;
pub use config_map::*;
pub use error::*;
pub use events::*;
pub use geometry::*;
pub use graph::*;
pub use library::*;
pub use plugin::*;
pub use tree::*;
