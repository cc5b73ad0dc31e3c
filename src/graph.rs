//! The shared scene graph: frames, rigid transforms between them, and the
//! items attached to each frame.

use crate::error::GraphError;
use crate::geometry::{Entity, EntityKind};
use crate::plugin::{PluginItem, PluginItemRecord};
use crate::tree::TreeView;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Name of a frame in the graph.
pub type FrameId = String;

/// Rigid transform from a parent frame to a child frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }
}

/// A value attached to a frame.
#[derive(Debug)]
pub enum Item {
    Entity(Entity),
    Plugin(PluginItem),
}

/// What an [`ItemAddedEvent`] carries.
#[derive(Clone, Debug)]
pub enum EventPayload {
    Entity(Entity),
    Plugin { lib_name: String },
}

impl EventPayload {
    /// The entity kind, `None` for plugin items.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Entity(entity) => Some(entity.kind()),
            Self::Plugin { .. } => None,
        }
    }
}

/// Raised once per item added to the graph.
#[derive(Clone, Debug)]
pub struct ItemAddedEvent {
    pub frame: FrameId,
    pub payload: EventPayload,
}

#[derive(Debug, Default)]
struct Frame {
    items: Vec<Item>,
    parent: Option<FrameId>,
    children: Vec<(FrameId, Transform)>,
}

/// Frames connected by parent/child edges, each holding a list of items.
#[derive(Debug, Default)]
pub struct Graph {
    frames: HashMap<FrameId, Frame>,
    // Keeps `frames()` in insertion order.
    order: Vec<FrameId>,
    pending: VecDeque<ItemAddedEvent>,
    // Bumped on every change to frames or edges.
    revision: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, id: impl Into<FrameId>) -> Result<(), GraphError> {
        let id = id.into();
        if self.frames.contains_key(&id) {
            return Err(GraphError::DuplicateFrame(id));
        }
        self.frames.insert(id.clone(), Frame::default());
        self.order.push(id);
        self.revision += 1;
        Ok(())
    }

    /// Changes whenever a frame or edge is added or removed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains_frame(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    /// Frame ids in insertion order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameId> {
        self.order.iter()
    }

    /// Connects `child` below `parent`. A frame has at most one parent.
    pub fn add_edge(
        &mut self,
        parent: &str,
        child: &str,
        transform: Transform,
    ) -> Result<(), GraphError> {
        if parent == child {
            return Err(GraphError::SelfLoop(parent.to_owned()));
        }
        if !self.contains_frame(parent) {
            return Err(GraphError::UnknownFrame(parent.to_owned()));
        }
        let child_frame = self
            .frames
            .get_mut(child)
            .ok_or_else(|| GraphError::UnknownFrame(child.to_owned()))?;
        if let Some(existing) = &child_frame.parent {
            return Err(GraphError::AlreadyParented {
                child: child.to_owned(),
                parent: existing.clone(),
            });
        }
        child_frame.parent = Some(parent.to_owned());

        if let Some(parent_frame) = self.frames.get_mut(parent) {
            parent_frame.children.push((child.to_owned(), transform));
        }
        self.revision += 1;
        Ok(())
    }

    pub fn parent(&self, frame: &str) -> Option<&FrameId> {
        self.frames.get(frame)?.parent.as_ref()
    }

    /// Children of `frame` with the transform of each edge.
    pub fn children(&self, frame: &str) -> &[(FrameId, Transform)] {
        self.frames
            .get(frame)
            .map(|frame| frame.children.as_slice())
            .unwrap_or_default()
    }

    /// Attaches `item` to `frame` and queues an [`ItemAddedEvent`] for it.
    pub fn add_item_to_frame(&mut self, frame: &str, item: Item) -> Result<(), GraphError> {
        let target = self
            .frames
            .get_mut(frame)
            .ok_or_else(|| GraphError::UnknownFrame(frame.to_owned()))?;

        let payload = match &item {
            Item::Entity(entity) => EventPayload::Entity(entity.clone()),
            Item::Plugin(plugin) => EventPayload::Plugin {
                lib_name: plugin.lib_name().to_owned(),
            },
        };
        target.items.push(item);
        self.pending.push_back(ItemAddedEvent {
            frame: frame.to_owned(),
            payload,
        });
        Ok(())
    }

    pub fn items(&self, frame: &str) -> &[Item] {
        self.frames
            .get(frame)
            .map(|frame| frame.items.as_slice())
            .unwrap_or_default()
    }

    pub fn entities<'a>(&'a self, frame: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.items(frame).iter().filter_map(|item| match item {
            Item::Entity(entity) => Some(entity),
            Item::Plugin(_) => None,
        })
    }

    pub fn plugin_items<'a>(&'a self, frame: &str) -> impl Iterator<Item = &'a PluginItem> + 'a {
        self.items(frame).iter().filter_map(|item| match item {
            Item::Plugin(plugin) => Some(plugin),
            Item::Entity(_) => None,
        })
    }

    /// Removes `frame`, its edges and its items. Plugin items are released
    /// and queued events for the frame are discarded.
    ///
    /// Children become roots; they are not removed.
    pub fn remove_frame(&mut self, frame: &str) -> Result<(), GraphError> {
        let removed = self
            .frames
            .remove(frame)
            .ok_or_else(|| GraphError::UnknownFrame(frame.to_owned()))?;
        self.order.retain(|id| id != frame);
        self.pending.retain(|event| event.frame != frame);
        self.revision += 1;

        if let Some(parent) = removed.parent.as_deref()
            && let Some(parent_frame) = self.frames.get_mut(parent)
        {
            parent_frame.children.retain(|(child, _)| child != frame);
        }
        for (child, _) in &removed.children {
            if let Some(child_frame) = self.frames.get_mut(child) {
                child_frame.parent = None;
            }
        }
        Ok(())
    }

    /// Drains queued item events, oldest first.
    pub fn take_events(&mut self) -> Vec<ItemAddedEvent> {
        self.pending.drain(..).collect()
    }

    pub(crate) fn pop_event(&mut self) -> Option<ItemAddedEvent> {
        self.pending.pop_front()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Breadth-first spanning tree rooted at `root`.
    pub fn tree_view(&self, root: &str) -> Result<TreeView, GraphError> {
        if !self.contains_frame(root) {
            return Err(GraphError::UnknownFrame(root.to_owned()));
        }
        Ok(TreeView::build(self, root))
    }

    /// Persisted form of every plugin item, keyed by frame.
    ///
    /// Frames without plugin items are left out.
    pub fn snapshot_plugins(&self) -> BTreeMap<FrameId, Vec<PluginItemRecord>> {
        self.order
            .iter()
            .filter_map(|frame| {
                let records: Vec<_> = self.plugin_items(frame).map(PluginItem::record).collect();
                (!records.is_empty()).then(|| (frame.clone(), records))
            })
            .collect()
    }
}
