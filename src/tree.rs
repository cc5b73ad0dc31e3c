//! Read-only tree view over the frames reachable from a root frame.

use crate::graph::{FrameId, Graph};
use std::collections::{HashMap, VecDeque};

/// A breadth-first spanning tree of a [`Graph`].
///
/// The view is a snapshot of the graph revision it was built from.
/// [`refresh`](Self::refresh) brings it back in step after frames or edges
/// changed; [`EventDispatcher::dispatch`](crate::EventDispatcher::dispatch)
/// does so before every delivery.
#[derive(Clone, Debug, Default)]
pub struct TreeView {
    root: FrameId,
    parents: HashMap<FrameId, FrameId>,
    children: HashMap<FrameId, Vec<FrameId>>,
    depths: HashMap<FrameId, usize>,
    revision: u64,
}

impl TreeView {
    pub(crate) fn build(graph: &Graph, root: &str) -> Self {
        let mut view = Self {
            root: root.to_owned(),
            revision: graph.revision(),
            ..Default::default()
        };
        // A removed root leaves an empty view.
        if !graph.contains_frame(root) {
            return view;
        }
        view.depths.insert(root.to_owned(), 0);

        let mut queue = VecDeque::from([(root.to_owned(), 0usize)]);
        while let Some((frame, depth)) = queue.pop_front() {
            for (child, _) in graph.children(&frame) {
                if view.depths.contains_key(child) {
                    continue;
                }
                view.depths.insert(child.clone(), depth + 1);
                view.parents.insert(child.clone(), frame.clone());
                view.children
                    .entry(frame.clone())
                    .or_default()
                    .push(child.clone());
                queue.push_back((child.clone(), depth + 1));
            }
        }
        view
    }

    /// Rebuilds the view if `graph` changed since it was built. Returns
    /// whether a rebuild happened.
    pub fn refresh(&mut self, graph: &Graph) -> bool {
        if self.revision == graph.revision() {
            return false;
        }
        let root = std::mem::take(&mut self.root);
        *self = Self::build(graph, &root);
        true
    }

    pub fn root(&self) -> &FrameId {
        &self.root
    }

    pub fn contains(&self, frame: &str) -> bool {
        self.depths.contains_key(frame)
    }

    pub fn parent(&self, frame: &str) -> Option<&FrameId> {
        self.parents.get(frame)
    }

    pub fn children(&self, frame: &str) -> &[FrameId] {
        self.children.get(frame).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distance from the root; the root itself has depth 0.
    pub fn depth(&self, frame: &str) -> Option<usize> {
        self.depths.get(frame).copied()
    }

    /// Number of frames in the view.
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}
