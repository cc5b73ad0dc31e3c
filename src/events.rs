//! Delivery of graph item events to subscribers.

use crate::geometry::EntityKind;
use crate::graph::{Graph, ItemAddedEvent};
use crate::tree::TreeView;
use tracing::{debug, trace};

/// Receives a notification for every entity of a subscribed kind added to
/// the graph.
pub trait ItemAddedSubscriber {
    /// The entity kinds this subscriber is registered for.
    fn subscriptions(&self) -> Vec<EntityKind>;

    /// Handles one event. `graph` may be mutated; items added here are
    /// delivered after the current event.
    fn item_added(&mut self, event: &ItemAddedEvent, graph: &mut Graph, tree: &TreeView);
}

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscription {
    id: SubscriberId,
    kinds: Vec<EntityKind>,
    subscriber: Box<dyn ItemAddedSubscriber>,
}

/// Serial event source over a [`Graph`]'s event queue.
#[derive(Default)]
pub struct EventDispatcher {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` for the kinds it reports at this point.
    pub fn subscribe(&mut self, subscriber: Box<dyn ItemAddedSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        let kinds = subscriber.subscriptions();
        debug!(?id, ?kinds, "subscriber registered");
        self.subscriptions.push(Subscription {
            id,
            kinds,
            subscriber,
        });
        id
    }

    /// Removes a subscriber and hands it back.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<Box<dyn ItemAddedSubscriber>> {
        let index = self.subscriptions.iter().position(|s| s.id == id)?;
        Some(self.subscriptions.remove(index).subscriber)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Delivers every queued event, oldest first, one fully handled before
    /// the next. Events queued by subscribers meanwhile are delivered in the
    /// same call. `tree` is refreshed before each delivery, so subscribers
    /// always see the frames that exist at that point. Returns the number of
    /// deliveries made.
    pub fn dispatch(&mut self, graph: &mut Graph, tree: &mut TreeView) -> usize {
        let mut delivered = 0;
        while let Some(event) = graph.pop_event() {
            let Some(kind) = event.payload.entity_kind() else {
                trace!(frame = %event.frame, "plugin item added");
                continue;
            };
            if tree.refresh(graph) {
                debug!(root = %tree.root(), frames = tree.len(), "tree view rebuilt");
            }
            for subscription in &mut self.subscriptions {
                if subscription.kinds.contains(&kind) {
                    subscription.subscriber.item_added(&event, graph, tree);
                    delivered += 1;
                }
            }
        }
        delivered
    }
}
