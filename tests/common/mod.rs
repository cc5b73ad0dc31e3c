#![allow(dead_code)]

use scene_item_plugins::{
    ConfigMap, Graph, ItemPlugin, LibInterface, LibManager, Transform, TreeView,
    parse_config_map,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// What a recorder plugin saw when it was initialized.
#[derive(Clone, Debug)]
pub struct InitCall {
    pub library: String,
    pub frame: String,
    pub config: ConfigMap,
    pub tree_root: String,
    /// Whether the tree handed to the plugin already knew its frame.
    pub frame_in_tree: bool,
}

/// Counters shared between a test and the plugin instances it creates.
#[derive(Clone, Default)]
pub struct Recordings {
    pub inits: Rc<RefCell<Vec<InitCall>>>,
    pub drops: Rc<Cell<usize>>,
}

/// An item plugin that records its initialization and release.
pub struct Recorder {
    library: String,
    recorded: Recordings,
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.recorded.drops.set(self.recorded.drops.get() + 1);
    }
}

impl ItemPlugin for Recorder {
    fn init_plugin(&mut self, _: &mut Graph, tree: &TreeView, frame: &str, config: &ConfigMap) {
        self.recorded.inits.borrow_mut().push(InitCall {
            library: self.library.clone(),
            frame: frame.to_owned(),
            config: config.clone(),
            tree_root: tree.root().clone(),
            frame_in_tree: tree.contains(frame),
        });
    }

    fn lib_name(&self) -> &str {
        &self.library
    }
}

impl LibInterface for Recorder {
    fn lib_name(&self) -> &str {
        &self.library
    }

    fn into_item_plugin(self: Box<Self>) -> Result<Box<dyn ItemPlugin>, Box<dyn LibInterface>> {
        Ok(self)
    }
}

/// A library that is not an item plugin.
pub struct Foreign {
    pub drops: Rc<Cell<usize>>,
}

impl Drop for Foreign {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl LibInterface for Foreign {
    fn lib_name(&self) -> &str {
        "foreign"
    }

    fn into_item_plugin(self: Box<Self>) -> Result<Box<dyn ItemPlugin>, Box<dyn LibInterface>> {
        Err(self)
    }
}

/// Fields of one `ERROR` event.
#[derive(Clone, Debug, Default)]
pub struct LoggedError {
    pub frame: String,
    pub library: String,
}

impl Visit for LoggedError {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "frame" => self.frame = value.to_owned(),
            "library" => self.library = value.to_owned(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

struct ErrorCollector(Arc<Mutex<Vec<LoggedError>>>);

impl<S: Subscriber> Layer<S> for ErrorCollector {
    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            let mut fields = LoggedError::default();
            event.record(&mut fields);
            self.0.lock().unwrap().push(fields);
        }
    }
}

/// Runs `f` with a subscriber that collects every `ERROR` event on this thread.
pub fn capture_errors<T>(f: impl FnOnce() -> T) -> (T, Vec<LoggedError>) {
    let logged = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(ErrorCollector(Arc::clone(&logged)));
    let out = tracing::subscriber::with_default(subscriber, f);
    let errors = logged.lock().unwrap().clone();
    (out, errors)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Registers a recorder library under `name`, loaded or merely available.
pub fn register_recorder(manager: &mut LibManager, name: &str, recorded: &Recordings, loaded: bool) {
    let library = name.to_owned();
    let recorded = recorded.clone();
    let factory = move || -> Box<dyn LibInterface> {
        Box::new(Recorder {
            library: library.clone(),
            recorded: recorded.clone(),
        })
    };
    if loaded {
        manager.register_loaded(name, factory);
    } else {
        manager.register_library(name, factory);
    }
}

/// `world -> link1 -> link2`
pub fn scene() -> (Graph, TreeView) {
    let mut graph = Graph::new();
    for frame in ["world", "link1", "link2"] {
        graph.add_frame(frame).unwrap();
    }
    graph.add_edge("world", "link1", Transform::default()).unwrap();
    graph.add_edge("link1", "link2", Transform::default()).unwrap();
    let tree = graph.tree_view("world").unwrap();
    (graph, tree)
}

pub fn yaml(doc: &str) -> ConfigMap {
    parse_config_map(doc).unwrap()
}

/// Library names of the plugin items on `frame`, in attachment order.
pub fn attached(graph: &Graph, frame: &str) -> Vec<String> {
    graph
        .plugin_items(frame)
        .map(|item| item.lib_name().to_owned())
        .collect()
}
