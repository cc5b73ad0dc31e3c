// tests/attach_scenarios.rs
mod common;

use common::{
    Foreign, Recordings, attached, capture_errors, init_tracing, register_recorder, scene, yaml,
};
use scene_item_plugins::{
    AttachError, AttacherConfig, ConfigMap, ConfigMapExt, FailurePolicy, Graph, GraphError,
    ItemPlugin, LibInterface, LibManager, LibraryResolver, PluginAttacher, PluginItemRecord,
    TreeView,
};
use std::cell::Cell;
use std::rc::Rc;

fn setup() -> (PluginAttacher<LibManager>, Recordings) {
    init_tracing();
    let recorded = Recordings::default();
    let mut manager = LibManager::new();
    register_recorder(&mut manager, "foo", &recorded, true);
    register_recorder(&mut manager, "bar", &recorded, true);
    (PluginAttacher::new(manager), recorded)
}

#[test]
fn test_config_without_plugins_is_a_no_op() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let report = attacher.handle_config(&mut graph, &tree, &yaml("name: link1\n"), "link1");

    assert!(report.is_clean());
    assert!(report.attached.is_empty());
    assert!(graph.items("link1").is_empty());
    assert!(!graph.has_pending_events());
    assert_eq!(attacher.resolver().instances_created("foo"), 0);
    assert!(recorded.inits.borrow().is_empty());
}

#[test]
fn test_single_plugin_is_attached_to_its_frame() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: foo\n    rate: 20\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.is_clean());
    assert_eq!(report.attached, vec!["foo"]);
    assert_eq!(attached(&graph, "link1"), vec!["foo"]);
    assert!(attached(&graph, "world").is_empty());

    // The plugin saw its own entry and the shared tree.
    let inits = recorded.inits.borrow();
    assert_eq!(inits.len(), 1);
    assert_eq!(inits[0].frame, "link1");
    assert_eq!(inits[0].tree_root, "world");
    assert_eq!(inits[0].config.get_str("plugin_lib_name"), Some("foo"));
    assert!(inits[0].config.has_key("rate"));
}

#[test]
fn test_unresolvable_library_attaches_nothing() {
    let (mut attacher, _recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: missing\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.attached.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        AttachError::LibraryNotFound { library } if library == "missing"
    ));
    assert!(graph.items("link1").is_empty());
}

#[test]
fn test_unresolvable_library_logs_one_error() {
    let (mut attacher, _recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: missing\n");
    let (report, errors) =
        capture_errors(|| attacher.handle_config(&mut graph, &tree, &config, "link1"));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].frame, "link1");
    assert_eq!(errors[0].library, "missing");
}

#[test]
fn test_missing_lib_name_stops_the_whole_list() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - {}\n  - plugin_lib_name: foo\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.attached.is_empty());
    assert!(matches!(
        &report.failures[..],
        [AttachError::MissingLibName { frame, .. }] if frame == "link1"
    ));
    assert!(graph.items("link1").is_empty());
    assert_eq!(attacher.resolver().instances_created("foo"), 0);
    assert!(recorded.inits.borrow().is_empty());
}

#[test]
fn test_non_string_lib_name_counts_as_missing() {
    let (mut attacher, _recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: [foo]\n  - just-a-string\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(matches!(
        &report.failures[..],
        [AttachError::MissingLibName { .. }]
    ));
}

#[test]
fn test_numeric_lib_name_is_read_as_text() {
    let (mut attacher, recorded) = setup();
    register_recorder(attacher.resolver_mut(), "42", &recorded, true);
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: 42\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.is_clean());
    assert_eq!(attached(&graph, "link1"), vec!["42"]);
}

#[test]
fn test_contract_mismatch_releases_instance_and_stops() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let foreign_drops = Rc::new(Cell::new(0));
    let drops = Rc::clone(&foreign_drops);
    attacher.resolver_mut().register_loaded("foreign", move || {
        Box::new(Foreign {
            drops: Rc::clone(&drops),
        })
    });

    let config = yaml("plugins:\n  - plugin_lib_name: foreign\n  - plugin_lib_name: foo\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.attached.is_empty());
    assert!(matches!(
        &report.failures[..],
        [AttachError::NotAnItemPlugin { library }] if library == "foreign"
    ));
    assert_eq!(foreign_drops.get(), 1);
    assert!(graph.items("link1").is_empty());
    assert!(recorded.inits.borrow().is_empty());
}

#[test]
fn test_earlier_attachments_survive_a_later_failure() {
    let (mut attacher, _recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml(
        "plugins:\n  - plugin_lib_name: foo\n  - plugin_lib_name: missing\n  - plugin_lib_name: bar\n",
    );
    let report = attacher.handle_config(&mut graph, &tree, &config, "link2");

    assert_eq!(report.attached, vec!["foo"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(attached(&graph, "link2"), vec!["foo"]);
}

#[test]
fn test_skip_policy_continues_after_bad_entries() {
    let (attacher, _recorded) = setup();
    let mut attacher = attacher.with_config(AttacherConfig {
        policy: FailurePolicy::SkipEntry,
        ..Default::default()
    });
    let (mut graph, tree) = scene();

    let config = yaml(
        "plugins:\n  - {}\n  - plugin_lib_name: foo\n  - plugin_lib_name: missing\n  - plugin_lib_name: bar\n",
    );
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert_eq!(report.attached, vec!["foo", "bar"]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(attached(&graph, "link1"), vec!["foo", "bar"]);
}

#[test]
fn test_custom_keys_are_honoured() {
    let (attacher, _recorded) = setup();
    let mut attacher = attacher.with_config(
        AttacherConfig::from_yaml_str("plugins_key: extensions\nlib_name_key: lib\n").unwrap(),
    );
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: foo\nextensions:\n  - lib: bar\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "world");

    assert_eq!(report.attached, vec!["bar"]);
}

#[test]
fn test_processing_twice_attaches_twice() {
    let (mut attacher, _recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: foo\n");
    attacher.handle_config(&mut graph, &tree, &config, "link1");
    attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert_eq!(attached(&graph, "link1"), vec!["foo", "foo"]);
    assert_eq!(attacher.resolver().instances_created("foo"), 2);
}

#[test]
fn test_available_library_is_loaded_on_demand() {
    let (mut attacher, _recorded) = setup();
    let recorded = Recordings::default();
    register_recorder(attacher.resolver_mut(), "lazy", &recorded, false);
    let (mut graph, tree) = scene();

    assert!(!attacher.resolver().is_loaded("lazy"));
    let config = yaml("plugins:\n  - plugin_lib_name: lazy\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "link1");

    assert!(report.is_clean());
    assert!(attacher.resolver().is_loaded("lazy"));
    assert_eq!(recorded.inits.borrow().len(), 1);
}

#[test]
fn test_unknown_frame_fails_before_resolution() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: foo\n");
    let report = attacher.handle_config(&mut graph, &tree, &config, "nowhere");

    assert!(matches!(
        &report.failures[..],
        [AttachError::Graph { library: None, source: GraphError::UnknownFrame(frame) }]
            if frame == "nowhere"
    ));
    assert_eq!(attacher.resolver().instances_created("foo"), 0);
    assert!(recorded.inits.borrow().is_empty());
    assert_eq!(recorded.drops.get(), 0);
}

/// Removes its own frame while being initialized.
struct Vanisher {
    drops: Rc<Cell<usize>>,
}

impl Drop for Vanisher {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl ItemPlugin for Vanisher {
    fn init_plugin(&mut self, graph: &mut Graph, _: &TreeView, frame: &str, _: &ConfigMap) {
        graph.remove_frame(frame).unwrap();
    }

    fn lib_name(&self) -> &str {
        "vanisher"
    }
}

impl LibInterface for Vanisher {
    fn lib_name(&self) -> &str {
        "vanisher"
    }

    fn into_item_plugin(self: Box<Self>) -> Result<Box<dyn ItemPlugin>, Box<dyn LibInterface>> {
        Ok(self)
    }
}

#[test]
fn test_rejected_item_names_its_library() {
    let (mut attacher, _recorded) = setup();
    let vanisher_drops = Rc::new(Cell::new(0));
    let drops = Rc::clone(&vanisher_drops);
    attacher.resolver_mut().register_loaded("vanisher", move || {
        Box::new(Vanisher {
            drops: Rc::clone(&drops),
        })
    });
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: vanisher\n");
    let (report, errors) =
        capture_errors(|| attacher.handle_config(&mut graph, &tree, &config, "link2"));

    assert!(matches!(
        &report.failures[..],
        [AttachError::Graph { library: Some(library), source: GraphError::UnknownFrame(_) }]
            if library == "vanisher"
    ));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].library, "vanisher");
    assert_eq!(vanisher_drops.get(), 1);
}

#[test]
fn test_plugins_are_released_with_their_frame() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    let config = yaml("plugins:\n  - plugin_lib_name: foo\n  - plugin_lib_name: bar\n");
    attacher.handle_config(&mut graph, &tree, &config, "link2");
    assert_eq!(recorded.drops.get(), 0);

    graph.remove_frame("link2").unwrap();
    assert_eq!(recorded.drops.get(), 2);
}

#[test]
fn test_snapshot_records_restore_without_init() {
    let (mut attacher, recorded) = setup();
    let (mut graph, tree) = scene();

    attacher.handle_config(&mut graph, &tree, &yaml("plugins:\n  - plugin_lib_name: foo\n"), "link1");
    attacher.handle_config(&mut graph, &tree, &yaml("plugins:\n  - plugin_lib_name: bar\n"), "link2");

    let snapshot = graph.snapshot_plugins();
    let text = serde_yaml::to_string(&snapshot).unwrap();
    assert_eq!(text, "link1:\n- foo\nlink2:\n- bar\n");

    let restored: std::collections::BTreeMap<String, Vec<PluginItemRecord>> =
        serde_yaml::from_str(&text).unwrap();
    let item = restored["link1"][0].restore(attacher.resolver_mut()).unwrap();
    assert_eq!(item.lib_name(), "foo");
    // Two attachments initialized, the restored plugin was not.
    assert_eq!(recorded.inits.borrow().len(), 2);

    let missing = PluginItemRecord {
        lib_name: "gone".into(),
    };
    assert!(missing.restore(attacher.resolver_mut()).is_err());
    assert!(attacher.resolver_mut().get_new_instance("gone").is_none());
}
