//! Loading, isolating and unloading plugins against a live registry.
use std::{
    env, fs, process,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use deck_protocol::render::RecordingRenderer;
use eventbus::{EventBus, Handler, Payload, Reply, Topic};
use panels::{Catalog, Layout, PlainPanel, Registry};
use plugins::{Error, Plugin, PluginCatalog, PluginContext, PluginManager, discover};
use serde_json::{Value, json};

/// Scratch plugin root removed on drop.
struct TempRoot(PathBuf);

impl TempRoot {
    fn new(tag: &str) -> Self {
        let dir = env::temp_dir().join(format!("deckpilot-plugins-{tag}-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, rel: &str, text: &str) -> &Self {
        let path = self.0.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
        self
    }

    fn mkdir(&self, rel: &str) -> &Self {
        fs::create_dir_all(self.0.join(rel)).unwrap();
        self
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Test plugin counting hook deliveries.
struct Counter {
    /// Deliveries seen by the `count` hook.
    hits: Arc<AtomicUsize>,
    /// Make `register` fail.
    fail: bool,
}

impl Plugin for Counter {
    fn provide(&self, catalog: &mut Catalog) {
        let kind = if self.fail { "failing_grid" } else { "counter_grid" };
        catalog.register_panel(kind, |_| Ok(Box::new(PlainPanel)));
    }

    fn register(&mut self, _ctx: &PluginContext, _registry: &mut Registry) -> Result<(), String> {
        if self.fail {
            return Err("refusing".into());
        }
        Ok(())
    }

    fn handler(&self, name: &str) -> Option<Handler> {
        if name != "count" {
            return None;
        }
        let hits = self.hits.clone();
        let h: Handler = Arc::new(move |_p: &Payload| -> Reply {
            hits.fetch_add(1, Ordering::SeqCst);
            None
        });
        Some(h)
    }
}

fn registry() -> Registry {
    Registry::new(
        EventBus::new(),
        Layout::new(3, 5).unwrap(),
        Arc::new(RecordingRenderer::new()),
        Catalog::with_builtins(),
    )
}

fn manager(root: &Path, hits: &Arc<AtomicUsize>) -> PluginManager {
    let mut catalog = PluginCatalog::with_builtins();
    let ok = hits.clone();
    catalog.register("test:Counter", move |_ctx| {
        Ok(Box::new(Counter {
            hits: ok.clone(),
            fail: false,
        }))
    });
    let bad = hits.clone();
    catalog.register("test:Failing", move |_ctx| {
        Ok(Box::new(Counter {
            hits: bad.clone(),
            fail: true,
        }))
    });
    catalog.register("test:Unbuildable", |_ctx| Err("no".into()));
    PluginManager::new(root, catalog, json!({ "general": {} }))
}

const BUTTONS: &str = "[[items]]\nname = \"one\"\ntype = \"button\"\n\n[[items]]\nname = \"two\"\ntype = \"button\"\n";

#[test]
fn failing_plugins_leave_the_tree_untouched() {
    let root = TempRoot::new("isolation");
    root.write(
        "a-missing/plugin.toml",
        "name = \"missing\"\nentry_point = \"nowhere:Nothing\"\n",
    )
    .write(
        "b-badmount/plugin.toml",
        r#"
name = "badmount"
entry_point = "test:Counter"

[[panels]]
id = "first"
path = "panel"

[[panels]]
id = "second"
path = "panel"
mount = "/nope"
"#,
    )
    .write("b-badmount/panel/items.toml", BUTTONS)
    .write(
        "c-failing/plugin.toml",
        "name = \"failing\"\nentry_point = \"test:Failing\"\n[[panels]]\nid = \"f\"\npath = \"panel\"\n",
    )
    .write("c-failing/panel/items.toml", BUTTONS)
    .write(
        "d-unbuildable/plugin.toml",
        "name = \"unbuildable\"\nentry_point = \"test:Unbuildable\"\n",
    )
    .write(
        "e-good/plugin.toml",
        "name = \"good\"\nentry_point = \"test:Counter\"\n[[panels]]\nid = \"good\"\npath = \"panel\"\n",
    )
    .write("e-good/panel/items.toml", BUTTONS);

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let baseline_subs = reg.bus().subscription_count();
    let mut mgr = manager(root.path(), &hits);

    assert_eq!(mgr.discover_and_load(&mut reg), 1);
    assert_eq!(mgr.plugins().len(), 1);
    assert_eq!(mgr.plugins()[0].name(), "good");
    assert_eq!(
        reg.structure(),
        "[root] (1 page) *\n  [good] (1 page)\n    one\n    two\n"
    );
    assert!(reg.find("/first").is_none());
    assert!(reg.find("/f").is_none());
    assert_eq!(reg.bus().subscription_count(), baseline_subs);
    assert!(!reg.catalog().has_panel("failing_grid"));
    assert!(reg.catalog().has_panel("counter_grid"));
    assert!(reg.take_notifications().is_empty());
}

#[test]
fn errors_name_the_cause() {
    let root = TempRoot::new("errors");
    root.write(
        "mount/plugin.toml",
        "name = \"m\"\nentry_point = \"test:Counter\"\n[[panels]]\nid = \"x\"\npath = \"p\"\nmount = \"/ghost\"\n",
    )
    .mkdir("mount/p")
    .write(
        "nopath/plugin.toml",
        "name = \"n\"\nentry_point = \"test:Counter\"\n[[panels]]\nid = \"x\"\npath = \"absent\"\n",
    )
    .write("badentry/plugin.toml", "name = \"b\"\nentry_point = \"flat\"\n")
    .write("failing/plugin.toml", "name = \"f\"\nentry_point = \"test:Failing\"\n");

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let mut mgr = manager(root.path(), &hits);
    let dir = |d: &str| root.path().join(d);

    let err = mgr.load_dir(&dir("mount"), &mut reg).unwrap_err();
    assert!(matches!(err, Error::MountTargetMissing { ref mount, .. } if mount == "/ghost"), "{err}");
    let err = mgr.load_dir(&dir("nopath"), &mut reg).unwrap_err();
    assert!(matches!(err, Error::PanelPathMissing(_)), "{err}");
    let err = mgr.load_dir(&dir("badentry"), &mut reg).unwrap_err();
    assert!(matches!(err, Error::InvalidEntryPoint(_)), "{err}");
    let err = mgr.load_dir(&dir("failing"), &mut reg).unwrap_err();
    assert!(matches!(err, Error::Register { .. }), "{err}");
    let err = mgr.load_dir(&dir("empty"), &mut reg).unwrap_err();
    assert!(matches!(err, Error::Manifest { .. }), "{err}");

    assert!(mgr.plugins().is_empty());
    assert_eq!(reg.nodes().count(), 1);
}

#[test]
fn panels_mount_under_nested_paths_and_repaginate() {
    let root = TempRoot::new("nested");
    root.write(
        "host/plugin.toml",
        "name = \"host\"\nentry_point = \"builtin:Declarative\"\n[[panels]]\nid = \"apps\"\npath = \"apps\"\n",
    )
    .write("host/apps/items.toml", BUTTONS)
    .write(
        "guest/plugin.toml",
        r#"
name = "guest"
version = "1.4.0"
entry_point = "test:Counter"

[[panels]]
id = "tools"
name = "Tools"
path = "tools"
mount = "/apps"
"#,
    )
    .write("guest/tools/items.toml", BUTTONS);

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let mut mgr = manager(root.path(), &hits);
    mgr.load_dir(&root.path().join("host"), &mut reg).unwrap();
    mgr.load_dir(&root.path().join("guest"), &mut reg).unwrap();

    let apps = reg.find("/apps").unwrap();
    let tools = reg.find("/apps/Tools").unwrap();
    assert_eq!(reg.children(apps).len(), 3);
    assert_eq!(reg.children(tools).len(), 2);
    // two buttons, the mounted panel and the parent key all fit on one page
    assert_eq!(reg.pages(apps).unwrap().len(), 1);
    assert_eq!(reg.pages(apps).unwrap()[0].len(), 4);
    assert_eq!(mgr.plugins()[1].manifest().version, "1.4.0");
    assert_eq!(mgr.plugins()[1].panels(), &[tools]);
}

#[test]
fn once_hooks_fire_a_single_time() {
    let root = TempRoot::new("hooks");
    root.write(
        "hooks/plugin.toml",
        r#"
name = "hooks"
entry_point = "test:Counter"

[[events]]
topic = "ping"
handler = "count"
once = true

[[events]]
topic = "pong"
handler = "count"

[[events]]
topic = "pong"
handler = "no_such_handler"
"#,
    );

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let mut mgr = manager(root.path(), &hits);
    mgr.load_dir(&root.path().join("hooks"), &mut reg).unwrap();

    let bus = reg.bus().clone();
    let ping = Topic::from("ping");
    let pong = Topic::from("pong");
    assert!(bus.publish(&ping, &Payload::Empty));
    assert!(!bus.publish(&ping, &Payload::Empty));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    bus.publish(&pong, &Payload::value(Value::Null));
    bus.publish(&pong, &Payload::Empty);
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let sub = mgr.plugins()[0].subscriber();
    assert!(bus.is_subscribed(sub, &pong));
    assert!(!bus.is_subscribed(sub, &ping));
}

#[test]
fn unload_removes_panels_and_hooks() {
    let root = TempRoot::new("unload");
    root.write(
        "p/plugin.toml",
        r#"
name = "p"
entry_point = "test:Counter"

[[panels]]
id = "p"
path = "panel"

[[events]]
topic = "pong"
handler = "count"
"#,
    )
    .write("p/panel/items.toml", BUTTONS);

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let mut mgr = manager(root.path(), &hits);
    assert_eq!(mgr.discover_and_load(&mut reg), 1);
    reg.activate_path("/p").unwrap();

    assert_eq!(mgr.unload("p", &mut reg).unwrap(), 3);
    assert_eq!(reg.active(), reg.root());
    assert_eq!(reg.nodes().count(), 1);
    reg.bus().publish(&Topic::from("pong"), &Payload::Empty);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(matches!(mgr.unload("p", &mut reg), Err(Error::UnknownPlugin(_))));
}

#[test]
fn discovery_skips_directories_without_a_manifest() {
    let root = TempRoot::new("discover");
    root.mkdir("assets")
        .write("z/plugin.toml", "name = \"z\"\nentry_point = \"a:b\"\n")
        .write("a/plugin.toml", "name = 7\n")
        .write("loose.toml", "");

    let found = discover(root.path()).unwrap();
    assert_eq!(found.skipped, vec![root.path().join("assets")]);
    assert_eq!(found.found.len(), 2);
    assert!(found.found[0].1.is_err());
    assert_eq!(found.found[1].1.as_ref().unwrap().name, "z");

    let hits = Arc::new(AtomicUsize::new(0));
    let mut reg = registry();
    let mut missing = manager(&root.path().join("absent"), &hits);
    assert_eq!(missing.discover_and_load(&mut reg), 0);
}
