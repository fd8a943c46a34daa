//! End-to-end inner tree builds with a stub nsjail.
//!
//! The stub records its command line to a log file and exits with a fixed
//! status, standing in for the real sandbox binary.

#![cfg(unix)]

use convenient_innertree::{
    ConfigError, INNER_BUILD, InnerTreeInvoker, InvokeError, LunchCombo, TreeCollection,
    TreeIdentity,
};
use serde_json::json;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

// Writing an executable while another test thread forks can make exec fail
// with ETXTBSY, so script setup and execution are serialized.
static EXEC_LOCK: Mutex<()> = Mutex::new(());

fn exec_lock() -> MutexGuard<'static, ()> {
    EXEC_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

struct Fixture {
    tmp: TempDir,
    nsjail: PathBuf,
    log: PathBuf,
}

impl Fixture {
    /// Workspace with a stub nsjail exiting with `exit_code`.
    fn new(exit_code: i32) -> Self {
        let tmp = TempDir::new().unwrap();
        let nsjail = tmp.path().join("bin/nsjail");
        let log = tmp.path().join("nsjail.log");
        write_script(
            &nsjail,
            &format!("echo \"$@\" >> '{}'\nexit {exit_code}", log.display()),
        );
        Self { tmp, nsjail, log }
    }

    fn tree_root(&self, name: &str) -> PathBuf {
        let root = self.tmp.path().join("src").join(name);
        write_script(&root.join(INNER_BUILD), "exit 0");
        root
    }

    fn out_dir(&self) -> PathBuf {
        self.tmp.path().join("out")
    }

    fn collection(&self, combo: serde_json::Value) -> TreeCollection {
        let combo: LunchCombo = serde_json::from_value(combo).unwrap();
        combo.into_collection(&self.out_dir(), &self.nsjail).unwrap()
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }
}

#[test]
fn test_builds_run_in_identity_order() {
    let _guard = exec_lock();
    let fx = Fixture::new(0);
    let (a, b, c) = (fx.tree_root("a"), fx.tree_root("b"), fx.tree_root("c"));

    let trees = fx.collection(json!({
        "system": { "inner-tree": b },
        "vendor": { "inner-tree": a },
        "modules": { "com.android.c": { "inner-tree": c } }
    }));

    let invoker = InnerTreeInvoker::new();
    let args = vec!["droid".to_string()];
    let results = trees
        .try_for_each_tree(|_, tree, args: &[String]| invoker.invoke(tree, args), &args[..])
        .unwrap();
    assert_eq!(results.len(), 3);

    let calls = fx.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].ends_with("--api_domain vendor droid"));
    assert!(calls[1].ends_with("--api_domain system droid"));
    assert!(calls[2].ends_with("--api_domain com.android.c droid"));
    assert!(calls[0].contains("/a_unbundled/nsjail.cfg -- /src/.inner_build --out_dir /src/out"));

    for tree in trees.keys() {
        let config = fs::read_to_string(tree.out().nsjail_config_file()).unwrap();
        assert!(config.contains(&format!("src: \"{}\"", tree.root().display())));
    }
}

#[test]
fn test_failing_build_stops_remaining_trees() {
    let _guard = exec_lock();
    let fx = Fixture::new(7);
    let (a, b) = (fx.tree_root("a"), fx.tree_root("b"));

    let trees = fx.collection(json!({
        "system": { "inner-tree": a },
        "vendor": { "inner-tree": b }
    }));

    let invoker = InnerTreeInvoker::new();
    let err = trees
        .try_for_each_tree(|_, tree, _: &()| invoker.invoke(tree, &[]), &())
        .unwrap_err();

    match &err {
        InvokeError::BuildFailed { root, status } => {
            assert_eq!(root, &a);
            assert_eq!(status.code(), Some(7));
        }
        other => panic!("Expected BuildFailed, got {other:?}"),
    }
    assert!(err.to_string().contains(&a.display().to_string()));
    assert!(err.to_string().contains("stopping multitree build"));
    assert_eq!(fx.calls().len(), 1);
}

#[test]
fn test_missing_entrypoint_never_reaches_nsjail() {
    let _guard = exec_lock();
    let fx = Fixture::new(0);
    let bare = fx.tmp.path().join("src/bare");
    fs::create_dir_all(&bare).unwrap();

    let trees = fx.collection(json!({
        "system": { "inner-tree": bare },
        "vendor": { "inner-tree": bare }
    }));

    let tree = trees.get(&TreeIdentity::new(&bare, None)).unwrap();
    let err = InnerTreeInvoker::new().invoke(tree, &[]).unwrap_err();

    assert!(matches!(err, InvokeError::MissingEntrypoint { .. }));
    assert!(fx.calls().is_empty());
    assert!(!tree.out().nsjail_config_file().exists());
}

#[test]
fn test_melded_project_is_mounted() {
    let _guard = exec_lock();
    let fx = Fixture::new(0);
    let root = fx.tree_root("vendor");
    let shared = fx.tmp.path().join("shared");
    fs::create_dir_all(shared.join("hardware/libhw/.git")).unwrap();
    fs::create_dir_all(shared.join("device/common/.git")).unwrap();
    // The tree already carries its own device/common.
    fs::create_dir_all(root.join("device/common")).unwrap();
    fs::write(root.join("device/common/BoardConfig.mk"), "# real\n").unwrap();

    let trees = fx.collection(json!({
        "system": { "inner-tree": [root, shared], "product": "p" },
        "vendor": { "inner-tree": [root, shared], "product": "p" }
    }));
    let tree = trees.keys()[0];
    InnerTreeInvoker::new().invoke(tree, &[]).unwrap();

    let dsts: Vec<_> = tree
        .sandbox_config()
        .unwrap()
        .mounts()
        .iter()
        .map(|m| m.dst.clone())
        .collect();
    assert_eq!(
        dsts,
        vec![
            PathBuf::from("/src"),
            PathBuf::from("/src/out"),
            PathBuf::from("/src/hardware/libhw"),
        ]
    );
}

#[test]
fn test_output_collision_is_a_config_error() {
    let fx = Fixture::new(0);
    let root = fx.tmp.path().join("src/a");

    let combo: LunchCombo = serde_json::from_value(json!({
        "system": { "inner-tree": root },
        "vendor": { "inner-tree": [root, "shared"] }
    }))
    .unwrap();
    let err = combo.into_collection(&fx.out_dir(), &fx.nsjail).unwrap_err();

    assert!(matches!(err, ConfigError::OutputCollision { .. }));
}
