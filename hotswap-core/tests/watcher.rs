//! End-to-end tests: file edits under the plugin root reach the registry through
//! a real notify watcher

mod common;

use std::time::Duration;

use common::Fixture;
use hotswap_core::{PluginState, PluginWatcher, WatcherConfig};

fn fast_debounce() -> WatcherConfig {
    WatcherConfig {
        debounce: Duration::from_millis(300),
        ..Default::default()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_quick_config_writes_trigger_one_reaction_with_final_contents() {
    let fx = Fixture::new(&["echo"]);
    fx.write_plugin("echo", "{}");
    fx.registry.load("echo").await.unwrap();
    fx.registry.enable("echo").await.unwrap();

    let _watcher = PluginWatcher::start(&fx.registry, WatcherConfig::default()).unwrap();
    settle().await;

    fx.write_config("echo", r#"{"message": "first"}"#);
    tokio::time::sleep(Duration::from_millis(150)).await;
    fx.write_config("echo", r#"{"message": "final"}"#);

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let reactions = fx.calls_matching("config_changed");
    assert_eq!(reactions.len(), 1, "reactions: {reactions:?}");
    assert!(reactions[0].contains(r#""message":"final""#));

    let config = fx.registry.get_status("echo").await.config.unwrap();
    assert_eq!(config["message"], "final");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn descriptor_edit_reloads_and_keeps_enablement() {
    let fx = Fixture::new(&["echo"]);
    fx.write_plugin("echo", r#"{"name": "Echo"}"#);
    fx.registry.load("echo").await.unwrap();
    fx.registry.enable("echo").await.unwrap();
    fx.clear_calls();

    let _watcher = PluginWatcher::start(&fx.registry, fast_debounce()).unwrap();
    settle().await;

    std::fs::write(
        fx.plugin_dir("echo").join("plugin.json"),
        r#"{"name": "Echo reloaded"}"#,
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(
        fx.calls(),
        vec![
            "echo:descriptor_changed",
            "echo:disable",
            "echo:unload",
            "echo:load",
            "echo:enable"
        ]
    );
    let status = fx.registry.get_status("echo").await;
    assert_eq!(status.state, PluginState::Enabled);
    assert_eq!(
        status.metadata.unwrap().name.as_deref(),
        Some("Echo reloaded")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_to_unloaded_plugins_and_ignored_paths_are_ignored() {
    let fx = Fixture::new(&["echo", "idle"]);
    fx.write_plugin("echo", "{}");
    fx.write_plugin("idle", "{}");
    fx.registry.load("echo").await.unwrap();
    fx.clear_calls();

    let _watcher = PluginWatcher::start(&fx.registry, fast_debounce()).unwrap();
    settle().await;

    fx.write_config("idle", r#"{"x": 1}"#);
    std::fs::create_dir_all(fx.plugin_dir("echo").join("assets")).unwrap();
    std::fs::write(
        fx.plugin_dir("echo").join("assets").join("config.json"),
        "{}",
    )
    .unwrap();
    std::fs::write(fx.plugin_dir("echo").join("main"), "rebuilt").unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert!(fx.calls().is_empty(), "unexpected calls: {:?}", fx.calls());
    assert_eq!(fx.registry.get_status("idle").await.state, PluginState::Unloaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_to_different_plugins_are_applied_independently() {
    let fx = Fixture::new(&["alpha", "beta"]);
    fx.write_plugin("alpha", "{}");
    fx.write_plugin("beta", "{}");
    fx.registry.load("alpha").await.unwrap();
    fx.registry.load("beta").await.unwrap();

    let _watcher = PluginWatcher::start(&fx.registry, fast_debounce()).unwrap();
    settle().await;

    fx.write_config("alpha", r#"{"n": 1}"#);
    fx.write_config("beta", r#"{"n": 2}"#);
    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(fx.calls_matching("alpha:config_changed").len(), 1);
    assert_eq!(fx.calls_matching("beta:config_changed").len(), 1);
}
