use std::fs;
use std::path::Path;

use context_overlay::{ApplicationContext, ContextLoader, Error};
use tempfile::TempDir;
use toml::Table;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("context_overlay=debug")
        .with_test_writer()
        .try_init();
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "conf/AdditionalConfiguration/Production.toml",
        r#"
        [SYS]
        sitename = "Shop"
        trusted_hosts = ["shop.example"]

        [DB]
        host = "db.internal"
        port = 3306
        "#,
    );
    write(
        root,
        "conf/AdditionalConfiguration/Production/Live.toml",
        r#"
        [SYS]
        trusted_hosts = ["www.shop.example"]

        [DB]
        host = "live-db.internal"
        "#,
    );
    write(
        root,
        "conf/AdditionalConfiguration/Production/Live/Server1.toml",
        r#"
        [DB]
        replica = true
        "#,
    );
    write(
        root,
        "conf/local.toml",
        r#"
        [DB]
        port = 3307
        "#,
    );
    dir
}

fn loader(root: &Path, context: &str) -> ContextLoader {
    let context: ApplicationContext = context.parse().unwrap();
    ContextLoader::new(&context)
        .with_context_path(root.join("conf/AdditionalConfiguration"))
        .with_path(root.join("conf/local.toml"))
}

#[test]
fn test_full_overlay_for_server_context() {
    init_tracing();
    let dir = site();
    let mut conf: Table = toml::from_str("[BE]\ndebug = false").unwrap();

    loader(dir.path(), "Production/Live/Server1")
        .load_configuration(&mut conf)
        .unwrap()
        .append_context_to_sitename(&mut conf)
        .unwrap();

    let expected: Table = toml::from_str(
        r#"
        [BE]
        debug = false

        [SYS]
        sitename = "Shop [[PRODUCTION/LIVE/SERVER1]]"
        trusted_hosts = ["www.shop.example"]

        [DB]
        host = "live-db.internal"
        port = 3307
        replica = true
        "#,
    )
    .unwrap();
    assert_eq!(conf, expected);
}

#[test]
fn test_unknown_leaf_context_uses_parents() {
    init_tracing();
    let dir = site();
    let mut conf = Table::new();

    loader(dir.path(), "Production/Live/Server9")
        .load_configuration(&mut conf)
        .unwrap();

    assert_eq!(conf["DB"]["host"].as_str(), Some("live-db.internal"));
    assert!(conf["DB"].get("replica").is_none());
}

#[test]
fn test_production_cache_round_trip() {
    init_tracing();
    let dir = site();
    let cache = dir.path().join("var/cache/context_conf.toml");

    let mut first = Table::new();
    loader(dir.path(), "Production/Live")
        .use_cache_in_production(&cache)
        .load_configuration(&mut first)
        .unwrap();

    // fragments gone; only the snapshot can supply the values now
    fs::remove_dir_all(dir.path().join("conf")).unwrap();

    let mut second = Table::new();
    loader(dir.path(), "Production/Live")
        .use_cache_in_production(&cache)
        .load_configuration(&mut second)
        .unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_development_never_caches() {
    init_tracing();
    let dir = site();
    let cache = dir.path().join("var/cache/context_conf.toml");

    let mut conf = Table::new();
    loader(dir.path(), "Development")
        .use_cache_in_production(&cache)
        .load_configuration(&mut conf)
        .unwrap();

    assert!(!cache.exists());
    assert_eq!(conf["DB"]["port"].as_integer(), Some(3307));
}

#[test]
fn test_from_env_rejects_invalid_context() {
    std::env::set_var("CONTEXT_OVERLAY_IT_CONTEXT", "Staging/Live");
    let result = ContextLoader::from_env("CONTEXT_OVERLAY_IT_CONTEXT");
    assert!(matches!(result, Err(Error::Context(_))));

    std::env::set_var("CONTEXT_OVERLAY_IT_CONTEXT", "Testing/Ci");
    let loader = ContextLoader::from_env("CONTEXT_OVERLAY_IT_CONTEXT").unwrap();
    assert_eq!(loader.context_chain().names(), ["Testing", "Testing/Ci"]);
}
