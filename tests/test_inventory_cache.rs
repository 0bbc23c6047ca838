use deed_image_sync::cache::InventoryCache;
use deed_image_sync::error::InventoryError;
use deed_image_sync::inventory::{build_inventory, UploadCandidate};
use deed_image_sync::keys::{KeyLayout, Namespace};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"II*\0").unwrap();
}

#[test]
fn inventory_maps_files_to_raw_keys_in_pattern_order() {
    let root = tempdir().unwrap();
    touch(root.path(), "book1/page_0001.tif");
    touch(root.path(), "book1/page_0002.tif");
    touch(root.path(), "book2/cover.jpg");
    touch(root.path(), "book2/notes.txt");
    fs::create_dir_all(root.path().join("empty.tif")).unwrap();

    let ns = Namespace::from_workflow_name("Ramsey County");
    let patterns = vec!["**/*.jpg".to_string(), "**/*.tif".to_string()];
    let inventory = build_inventory(&KeyLayout::default(), &ns, root.path(), &patterns)
        .expect("inventory should build");

    let keys: Vec<&str> = inventory.iter().map(|c| c.remote_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "raw/ramsey-county/book2/cover.jpg",
            "raw/ramsey-county/book1/page_0001.tif",
            "raw/ramsey-county/book1/page_0002.tif",
        ]
    );
    assert_eq!(inventory[0].local_path, root.path().join("book2/cover.jpg"));
}

#[test]
fn inventory_of_empty_directory_is_empty() {
    let root = tempdir().unwrap();
    let inventory = build_inventory(
        &KeyLayout::default(),
        &Namespace::from_workflow_name("x"),
        root.path(),
        &["**/*.tif".to_string()],
    )
    .unwrap();
    assert!(inventory.is_empty());
}

#[test]
fn invalid_pattern_is_reported() {
    let root = tempdir().unwrap();
    let err = build_inventory(
        &KeyLayout::default(),
        &Namespace::from_workflow_name("x"),
        root.path(),
        &["**/[.tif".to_string()],
    )
    .unwrap_err();
    assert!(matches!(err, InventoryError::Pattern { .. }), "got {err:?}");
}

#[test]
fn cache_round_trips_required_fields() {
    let dir = tempdir().unwrap();
    let ns = Namespace::from_workflow_name("Ramsey County");
    let cache = InventoryCache::for_namespace(&dir.path().join("data"), &ns);
    assert!(cache.path().ends_with("data/ramsey-county_raw_images_list.csv"));

    let candidates = vec![
        UploadCandidate {
            local_path: "/mnt/deeds/book1/page, one.tif".into(),
            remote_key: "raw/ramsey-county/book1/page, one.tif".into(),
        },
        UploadCandidate {
            local_path: "/mnt/deeds/book2/page_0001.001".into(),
            remote_key: "raw/ramsey-county/book2/page_0001.001".into(),
        },
    ];
    cache.save(&candidates).expect("save should succeed");

    let written = fs::read_to_string(cache.path()).unwrap();
    assert!(written.starts_with("local_path,remainder,filename,remote_key"));
    assert!(written.contains("book2/page_0001.001,page_0001.001,"));

    assert_eq!(cache.load().expect("load should succeed"), candidates);
}

#[test]
fn cache_accepts_legacy_s3_path_column() {
    let dir = tempdir().unwrap();
    let ns = Namespace::from_workflow_name("wi-milwaukee");
    let cache = InventoryCache::for_namespace(dir.path(), &ns);
    fs::write(
        cache.path(),
        "local_path,remainder,filename,s3_path\n/d/a.tif,a.tif,a.tif,raw/wi-milwaukee/a.tif\n",
    )
    .unwrap();

    let loaded = cache.load().expect("legacy cache should load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].remote_key, "raw/wi-milwaukee/a.tif");
}

#[test]
fn missing_or_malformed_cache_fails() {
    let dir = tempdir().unwrap();
    let ns = Namespace::from_workflow_name("x");
    let cache = InventoryCache::for_namespace(dir.path(), &ns);
    assert!(cache.load().is_err(), "absent cache must fail");

    fs::write(cache.path(), "local_path,filename\n/d/a.tif,a.tif\n").unwrap();
    assert!(cache.load().is_err(), "cache without remote_key must fail");
}

#[test]
#[serial]
fn inventory_accepts_roots_with_current_dir_components() {
    let workdir = tempdir().unwrap();
    touch(workdir.path(), "imgs/book1/a.tif");
    let previous = env::current_dir().unwrap();
    env::set_current_dir(workdir.path()).unwrap();

    let ns = Namespace::from_workflow_name("ns");
    let patterns = vec!["**/*.tif".to_string()];
    let keys_for = |root: &str| -> Vec<String> {
        build_inventory(&KeyLayout::default(), &ns, Path::new(root), &patterns)
            .unwrap_or_else(|e| panic!("root {root:?} should scan, got {e:?}"))
            .into_iter()
            .map(|c| c.remote_key)
            .collect()
    };

    let plain = keys_for("imgs");
    let dotted = keys_for("./imgs");
    let inner_dot = keys_for("imgs/./");
    let cwd = keys_for(".");
    env::set_current_dir(previous).unwrap();

    assert_eq!(plain, vec!["raw/ns/book1/a.tif"]);
    assert_eq!(dotted, plain);
    assert_eq!(inner_dot, plain);
    assert_eq!(cwd, vec!["raw/ns/imgs/book1/a.tif"]);
}
