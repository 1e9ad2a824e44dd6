//! Tests for the storage comparer

use cfgsync_core::{ChangeList, Error, FilterChain, FilteredStore, StorageComparer, compare};
use cfgsync_extensions::EXTENSION_MANIFEST;
use cfgsync_store::{ConfigStore, FileStore, MemoryStore};
use cfgsync_test_utils::{TagFilter, TestSite, manifest, record, seed, seeded_memory_store};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn computes_create_update_delete() {
    let source = seeded_memory_store(&[
        ("a.a", json!({"v": 1})),
        ("b.b", json!({"v": 2})),
    ]);
    let target = seeded_memory_store(&[
        ("b.b", json!({"v": 1})),
        ("c.c", json!({"v": 3})),
    ]);

    let list = compare(&source, &target).unwrap();
    let changes = list.changes("").unwrap();

    assert_eq!(changes.create, names(&["a.a"]));
    assert_eq!(changes.update, names(&["b.b"]));
    assert_eq!(changes.delete, names(&["c.c"]));
    assert!(changes.rename.is_empty());
    assert!(list.has_changes());
}

#[test]
fn identical_stores_have_no_changes() {
    let records = [
        ("system.site", json!({"name": "Example", "slogan": ""})),
        ("system.menu.main", json!({"links": [1, 2, 3]})),
    ];
    let source = seeded_memory_store(&records);
    let target = seeded_memory_store(&records);

    let mut comparer = StorageComparer::new(&source, &target);
    assert!(!comparer.create_changelist().unwrap().has_changes());
    assert!(!comparer.has_changes());
    assert_eq!(comparer.changelist().summary().total(), 0);
}

#[test]
fn mapping_key_order_is_not_a_change() {
    let site = TestSite::new();
    let active = site.active();
    let sync = site.sync();
    std::fs::create_dir_all(site.active_dir()).unwrap();
    std::fs::create_dir_all(site.sync_dir()).unwrap();
    std::fs::write(site.active_dir().join("system.site.yml"), "name: Example\nmail: a@b.c\n").unwrap();
    std::fs::write(site.sync_dir().join("system.site.yml"), "mail: a@b.c\nname: Example\n").unwrap();

    assert!(!compare(&sync, &active).unwrap().has_changes());
}

#[rstest]
#[case::sequence_order(json!({"items": [1, 2]}), json!({"items": [2, 1]}))]
#[case::nested_value(json!({"page": {"front": "/node"}}), json!({"page": {"front": "/user"}}))]
#[case::integer_vs_string(json!({"count": 1}), json!({"count": "1"}))]
#[case::added_key(json!({"a": 1}), json!({"a": 1, "b": null}))]
fn structural_differences_are_updates(#[case] left: serde_json::Value, #[case] right: serde_json::Value) {
    let source = seeded_memory_store(&[("x.y", left)]);
    let target = seeded_memory_store(&[("x.y", right)]);

    let list = compare(&source, &target).unwrap();

    assert_eq!(list.changes("").unwrap().update, names(&["x.y"]));
}

#[test]
fn every_changed_name_is_listed_once() {
    let source = seeded_memory_store(&[
        ("a.same", json!({"v": 1})),
        ("a.changed", json!({"v": 2})),
        ("a.new", json!({})),
    ]);
    let target = seeded_memory_store(&[
        ("a.same", json!({"v": 1})),
        ("a.changed", json!({"v": 1})),
        ("a.old", json!({})),
    ]);

    let list = compare(&source, &target).unwrap();
    let changes = list.changes("").unwrap();
    let mut all: Vec<&String> = changes
        .create
        .iter()
        .chain(&changes.update)
        .chain(&changes.delete)
        .collect();
    all.sort();

    assert_eq!(all, vec!["a.changed", "a.new", "a.old"]);
    assert!(!changes.contains("a.same"));
}

#[test]
fn collections_are_compared_separately() {
    let source = MemoryStore::new();
    let target = MemoryStore::new();
    seed(&source.collection("language.fr").unwrap(), &[("system.site", json!({"name": "Exemple"}))]);
    seed(&target.collection("language.de").unwrap(), &[("system.site", json!({"name": "Beispiel"}))]);
    seed(&target, &[("system.site", json!({"name": "Example"}))]);
    seed(&source, &[("system.site", json!({"name": "Example"}))]);

    let list = compare(&source, &target).unwrap();

    assert_eq!(list.collections().collect::<Vec<_>>(), vec!["", "language.de", "language.fr"]);
    assert!(list.changes("").unwrap().is_empty());
    assert_eq!(list.changes("language.fr").unwrap().create, names(&["system.site"]));
    assert_eq!(list.changes("language.de").unwrap().delete, names(&["system.site"]));
}

#[test]
fn manifest_is_written_first() {
    let source = seeded_memory_store(&[
        ("block.block.branding", json!({})),
        ("automated_cron.settings", json!({})),
    ]);
    source.write(EXTENSION_MANIFEST, &manifest(&[("node", 0)], &[])).unwrap();
    let target = MemoryStore::new();

    let list = compare(&source, &target).unwrap();

    assert_eq!(
        list.changes("").unwrap().create,
        names(&[EXTENSION_MANIFEST, "automated_cron.settings", "block.block.branding"])
    );
}

#[test]
fn renames_are_detected_by_key() {
    let id = Uuid::new_v4().to_string();
    let source = seeded_memory_store(&[
        ("views.view.articles", json!({"uuid": id, "label": "Articles"})),
        ("views.view.unrelated", json!({"uuid": Uuid::new_v4().to_string()})),
    ]);
    let target = seeded_memory_store(&[
        ("views.view.news", json!({"uuid": id, "label": "News"})),
        ("views.view.keyless", json!({"label": "No uuid"})),
    ]);

    let mut comparer = StorageComparer::new(&source, &target).with_rename_key("uuid");
    let list = comparer.create_changelist().unwrap();
    let changes = list.changes("").unwrap();

    assert_eq!(
        changes.rename,
        vec![("views.view.news".to_string(), "views.view.articles".to_string())]
    );
    assert_eq!(changes.create, names(&["views.view.unrelated"]));
    assert_eq!(changes.delete, names(&["views.view.keyless"]));
    assert_eq!(comparer.rename_key(), Some("uuid"));
}

#[test]
fn renames_are_not_detected_without_a_key() {
    let id = Uuid::new_v4().to_string();
    let source = seeded_memory_store(&[("a.new", json!({"uuid": id}))]);
    let target = seeded_memory_store(&[("a.old", json!({"uuid": id}))]);

    let list = compare(&source, &target).unwrap();
    let changes = list.changes("").unwrap();

    assert!(changes.rename.is_empty());
    assert_eq!(changes.create, names(&["a.new"]));
    assert_eq!(changes.delete, names(&["a.old"]));
}

#[test]
fn filtered_source_is_compared_as_seen() {
    let base = seeded_memory_store(&[("a.a", json!({}))]);
    let source = FilteredStore::new(Box::new(base), FilterChain::new().with(TagFilter::new("t")));
    let target = seeded_memory_store(&[("a.a", json!({"trail": ["t"]}))]);

    assert!(!compare(&source, &target).unwrap().has_changes());
}

#[test]
fn corrupt_record_is_a_comparison_error() {
    let site = TestSite::new();
    site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
    site.seed_active(&[("system.site", json!({"name": "Other"}))]);
    std::fs::write(site.active_dir().join("system.site.yml"), "name: [unclosed").unwrap();

    let sync = site.sync();
    let active = site.active();
    let err = compare(&sync, &active).unwrap_err();

    match err {
        Error::Comparison { collection, source } => {
            assert_eq!(collection, "");
            assert!(matches!(source, cfgsync_store::Error::Corrupt { .. }), "got: {source}");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing was touched.
    assert!(site.sync_dir().join("system.site.yml").exists());
}

#[test]
fn changelist_is_empty_before_comparison() {
    let source = seeded_memory_store(&[("a.a", json!({}))]);
    let site = TestSite::new();
    let target = FileStore::new(site.active_dir());

    let comparer = StorageComparer::new(&source, &target);

    assert_eq!(comparer.changelist(), &ChangeList::default());
    assert!(!comparer.has_changes());
    assert_eq!(comparer.source().list_all("").unwrap(), vec!["a.a"]);
    assert_eq!(record(json!({})), source.read("a.a").unwrap().unwrap());
}
