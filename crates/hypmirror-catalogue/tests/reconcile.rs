use hypmirror_catalogue::hyp::GamePackage;
use hypmirror_catalogue::{BranchPolicy, CatalogueError, PatchSelection, Reconciler, SelectionPolicy};
use serde_json::{Value, json};

fn file(name: &str, md5: &str) -> Value {
    json!({
        "url": format!("https://autopatchhk.example/client_app/{name}"),
        "md5": md5,
        "size": "1024",
        "decompressed_size": "4096"
    })
}

fn audio(name: &str, md5: &str, language: &str) -> Value {
    let mut value = file(name, md5);
    value["language"] = json!(language);
    value
}

fn package(major: Value, patches: Vec<Value>) -> GamePackage {
    serde_json::from_value(json!({
        "game": {"id": "4ziysqXOQ8", "biz": "hkrpg_global"},
        "main": {"major": major, "patches": patches},
        "pre_download": {"major": null, "patches": []}
    }))
    .unwrap()
}

fn group(version: &str, game: Vec<Value>, audio: Vec<Value>) -> Value {
    json!({"version": version, "game_pkgs": game, "audio_pkgs": audio, "res_list_url": ""})
}

fn policy() -> SelectionPolicy {
    SelectionPolicy {
        audio_languages:     ["en-us".to_string()].into(),
        branch_main:         Some(BranchPolicy {
            major:   true,
            patches: PatchSelection::All,
        }),
        branch_pre_download: Some(BranchPolicy::everything()),
    }
}

fn v2() -> Value {
    group(
        "2.0.0",
        vec![file("StarRail_2.0.0.zip", "A1")],
        vec![audio("Audio_English_2.0.0.zip", "B1", "en-us"), audio("Audio_Korean_2.0.0.zip", "C1", "ko-kr")],
    )
}

#[test]
fn test_update_is_idempotent() {
    let mut reconciler = Reconciler::new(policy());
    let catalogue = package(v2(), vec![]);

    assert!(reconciler.update(&catalogue).unwrap());
    let stamp = reconciler.last_changed_at();
    let current = reconciler.current().to_vec();

    assert!(!reconciler.update(&catalogue).unwrap());
    assert_eq!(reconciler.current(), current);
    assert_eq!(reconciler.last_changed_at(), stamp);
    assert!(reconciler.deprecated().is_empty());
}

#[test]
fn test_new_version_deprecates_old_major() {
    let mut reconciler = Reconciler::new(policy());
    reconciler.update(&package(v2(), vec![])).unwrap();

    let v21 = group(
        "2.1.0",
        vec![file("StarRail_2.1.0.zip", "A2")],
        vec![audio("Audio_English_2.1.0.zip", "B2", "en-us")],
    );
    let patch = group("2.0.0", vec![file("StarRail_2.0.0_2.1.0_hdiff.zip", "D1")], vec![]);
    assert!(reconciler.update(&package(v21, vec![patch])).unwrap());

    let mut evicted: Vec<String> = reconciler.deprecated().iter().map(|k| k.name.clone()).collect();
    evicted.sort();
    assert_eq!(evicted, ["Audio_English_2.0.0.zip", "StarRail_2.0.0.zip"]);
    assert_eq!(reconciler.current().len(), 3);
}

#[test]
fn test_added_patch_deprecates_nothing() {
    let mut reconciler = Reconciler::new(policy());
    let major = group("2.0.0", vec![file("StarRail_2.0.0.zip", "A1")], vec![]);
    reconciler.update(&package(major.clone(), vec![])).unwrap();

    let patch = group("1.6.0", vec![file("StarRail_1.6.0_2.0.0_hdiff.zip", "D0")], vec![]);
    assert!(reconciler.update(&package(major, vec![patch])).unwrap());

    assert!(reconciler.deprecated().is_empty());
    let current = reconciler.current();
    assert_eq!(current.len(), 2);
    assert!(current[1].has_tag("pkg:patch"));
    assert!(current[1].has_tag("patch:latest"));
}

#[test]
fn test_duplicate_hash_first_wins() {
    let mut reconciler = Reconciler::new(policy());
    let major = group(
        "2.0.0",
        vec![file("StarRail_2.0.0.zip", "ABC")],
        vec![audio("Audio_English_2.0.0.zip", "abc", "en-us")],
    );
    reconciler.update(&package(major, vec![])).unwrap();

    let current = reconciler.current();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].name, "StarRail_2.0.0.zip");
    assert_eq!(current[0].content_hash.as_str(), "abc");
}

#[test]
fn test_malformed_payload_leaves_state() {
    let mut reconciler = Reconciler::new(policy());
    reconciler.update(&package(v2(), vec![])).unwrap();
    let before = reconciler.current().to_vec();

    let mut broken = file("StarRail_2.1.0.zip", "A2");
    broken["decompressed_size"] = json!("-1");
    let err = reconciler
        .update(&package(group("2.1.0", vec![broken], vec![]), vec![]))
        .unwrap_err();

    assert!(matches!(err, CatalogueError::MalformedNumber { field: "decompressed_size", .. }));
    assert_eq!(reconciler.current(), before);
}
