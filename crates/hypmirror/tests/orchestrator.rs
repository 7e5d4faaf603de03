use std::sync::{Arc, Mutex};
use std::time::Duration;

use hypmirror::config::TaskConfig;
use hypmirror::{CatalogueSource, Orchestrator, PublicStatus, SourceError, StatusPublisher, Task};
use hypmirror_catalogue::hyp::{GameInfo, GamePackage};
use hypmirror_storage::{Ephemeral, FileStatus, FileStorage, SimulatedDelay};
use serde_json::{Value, json};

#[derive(Clone)]
struct MockSource {
    games:    Vec<GameInfo>,
    packages: Arc<Mutex<Option<Vec<GamePackage>>>>,
}

impl MockSource {
    fn new(games: &[(&str, &str, &str)]) -> Self {
        let games = games
            .iter()
            .map(|(id, biz, name)| {
                serde_json::from_value(json!({"id": id, "biz": biz, "display": {"name": name}})).unwrap()
            })
            .collect();
        Self {
            games,
            packages: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    fn serve(&self, packages: Vec<GamePackage>) { *self.packages.lock().unwrap() = Some(packages); }

    fn fail(&self) { *self.packages.lock().unwrap() = None; }
}

impl CatalogueSource for MockSource {
    fn launcher_id(&self) -> &str { "VYTpXlbWo8" }

    async fn games(&self) -> Result<Vec<GameInfo>, SourceError> { Ok(self.games.clone()) }

    async fn game_packages(&self, game_ids: &[String]) -> Result<Vec<GamePackage>, SourceError> {
        let packages = self.packages.lock().unwrap().clone();
        let packages = packages.ok_or(SourceError::HttpStatus {
            status: 503,
            url:    "mock".to_string(),
        })?;
        Ok(packages.into_iter().filter(|p| game_ids.contains(&p.game.id)).collect())
    }
}

fn file(name: &str, md5: &str) -> Value {
    json!({
        "url": format!("https://cdn.example/{name}"),
        "md5": md5,
        "size": "100",
        "decompressed_size": "200"
    })
}

fn package(id: &str, biz: &str, version: &str, major: &[Value], patches: &[(&str, Value)]) -> GamePackage {
    let patches: Vec<Value> = patches
        .iter()
        .map(|(from, f)| json!({"version": from, "game_pkgs": [f], "audio_pkgs": []}))
        .collect();
    serde_json::from_value(json!({
        "game": {"id": id, "biz": biz},
        "main": {
            "major": {"version": version, "game_pkgs": major, "audio_pkgs": []},
            "patches": patches
        },
        "pre_download": null
    }))
    .unwrap()
}

fn task_config() -> TaskConfig {
    serde_json::from_value(json!({
        "launcher": {"type": "HoYoPlay"},
        "filters": [
            {"matchGameBiz": "nap_global", "branchMain": {"major": true, "patches": true}},
            {"matchGameBiz": "*", "branchMain": {"major": true, "patches": false}}
        ]
    }))
    .unwrap()
}

async fn orchestrator(source: MockSource, publisher: StatusPublisher) -> Orchestrator<MockSource, Ephemeral> {
    let task = Task::resolve(source, &task_config()).await.unwrap();
    Orchestrator::new(vec![task], Ephemeral::new(SimulatedDelay::Fixed(Duration::ZERO)), publisher)
}

fn statuses(status: &PublicStatus, stream: &str) -> Vec<(String, FileStatus)> {
    status
        .streams
        .iter()
        .find(|s| s.stream_id == stream)
        .unwrap()
        .files
        .iter()
        .map(|f| (f.name.clone(), f.record.status))
        .collect()
}

const ZZZ: (&str, &str, &str) = ("U5hbdsT9W7", "nap_global", "Zenless Zone Zero");

#[tokio::test]
async fn test_resolve_applies_exact_and_wildcard_filters() {
    let source = MockSource::new(&[ZZZ, ("gopR6Cufr3", "hk4e_global", "Genshin Impact")]);
    let task = Task::resolve(source, &task_config()).await.unwrap();

    let bizs: Vec<&str> = task.streams().iter().map(|s| s.game_biz.as_str()).collect();
    assert_eq!(bizs, ["nap_global", "hk4e_global"]);
    assert_eq!(task.streams()[0].game_name, "Zenless Zone Zero");
}

#[tokio::test]
async fn test_download_then_ready_then_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");
    let source = MockSource::new(&[ZZZ]);
    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &[file("ZZZ_1.4.0.zip", "aaa")], &[])]);
    let mut orchestrator = orchestrator(source, StatusPublisher::new(Some(path.clone()))).await;

    assert!(orchestrator.tick().await.unwrap());
    let status = orchestrator.last_status().unwrap();
    assert_eq!(statuses(status, "nap_global"), [("ZZZ_1.4.0.zip".to_string(), FileStatus::Downloading)]);
    assert!(status.streams[0].updated_at.is_some());
    assert!(path.exists());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.tick().await.unwrap());
    let file = &orchestrator.last_status().unwrap().streams[0].files[0];
    assert_eq!(file.record.status, FileStatus::Ready);
    assert_eq!(file.record.public_path.as_deref(), Some("/dummy/aaa/ZZZ_1.4.0.zip"));

    assert!(!orchestrator.tick().await.unwrap());
}

#[tokio::test]
async fn test_added_patch_keeps_existing_files() {
    let source = MockSource::new(&[ZZZ]);
    let major = [file("ZZZ_1.4.0.zip", "aaa")];
    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &major, &[])]);
    let mut orchestrator = orchestrator(source.clone(), StatusPublisher::default()).await;

    orchestrator.tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &major, &[("1.3.0", file("ZZZ_1.3.0_1.4.0.zip", "bbb"))])]);
    orchestrator.tick().await.unwrap();

    let stream = &orchestrator.tasks()[0].streams()[0];
    assert!(stream.reconciler.deprecated().is_empty());
    assert_eq!(statuses(orchestrator.last_status().unwrap(), "nap_global"), [
        ("ZZZ_1.4.0.zip".to_string(), FileStatus::Ready),
        ("ZZZ_1.3.0_1.4.0.zip".to_string(), FileStatus::Downloading),
    ]);
}

#[tokio::test]
async fn test_new_version_evicts_old_content() {
    let source = MockSource::new(&[ZZZ]);
    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &[file("ZZZ_1.4.0.zip", "aaa")], &[])]);
    let mut orchestrator = orchestrator(source.clone(), StatusPublisher::default()).await;
    orchestrator.tick().await.unwrap();

    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.5.0", &[file("ZZZ_1.5.0.zip", "ccc")], &[])]);
    orchestrator.tick().await.unwrap();

    let old = orchestrator.tasks()[0].streams()[0].reconciler.deprecated()[0].clone();
    assert_eq!(old.name, "ZZZ_1.4.0.zip");
    assert!(orchestrator.storage().file_info(&old).await.unwrap_err().is_not_found());
    assert_eq!(statuses(orchestrator.last_status().unwrap(), "nap_global").len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_files() {
    let source = MockSource::new(&[ZZZ]);
    source.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &[file("ZZZ_1.4.0.zip", "aaa")], &[])]);
    let mut orchestrator = orchestrator(source.clone(), StatusPublisher::default()).await;
    orchestrator.tick().await.unwrap();
    let changed_at = orchestrator.tasks()[0].streams()[0].reconciler.last_changed_at();

    source.fail();
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.tick().await.unwrap();

    assert_eq!(statuses(orchestrator.last_status().unwrap(), "nap_global"), [(
        "ZZZ_1.4.0.zip".to_string(),
        FileStatus::Ready
    )]);
    assert_eq!(orchestrator.tasks()[0].streams()[0].reconciler.last_changed_at(), changed_at);
}

#[tokio::test]
async fn test_missing_game_is_skipped() {
    let source = MockSource::new(&[ZZZ]);
    source.serve(vec![]);
    let mut orchestrator = orchestrator(source, StatusPublisher::default()).await;

    orchestrator.tick().await.unwrap();
    let status = orchestrator.last_status().unwrap();
    assert!(status.streams[0].files.is_empty());
    assert_eq!(status.streams[0].updated_at, None);
}

#[tokio::test]
async fn test_eviction_spares_content_another_stream_wants() {
    const ZZZ_CN: (&str, &str, &str) = ("x6znKlJ0xK", "nap_cn", "Zenless Zone Zero CN");
    let global = MockSource::new(&[ZZZ]);
    let cn = MockSource::new(&[ZZZ_CN]);
    let shared = [file("ZZZ_1.4.0.zip", "aaa")];
    global.serve(vec![package(ZZZ.0, ZZZ.1, "1.4.0", &shared, &[])]);
    cn.serve(vec![package(ZZZ_CN.0, ZZZ_CN.1, "1.4.0", &shared, &[])]);

    let tasks = vec![
        Task::resolve(global.clone(), &task_config()).await.unwrap(),
        Task::resolve(cn, &task_config()).await.unwrap(),
    ];
    let mut orchestrator = Orchestrator::new(
        tasks,
        Ephemeral::new(SimulatedDelay::Fixed(Duration::ZERO)),
        StatusPublisher::default(),
    );
    orchestrator.tick().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.tick().await.unwrap();

    global.serve(vec![package(ZZZ.0, ZZZ.1, "1.5.0", &[file("ZZZ_1.5.0.zip", "ccc")], &[])]);
    orchestrator.tick().await.unwrap();

    let evicted = &orchestrator.tasks()[0].streams()[0].reconciler.deprecated()[0];
    assert_eq!(evicted.name, "ZZZ_1.4.0.zip");
    assert_eq!(orchestrator.storage().file_info(evicted).await.unwrap().status, FileStatus::Ready);
    assert_eq!(statuses(orchestrator.last_status().unwrap(), "nap_cn"), [(
        "ZZZ_1.4.0.zip".to_string(),
        FileStatus::Ready
    )]);
}
