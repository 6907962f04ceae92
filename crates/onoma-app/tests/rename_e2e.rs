use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Mutex;

use onoma_app::services::{
    ArchiveError, Archiver, BatchOrchestrator, DirArchiver, FileStatus, NamingOracle, OracleError,
    OracleItem, OracleLabel, OracleResult, OrchestratorConfig, RenameQueue, collect_completed,
    collect_image_targets,
};

/// Test oracle mapping file stems to fixed label triples.
struct TableOracle {
    labels: HashMap<String, (String, String, String)>,
}

impl TableOracle {
    fn new(entries: &[(&str, (&str, &str, &str))]) -> Self {
        Self {
            labels: entries
                .iter()
                .map(|(stem, (english, chinese, domain))| {
                    (
                        (*stem).to_string(),
                        (
                            (*english).to_string(),
                            (*chinese).to_string(),
                            (*domain).to_string(),
                        ),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl NamingOracle for TableOracle {
    async fn infer(&self, items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
        Ok(items
            .iter()
            .map(|item| {
                let (english, chinese, domain) = self
                    .labels
                    .get(&item.stem)
                    .cloned()
                    .unwrap_or_else(|| (item.stem.clone(), "图".to_string(), "app".to_string()));
                OracleLabel {
                    id: item.id.clone(),
                    english,
                    chinese,
                    domain,
                }
            })
            .collect())
    }
}

struct FailingOracle;

#[async_trait]
impl NamingOracle for FailingOracle {
    async fn infer(&self, _items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
        Err(OracleError::Permanent("service rejected the batch".to_string()))
    }
}

fn write_source_images(dir: &TempDir, names: &[&str]) {
    for name in names {
        fs::write(dir.path().join(name), format!("bytes-of-{name}")).expect("write source image");
    }
}

fn orchestrator_for(
    source: &TempDir,
    oracle: Arc<dyn NamingOracle>,
    chunk_size: usize,
) -> BatchOrchestrator {
    let targets = collect_image_targets(source.path(), None).expect("collect intake targets");
    let mut queue = RenameQueue::new();
    for target in &targets {
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .expect("target has a file name");
        queue.enqueue(name);
    }
    BatchOrchestrator::new(
        Arc::new(Mutex::new(queue)),
        oracle,
        OrchestratorConfig {
            chunk_size,
            cooldown: Duration::from_millis(20),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn full_run_renames_and_exports_the_bundle() {
    let source = TempDir::new().expect("source dir");
    write_source_images(&source, &["icon1.png", "icon2.png", "icon3.png"]);
    // A stray non-image must never reach the queue.
    fs::write(source.path().join("notes.txt"), b"ignored").expect("write stray file");

    let oracle = Arc::new(TableOracle::new(&[
        ("icon1", ("Home", "首页", "app")),
        ("icon2", ("Home", "首页", "app")),
        ("icon3", ("Search", "搜索", "web")),
    ]));
    let orchestrator = orchestrator_for(&source, oracle, 50);

    orchestrator.run().await;

    let snapshot = orchestrator.snapshot().await;
    assert_eq!(snapshot.len(), 3, "stray files must be filtered at intake");
    let names: HashMap<&str, Option<&str>> = snapshot
        .iter()
        .map(|record| (record.original_name.as_str(), record.new_name.as_deref()))
        .collect();
    assert_eq!(names["icon1.png"], Some("Home--首页--app.png"));
    assert_eq!(names["icon2.png"], Some("Home--首页--app_1.png"));
    assert_eq!(names["icon3.png"], Some("Search--搜索--web.png"));

    let dest = TempDir::new().expect("dest dir");
    let bundle_dir = dest.path().join("bundle");
    let entries = collect_completed(&snapshot, source.path()).expect("collect completed entries");
    let written = DirArchiver::new(&bundle_dir)
        .bundle(&entries)
        .expect("bundle export succeeds");

    assert_eq!(written, bundle_dir);
    assert_eq!(
        fs::read(bundle_dir.join("Home--首页--app.png")).expect("renamed file exists"),
        b"bytes-of-icon1.png"
    );
    assert_eq!(
        fs::read(bundle_dir.join("Home--首页--app_1.png")).expect("deduped file exists"),
        b"bytes-of-icon2.png"
    );
    assert_eq!(
        fs::read(bundle_dir.join("Search--搜索--web.png")).expect("third file exists"),
        b"bytes-of-icon3.png"
    );
}

#[tokio::test(start_paused = true)]
async fn chunked_run_completes_every_record_with_unique_names() {
    let source = TempDir::new().expect("source dir");
    let files = ["a.png", "b.png", "c.png", "d.png", "e.png"];
    write_source_images(&source, &files);

    // Every stem maps to the same triple, forcing dedup across chunks.
    let oracle = Arc::new(TableOracle::new(&[
        ("a", ("Button", "按钮", "kit")),
        ("b", ("Button", "按钮", "kit")),
        ("c", ("Button", "按钮", "kit")),
        ("d", ("Button", "按钮", "kit")),
        ("e", ("Button", "按钮", "kit")),
    ]));
    let orchestrator = orchestrator_for(&source, oracle, 2);

    orchestrator.run().await;

    let counts = orchestrator.counts().await;
    assert_eq!(counts.completed, files.len());
    assert_eq!(counts.errored, 0);

    let snapshot = orchestrator.snapshot().await;
    let mut lowered = HashSet::new();
    for record in &snapshot {
        assert_eq!(record.status, FileStatus::Completed);
        let name = record.new_name.as_deref().expect("completed record has a name");
        assert!(
            lowered.insert(name.to_lowercase()),
            "case-insensitive collision on {name}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn failed_run_refuses_to_export() {
    let source = TempDir::new().expect("source dir");
    write_source_images(&source, &["a.png", "b.png"]);

    let orchestrator = orchestrator_for(&source, Arc::new(FailingOracle), 50);
    orchestrator.run().await;

    let counts = orchestrator.counts().await;
    assert_eq!(counts.completed, 0);
    assert_eq!(counts.errored, 2);
    assert_eq!(counts.processed(), 2, "errors still count as processed");

    let snapshot = orchestrator.snapshot().await;
    let err = collect_completed(&snapshot, source.path())
        .expect_err("nothing completed must refuse to export");
    assert!(matches!(err, ArchiveError::NothingCompleted));
}
