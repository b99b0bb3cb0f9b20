//! End-to-end engine behaviour against the in-memory grid and content store.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::json;
use tempfile::TempDir;

use gridsync_core::{
    Attribute, ContentRef, ContentSchema, ContentStore, ContentType, Entry, Locale,
    MemoryContentStore, ProjectId, Settings, SyncStatus, Visibility,
};
use gridsync_fields::flatten_blocks;
use gridsync_grid::{DependencyStatus, FakeGrid, Op};
use gridsync_sync::{
    Engine, LocaleResult, NewConfig, NewProject, ProjectUpdate, SkipReason, SyncError, SyncMode,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn locales() -> Vec<Locale> {
    vec![
        Locale {
            code: "en".into(),
            name: "English (en)".into(),
            is_default: true,
        },
        Locale {
            code: "fr".into(),
            name: "French (fr)".into(),
            is_default: false,
        },
    ]
}

fn store_with_articles(count: usize) -> Arc<MemoryContentStore> {
    let store = MemoryContentStore::new().with_locales(locales());
    store.insert_schema(
        ContentSchema::new("article")
            .with_attribute("title", Attribute::of("string"))
            .with_attribute("body", Attribute::of("text")),
    );
    for i in 1..=count {
        let mut entry = Entry::new(i.to_string())
            .with_field("title", json!(format!("Article {i}")))
            .with_field("body", json!(format!("Body of article {i}")));
        entry.locale = Some("en".into());
        store.insert_entry("article", entry);
    }
    Arc::new(store)
}

fn engine_with(home: &Path, store: Arc<MemoryContentStore>, grid: &FakeGrid, settings: Settings) -> Engine {
    Engine::new(home, settings, store, Arc::new(grid.clone()))
}

fn engine(home: &Path, store: Arc<MemoryContentStore>, grid: &FakeGrid) -> Engine {
    engine_with(home, store, grid, Settings::default())
}

fn add_config(engine: &Engine, api_key: &str) {
    engine
        .add_config(NewConfig {
            name: "Main".into(),
            api_key: api_key.into(),
            view_id: "view-1".into(),
            is_active: true,
            ..NewConfig::default()
        })
        .expect("config");
}

fn articles(ids: &[usize]) -> Vec<ContentRef> {
    ids.iter()
        .map(|i| ContentRef::new("article", i.to_string()))
        .collect()
}

fn new_project(content: Vec<ContentRef>) -> NewProject {
    NewProject {
        name: "Site".into(),
        source_language: "en".into(),
        target_languages: vec!["fr".into()],
        selected_content: content,
        config: None,
    }
}

fn site() -> ProjectId {
    ProjectId::from("site")
}

// ---------------------------------------------------------------------------
// Project creation
// ---------------------------------------------------------------------------

#[test]
fn first_push_provisions_schema_and_counts_records() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "key");

    let (project, outcome) = engine.create_project(new_project(articles(&[1]))).expect("create");
    let outcome = outcome.expect("initial push");

    let columns = grid.columns();
    assert_eq!(columns.iter().filter(|c| c.id.starts_with("meta_")).count(), 7);
    assert_eq!(columns.len(), 9);
    assert_eq!(grid.dependencies().len(), 1);
    assert_eq!(grid.records().len(), 2);
    assert_eq!(outcome.records_sent, 2);
    assert_eq!(outcome.schema.created_columns.len(), 9);

    let stored = engine.get_project(&project.id).expect("stored");
    assert_eq!(stored.subprojects.len(), 1);
    assert_eq!(stored.subprojects[0].number_of_records, 2);
    assert_eq!(stored.total_records, 2);
    assert_eq!(stored.sync_status, Some(SyncStatus::Completed));
    assert!(stored.last_sync.is_some());
}

#[test]
fn large_selection_uploads_in_three_ordered_batches() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let store = store_with_articles(1250);
    let engine = engine(home.path(), store, &grid);
    add_config(&engine, "key");

    let ids: Vec<usize> = (1..=1250).collect();
    engine.create_project(new_project(articles(&ids))).expect("create");
    assert_eq!(grid.batch_sizes(), vec![1000, 1000, 500]);
}

#[test]
fn failed_initial_push_removes_the_project() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    grid.fail_next(Op::CreateRecords, 500, json!({"message": "Internal error"}));
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "key");

    let err = engine.create_project(new_project(articles(&[1]))).unwrap_err();
    let report = err.to_report();
    assert_eq!(report.error, "remote_api");
    assert_eq!(report.message, "Internal error");
    assert!(engine.list_projects().expect("list").is_empty());
}

#[test]
fn missing_api_key_fails_before_any_remote_call() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "");

    let err = engine.create_project(new_project(articles(&[1]))).unwrap_err();
    assert_eq!(err.category(), "configuration");
    assert!(grid.calls().is_empty());
    assert!(engine.list_projects().expect("list").is_empty());
}

#[test]
fn project_without_content_or_config_is_only_persisted() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);

    let (_, outcome) = engine.create_project(new_project(articles(&[1]))).expect("create");
    assert!(outcome.is_none());
    assert!(grid.calls().is_empty());

    let err = engine.sync_project(&site(), SyncMode::Full).unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[test]
fn incremental_sync_is_skipped_within_cooldown() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(2), &grid);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1, 2]))).expect("create");
    grid.clear_calls();

    let outcome = engine.sync_project(&site(), SyncMode::Incremental).expect("sync");
    assert_eq!(outcome.skipped, Some(SkipReason::Cooldown));
    assert!(engine.items_needing_sync(&site()).expect("diff").is_empty());
    assert!(engine.items_needing_sync(&site()).expect("diff again").is_empty());
    assert!(grid.calls().is_empty());
}

#[test]
fn incremental_sync_pushes_only_changed_items() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let store = store_with_articles(2);
    let settings = Settings {
        cooldown_secs: 0,
        ..Settings::default()
    };
    let engine = engine_with(home.path(), store.clone(), &grid, settings);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1, 2]))).expect("create");

    let untouched = engine.sync_project(&site(), SyncMode::Incremental).expect("noop");
    assert_eq!(untouched.records_sent, 0);
    assert_eq!(untouched.skipped, None);

    let mut patch = serde_json::Map::new();
    patch.insert("body".into(), json!("Rewritten body"));
    store
        .update_entry(&ContentType::from("article"), &"2".into(), patch)
        .expect("edit");

    assert_eq!(
        engine.items_needing_sync(&site()).expect("diff"),
        articles(&[2])
    );
    let outcome = engine.sync_project(&site(), SyncMode::Incremental).expect("sync");
    assert_eq!(outcome.records_sent, 2);
    assert_eq!(grid.batch_sizes().last(), Some(&2));
    assert_eq!(
        grid.record("article_2_body").and_then(|r| r.text("en")).as_deref(),
        Some("Rewritten body")
    );

    let project = engine.get_project(&site()).expect("project");
    assert_eq!(project.records_sent, 2);
    assert_eq!(project.total_records, 4);
    assert_eq!(project.subprojects[0].number_of_records, 4);
}

#[test]
fn concurrent_syncs_of_one_project_push_once() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    engine.create_project(new_project(articles(&[1]))).expect("create");
    add_config(&engine, "key");

    let start = Barrier::new(2);
    let outcomes: Vec<_> = thread::scope(|scope| {
        let workers: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    engine.sync_project(&site(), SyncMode::Incremental)
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("worker").expect("sync"))
            .collect()
    });

    assert_eq!(grid.batch_sizes(), vec![2]);
    assert_eq!(outcomes.iter().filter(|o| o.records_sent == 2).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.skipped == Some(SkipReason::Cooldown))
            .count(),
        1
    );
}

#[test]
fn push_failure_marks_project_failed_and_keeps_last_sync() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1]))).expect("create");
    let before = engine.get_project(&site()).expect("project").last_sync;

    grid.fail_next(Op::CreateRecords, 422, json!({"errors": [{"message": "bad cell"}]}));
    let err = engine.sync_project(&site(), SyncMode::Full).unwrap_err();
    assert_eq!(err.to_string(), "bad cell");

    let project = engine.get_project(&site()).expect("project");
    assert_eq!(project.sync_status, Some(SyncStatus::Failed));
    assert_eq!(project.sync_error.as_deref(), Some("bad cell"));
    assert_eq!(project.last_sync, before);
}

#[test]
fn reconcile_all_continues_past_a_failing_project() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let settings = Settings {
        cooldown_secs: 0,
        ..Settings::default()
    };
    let engine = engine_with(home.path(), store_with_articles(2), &grid, settings);
    add_config(&engine, "key");

    engine
        .create_project(NewProject {
            name: "Broken".into(),
            ..new_project(vec![])
        })
        .expect("broken");
    engine
        .update_project(
            &ProjectId::from("broken"),
            ProjectUpdate {
                selected_content: Some(articles(&[1])),
                config: Some(Some("ghost".into())),
                ..ProjectUpdate::default()
            },
        )
        .expect("update");
    engine
        .create_project(NewProject {
            name: "Site".into(),
            ..new_project(vec![])
        })
        .expect("site");
    engine
        .update_project(
            &site(),
            ProjectUpdate {
                selected_content: Some(articles(&[2])),
                ..ProjectUpdate::default()
            },
        )
        .expect("update");

    let results = engine.reconcile_all().expect("reconcile");
    assert_eq!(results.len(), 2);
    let broken = &results.iter().find(|(id, _)| id.as_str() == "broken").expect("broken").1;
    assert!(matches!(broken, Err(SyncError::Config(_))));
    let ok = &results.iter().find(|(id, _)| id.as_str() == "site").expect("site").1;
    assert_eq!(ok.as_ref().expect("site synced").records_sent, 2);
}

// ---------------------------------------------------------------------------
// Progress and import
// ---------------------------------------------------------------------------

#[test]
fn progress_is_persisted_on_project_and_subprojects() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1]))).expect("create");

    grid.set_cell("article_1_title", "fr", "Article 1 (fr)", DependencyStatus::UpToDate);
    grid.set_cell("article_1_body", "fr", "Corps", DependencyStatus::OutOfDate);

    let report = engine.refresh_progress(&site()).expect("progress");
    assert_eq!(report.overall, 50);

    let project = engine.get_project(&site()).expect("project");
    assert_eq!(project.overall_progress, 50);
    assert_eq!(project.subprojects[0].progress, 50);
    assert!(project.last_progress_update.is_some());
    assert!(project.subprojects[0].last_progress_update.is_some());
}

#[test]
fn import_creates_localized_sibling_from_up_to_date_cells() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let store = store_with_articles(1);
    let engine = engine(home.path(), store.clone(), &grid);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1]))).expect("create");

    grid.set_cell("article_1_title", "fr", "Article un", DependencyStatus::UpToDate);
    grid.set_cell("article_1_body", "fr", "Brouillon", DependencyStatus::OutOfDate);

    let report = engine.import_project(&site(), &[]).expect("import");
    assert_eq!(report.total_records, 2);
    assert_eq!(report.results.len(), 1);
    let LocaleResult::Created { entry_id } = &report.results[0].result else {
        panic!("expected a created sibling: {:?}", report.results[0].result);
    };

    let article = ContentType::from("article");
    let sibling = store
        .get_entry(&article, entry_id, Visibility::Draft)
        .expect("read")
        .expect("sibling");
    assert_eq!(sibling.locale.as_deref(), Some("fr"));
    assert_eq!(sibling.fields["title"], json!("Article un"));
    assert!(sibling.fields.get("body").is_none());

    let project = engine.get_project(&site()).expect("project");
    assert_eq!(project.entries_imported, 1);
    assert!(project.last_import.is_some());
}

#[test]
fn block_content_survives_push_and_import() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let store = MemoryContentStore::new().with_locales(locales());
    store.insert_schema(ContentSchema::new("note"));
    let mut entry = Entry::new("1").with_field(
        "content",
        json!([
            {"type": "heading", "level": 2, "children": [{"type": "text", "text": "Intro"}]},
            {"type": "paragraph", "children": [
                {"type": "text", "text": "Hello"},
                {"type": "link", "url": "https://example.com", "children": [{"type": "text", "text": "world"}]}
            ]},
            {"type": "list", "format": "unordered", "children": [
                {"type": "list-item", "children": [{"type": "text", "text": "one"}]}
            ]}
        ]),
    );
    entry.locale = Some("en".into());
    store.insert_entry("note", entry);
    let store = Arc::new(store);

    let engine = engine(home.path(), store.clone(), &grid);
    add_config(&engine, "key");
    engine
        .create_project(new_project(vec![ContentRef::new("note", "1")]))
        .expect("create");

    let pushed = grid.record("note_1_content").expect("pushed record");
    assert_eq!(pushed.text("en").as_deref(), Some("Intro Hello world one"));

    let translated = "Introduction Bonjour le monde un";
    grid.set_cell("note_1_content", "fr", translated, DependencyStatus::UpToDate);
    let report = engine.import_project(&site(), &[]).expect("import");
    let LocaleResult::Created { entry_id } = &report.results[0].result else {
        panic!("expected a created sibling: {:?}", report.results[0].result);
    };

    let sibling = store
        .get_entry(&ContentType::from("note"), entry_id, Visibility::Draft)
        .expect("read")
        .expect("sibling");
    let content = &sibling.fields["content"];
    assert!(content.is_array());
    assert_eq!(flatten_blocks(content), translated);
}

#[test]
fn import_fetch_failure_is_recorded() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), store_with_articles(1), &grid);
    add_config(&engine, "key");
    engine.create_project(new_project(articles(&[1]))).expect("create");

    grid.fail_next(Op::ListRecords, 403, json!({"error": "Forbidden"}));
    let err = engine.import_project(&site(), &["fr".to_string()]).unwrap_err();
    assert_eq!(err.to_report().details, json!({"error": "Forbidden"}));

    let project = engine.get_project(&site()).expect("project");
    assert_eq!(project.import_error.as_deref(), Some("Forbidden"));
    assert!(project.last_import.is_none());
}
