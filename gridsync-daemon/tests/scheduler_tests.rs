use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast::error::RecvError;

use gridsync_core::{
    Attribute, ContentRef, ContentSchema, Entry, Locale, MemoryContentStore, ProjectId, Settings,
};
use gridsync_daemon::{Scheduler, SchedulerConfig};
use gridsync_grid::FakeGrid;
use gridsync_sync::{Engine, NewConfig, NewProject, ProjectUpdate};

fn engine(home: &Path, grid: &FakeGrid) -> Arc<Engine> {
    let store = MemoryContentStore::new().with_locales(vec![
        Locale {
            code: "en".into(),
            name: "English (en)".into(),
            is_default: true,
        },
        Locale {
            code: "de".into(),
            name: "German (de)".into(),
            is_default: false,
        },
    ]);
    store.insert_schema(
        ContentSchema::new("page")
            .with_attribute("title", Attribute::of("string"))
            .with_attribute("summary", Attribute::of("text")),
    );
    for id in ["1", "2"] {
        store.insert_entry(
            "page",
            Entry::new(id)
                .with_field("title", json!(format!("Page {id}")))
                .with_field("summary", json!(format!("Summary {id}"))),
        );
    }
    Arc::new(Engine::new(
        home,
        Settings::default(),
        Arc::new(store),
        Arc::new(grid.clone()),
    ))
}

/// Persist a project without pushing: it is created before any configuration exists.
fn add_project(engine: &Engine, name: &str, entry: &str) -> ProjectId {
    let (project, outcome) = engine
        .create_project(NewProject {
            name: name.into(),
            source_language: "en".into(),
            target_languages: vec!["de".into()],
            selected_content: vec![ContentRef::new("page", entry)],
            config: None,
        })
        .expect("project");
    assert!(outcome.is_none());
    project.id
}

fn add_config(engine: &Engine) {
    engine
        .add_config(NewConfig {
            name: "Main".into(),
            api_key: "key".into(),
            view_id: "view".into(),
            is_active: true,
            ..NewConfig::default()
        })
        .expect("config");
}

fn config() -> SchedulerConfig {
    SchedulerConfig {
        interval: Duration::from_secs(60),
        warmup: Duration::from_secs(2),
    }
}

#[tokio::test(start_paused = true)]
async fn first_pass_waits_for_warmup_then_emits_event() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), &grid);
    add_project(&engine, "Site", "1");
    add_config(&engine);

    let handle = Scheduler::spawn(engine.clone(), config());
    let mut events = handle.subscribe();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(grid.calls().is_empty(), "no remote call before warm-up");

    let event = events.recv().await.expect("event");
    assert_eq!(event.name(), "background-sync-completed");
    assert_eq!(event.project_id, ProjectId::from("site"));
    assert_eq!(event.records_sent, 2);
    assert_eq!(grid.records().len(), 2);

    let project = engine.get_project(&event.project_id).expect("project");
    assert!(project.last_sync.is_some());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn failing_project_does_not_block_the_pass() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), &grid);
    let broken = add_project(&engine, "Broken", "1");
    engine
        .update_project(
            &broken,
            ProjectUpdate {
                config: Some(Some("missing".into())),
                ..ProjectUpdate::default()
            },
        )
        .expect("update");
    add_project(&engine, "Site", "2");
    add_config(&engine);

    let handle = Scheduler::spawn(engine.clone(), config());
    let mut events = handle.subscribe();

    let event = events.recv().await.expect("event");
    assert_eq!(event.project_id, ProjectId::from("site"));
    assert!(grid.record("page_2_title").is_some());
    assert!(grid.record("page_1_title").is_none());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_warmup_closes_the_event_stream() {
    let home = TempDir::new().expect("home");
    let grid = FakeGrid::new();
    let engine = engine(home.path(), &grid);
    add_project(&engine, "Site", "1");
    add_config(&engine);

    let handle = Scheduler::spawn(
        engine,
        SchedulerConfig {
            interval: Duration::from_secs(60),
            warmup: Duration::from_secs(3600),
        },
    );
    let mut events = handle.subscribe();
    handle.shutdown().await.expect("shutdown");

    assert!(matches!(events.recv().await, Err(RecvError::Closed)));
    assert!(grid.calls().is_empty());
}
