//! The engine facade: project and configuration lifecycle plus the
//! foreground sync, progress and import operations.
//!
//! Every operation on a project runs under that project's in-process lock,
//! so a scheduler tick and a manual sync in the same process never overlap.
//! The cooldown still throttles across processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;

use gridsync_core::{
    registry, settings, ConfigId, ContentRef, ContentStore, FsContentStore, GridConfig,
    ImportStatus, Project, ProjectId, RegistryError, Settings, Subproject, SyncStatus,
};
use gridsync_grid::{Column, Connect, Dependency, GridApi, HttpConnector};

use crate::codec::build_records;
use crate::diff::{diff_items, DiffReport, SkipReason};
use crate::error::SyncError;
use crate::import::{apply_groups, group_records, ImportReport};
use crate::provision::{ensure_columns, ensure_dependencies, ensure_schema, SchemaReport};
use crate::pull::{compute_progress, fetch_all, ProgressReport};
use crate::push::push_records;

// ---------------------------------------------------------------------------
// 1. Requests and outcomes
// ---------------------------------------------------------------------------

/// Input to [`Engine::add_config`].
#[derive(Debug, Clone, Default)]
pub struct NewConfig {
    pub name: String,
    pub api_key: String,
    pub view_id: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
}

/// Partial edit of a grid configuration; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub name: Option<String>,
    pub api_key: Option<String>,
    pub view_id: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Input to [`Engine::create_project`].
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub selected_content: Vec<ContentRef>,
    pub config: Option<ConfigId>,
}

/// Partial edit of a project. Id, creation date and progress are not editable.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub selected_content: Option<Vec<ContentRef>>,
    /// `Some(None)` clears the reference.
    pub config: Option<Option<ConfigId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Push every selected item.
    Full,
    /// Push only items the diff reports as dirty.
    Incremental,
}

/// Result of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub project: ProjectId,
    pub mode: SyncMode,
    /// Why nothing was pushed, for incremental runs that found no work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub records_sent: usize,
    pub batches: usize,
    pub total_records: usize,
    pub schema: SchemaReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressReport>,
}

impl SyncOutcome {
    fn skipped(project: &ProjectId, mode: SyncMode, reason: Option<SkipReason>) -> Self {
        Self {
            project: project.clone(),
            mode,
            skipped: reason,
            records_sent: 0,
            batches: 0,
            total_records: 0,
            schema: SchemaReport::default(),
            progress: None,
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    home: PathBuf,
    settings: Settings,
    store: Arc<dyn ContentStore>,
    connector: Arc<dyn Connect>,
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl Engine {
    pub fn new(
        home: impl Into<PathBuf>,
        settings: Settings,
        store: Arc<dyn ContentStore>,
        connector: Arc<dyn Connect>,
    ) -> Self {
        Self {
            home: home.into(),
            settings,
            store,
            connector,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Engine over `<home>/.gridsync`: settings from `settings.yaml`, the
    /// filesystem content store and the HTTP grid client.
    pub fn open_at(home: &Path) -> Result<Self, SyncError> {
        let settings = settings::load_at(home)?;
        let store = FsContentStore::new(settings.content_dir_at(home));
        let connector = HttpConnector::new(settings.api_base_url.clone(), settings.request_timeout());
        Ok(Self::new(home, settings, Arc::new(store), Arc::new(connector)))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    fn lock_project(&self, id: &ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop the lock entry of a project that no longer exists. Callers still
    /// holding the old `Arc` keep their guard.
    fn release_project(&self, id: &ProjectId) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.remove(id);
    }

    fn connect(&self, config: &GridConfig) -> Result<Arc<dyn GridApi>, SyncError> {
        Ok(self.connector.connect(config)?)
    }

    // -----------------------------------------------------------------------
    // 2a. Grid configurations
    // -----------------------------------------------------------------------

    pub fn add_config(&self, new: NewConfig) -> Result<GridConfig, SyncError> {
        let id = ConfigId::from(registry::id_for_name(&new.name)?);
        let now = Utc::now();
        let config = GridConfig {
            id,
            name: new.name,
            api_key: new.api_key,
            view_id: new.view_id,
            description: new.description,
            is_active: new.is_active,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        registry::insert_config_at(&self.home, &config)?;
        tracing::info!(config = %config.id, "grid configuration added");
        Ok(config)
    }

    pub fn update_config(&self, id: &ConfigId, update: ConfigUpdate) -> Result<GridConfig, SyncError> {
        let mut config = registry::load_config_at(&self.home, id)?;
        if let Some(name) = update.name {
            config.name = name;
        }
        if let Some(api_key) = update.api_key {
            config.api_key = api_key;
        }
        if let Some(view_id) = update.view_id {
            config.view_id = view_id;
        }
        if let Some(description) = update.description {
            config.description = Some(description);
        }
        if let Some(is_active) = update.is_active {
            config.is_active = is_active;
        }
        config.updated_at = Utc::now();
        registry::save_config_at(&self.home, &config)?;
        Ok(config)
    }

    pub fn get_config(&self, id: &ConfigId) -> Result<GridConfig, SyncError> {
        Ok(registry::load_config_at(&self.home, id)?)
    }

    pub fn list_configs(&self) -> Result<Vec<GridConfig>, SyncError> {
        Ok(registry::list_configs_at(&self.home)?)
    }

    pub fn delete_config(&self, id: &ConfigId) -> Result<(), SyncError> {
        registry::delete_config_at(&self.home, id)?;
        Ok(())
    }

    /// Fetch the view descriptor; returns its columns.
    pub fn test_connection(&self, id: &ConfigId) -> Result<Vec<Column>, SyncError> {
        let config = self.get_config(id)?;
        let api = self.connect(&config)?;
        let view = api.get_view()?;
        tracing::info!(config = %config.id, columns = view.columns.len(), "connection ok");
        Ok(view.columns)
    }

    /// The project's own configuration, else the first active one.
    pub fn resolve_config(&self, project: &Project) -> Result<GridConfig, SyncError> {
        if let Some(id) = &project.config {
            return match registry::load_config_at(&self.home, id) {
                Ok(config) => Ok(config),
                Err(RegistryError::NotFound { .. }) => Err(SyncError::Config(format!(
                    "grid configuration '{id}' referenced by project '{}' does not exist",
                    project.id
                ))),
                Err(err) => Err(err.into()),
            };
        }
        registry::first_active_config_at(&self.home)?
            .ok_or_else(|| SyncError::Config("no active grid configuration".to_string()))
    }

    // -----------------------------------------------------------------------
    // 2b. Schema
    // -----------------------------------------------------------------------

    pub fn validate_columns(
        &self,
        config: &ConfigId,
        source_language: &str,
        target_languages: &[String],
    ) -> Result<Vec<Column>, SyncError> {
        let api = self.connect(&self.get_config(config)?)?;
        let locales = self.store.list_locales()?;
        Ok(ensure_columns(api.as_ref(), &locales, source_language, target_languages)?)
    }

    pub fn validate_dependencies(
        &self,
        config: &ConfigId,
        source_language: &str,
        target_languages: &[String],
    ) -> Result<Vec<Dependency>, SyncError> {
        let api = self.connect(&self.get_config(config)?)?;
        Ok(ensure_dependencies(api.as_ref(), source_language, target_languages)?)
    }

    pub fn ensure_schema(
        &self,
        config: &ConfigId,
        source_language: &str,
        target_languages: &[String],
        include_dependencies: bool,
    ) -> Result<SchemaReport, SyncError> {
        let api = self.connect(&self.get_config(config)?)?;
        let locales = self.store.list_locales()?;
        Ok(ensure_schema(
            api.as_ref(),
            &locales,
            source_language,
            target_languages,
            include_dependencies,
        )?)
    }

    // -----------------------------------------------------------------------
    // 2c. Projects
    // -----------------------------------------------------------------------

    pub fn list_projects(&self) -> Result<Vec<Project>, SyncError> {
        Ok(registry::list_projects_at(&self.home)?)
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Project, SyncError> {
        Ok(registry::load_project_at(&self.home, id)?)
    }

    pub fn delete_project(&self, id: &ProjectId) -> Result<(), SyncError> {
        let lock = self.lock_project(id);
        let _guard = guard(&lock);
        let deleted = registry::delete_project_at(&self.home, id);
        self.release_project(id);
        deleted?;
        tracing::info!(project = %id, "project deleted");
        Ok(())
    }

    pub fn update_project(&self, id: &ProjectId, update: ProjectUpdate) -> Result<Project, SyncError> {
        let lock = self.lock_project(id);
        let _guard = guard(&lock);
        let mut project = self.get_project(id)?;
        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(selected) = update.selected_content {
            project.selected_content = selected;
        }
        if let Some(config) = update.config {
            project.config = config;
        }
        registry::save_project_at(&self.home, &project)?;
        Ok(project)
    }

    /// Persist a project with one subproject per target language. When it
    /// selects content and a configuration resolves, the content is pushed
    /// right away; if that fails the project is deleted again.
    pub fn create_project(&self, new: NewProject) -> Result<(Project, Option<SyncOutcome>), SyncError> {
        if new.source_language.trim().is_empty() {
            return Err(SyncError::Invalid("source language is required".to_string()));
        }
        let id = ProjectId::from(registry::id_for_name(&new.name)?);
        let mut project = Project::new(id.clone(), new.name, new.source_language);
        project.selected_content = new.selected_content;
        project.config = new.config;
        for lang in new.target_languages {
            if lang != project.source_language
                && !project.subprojects.iter().any(|s| s.target_language == lang)
            {
                project.subprojects.push(Subproject::new(lang));
            }
        }

        let lock = self.lock_project(&id);
        let _guard = guard(&lock);
        registry::insert_project_at(&self.home, &project)?;
        tracing::info!(project = %id, languages = project.subprojects.len(), "project created");

        if project.selected_content.is_empty() {
            return Ok((project, None));
        }
        if project.config.is_none() && registry::first_active_config_at(&self.home)?.is_none() {
            tracing::info!(project = %id, "no grid configuration; initial push skipped");
            return Ok((project, None));
        }

        match self.sync_locked(&mut project, SyncMode::Full) {
            Ok(outcome) => Ok((project, Some(outcome))),
            Err(err) => {
                tracing::error!(project = %id, error = %err, "initial push failed; removing project");
                if let Err(cleanup) = registry::delete_project_at(&self.home, &id) {
                    tracing::warn!(project = %id, error = %cleanup, "rollback failed");
                }
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // 2d. Sync
    // -----------------------------------------------------------------------

    pub fn sync_project(&self, id: &ProjectId, mode: SyncMode) -> Result<SyncOutcome, SyncError> {
        let lock = self.lock_project(id);
        let _guard = guard(&lock);
        let mut project = self.get_project(id)?;
        self.sync_locked(&mut project, mode)
    }

    /// Incremental sync of every project; one project's failure never stops
    /// the others.
    pub fn reconcile_all(&self) -> Result<Vec<(ProjectId, Result<SyncOutcome, SyncError>)>, SyncError> {
        let projects = self.list_projects()?;
        let mut results = Vec::with_capacity(projects.len());
        for project in projects {
            let result = self.sync_project(&project.id, SyncMode::Incremental);
            if let Err(err) = &result {
                tracing::warn!(project = %project.id, error = %err, "background sync failed");
            }
            results.push((project.id, result));
        }
        Ok(results)
    }

    fn sync_locked(&self, project: &mut Project, mode: SyncMode) -> Result<SyncOutcome, SyncError> {
        if project.selected_content.is_empty() {
            return Ok(SyncOutcome::skipped(&project.id, mode, Some(SkipReason::NoSelectedContent)));
        }
        if mode == SyncMode::Incremental
            && project.cooling_down(Utc::now(), self.settings.cooldown())
        {
            tracing::debug!(project = %project.id, "within cooldown; skipping");
            return Ok(SyncOutcome::skipped(&project.id, mode, Some(SkipReason::Cooldown)));
        }

        let config = self.resolve_config(project)?;
        let api = self.connect(&config)?;
        let policy = &self.settings.field_policy;
        let source = project.source_language.clone();
        let targets = project.target_languages();

        let all = build_records(self.store.as_ref(), &project.selected_content, &source, policy);
        let records = match mode {
            SyncMode::Full => all.clone(),
            SyncMode::Incremental => {
                let remote = fetch_all(api.as_ref(), self.settings.page_limit)?;
                let diff = diff_items(
                    &remote,
                    self.store.as_ref(),
                    &project.selected_content,
                    &source,
                    policy,
                );
                if diff.dirty.is_empty() {
                    return Ok(SyncOutcome::skipped(&project.id, mode, None));
                }
                build_records(self.store.as_ref(), &diff.items(), &source, policy)
            }
        };

        let locales = self.store.list_locales()?;
        let schema = ensure_schema(api.as_ref(), &locales, &source, &targets, !targets.is_empty())?;

        let push = match push_records(api.as_ref(), &records, self.settings.batch_size) {
            Ok(push) => push,
            Err(err) => {
                project.sync_status = Some(SyncStatus::Failed);
                project.sync_error = Some(err.to_string());
                registry::save_project_at(&self.home, project)?;
                return Err(err.into());
            }
        };

        let per_language = all.len();
        project.last_sync = Some(Utc::now());
        project.sync_status = Some(SyncStatus::Completed);
        project.sync_error = None;
        project.records_sent = push.records_count;
        project.total_records = per_language * targets.len().max(1);
        for sub in project.subprojects.iter_mut() {
            sub.number_of_records = per_language;
        }
        registry::save_project_at(&self.home, project)?;
        tracing::info!(
            project = %project.id,
            records = push.records_count,
            batches = push.batch_responses.len(),
            "sync completed"
        );

        let progress = match self.progress_locked(project, api.as_ref()) {
            Ok(progress) => Some(progress),
            Err(err) => {
                tracing::warn!(project = %project.id, error = %err, "progress refresh after sync failed");
                None
            }
        };

        Ok(SyncOutcome {
            project: project.id.clone(),
            mode,
            skipped: None,
            records_sent: push.records_count,
            batches: push.batch_responses.len(),
            total_records: project.total_records,
            schema,
            progress,
        })
    }

    // -----------------------------------------------------------------------
    // 2e. Diff
    // -----------------------------------------------------------------------

    /// Compare selected content with the grid, ignoring the cooldown.
    pub fn diff_project(&self, id: &ProjectId) -> Result<DiffReport, SyncError> {
        let project = self.get_project(id)?;
        if project.selected_content.is_empty() {
            return Ok(DiffReport::skipped(SkipReason::NoSelectedContent));
        }
        let api = self.connect(&self.resolve_config(&project)?)?;
        let remote = fetch_all(api.as_ref(), self.settings.page_limit)?;
        Ok(diff_items(
            &remote,
            self.store.as_ref(),
            &project.selected_content,
            &project.source_language,
            &self.settings.field_policy,
        ))
    }

    /// Items whose content differs from the grid; empty during the cooldown
    /// after a successful sync.
    pub fn items_needing_sync(&self, id: &ProjectId) -> Result<Vec<ContentRef>, SyncError> {
        let project = self.get_project(id)?;
        if project.cooling_down(Utc::now(), self.settings.cooldown()) {
            return Ok(Vec::new());
        }
        Ok(self.diff_project(id)?.items())
    }

    // -----------------------------------------------------------------------
    // 2f. Progress and import
    // -----------------------------------------------------------------------

    pub fn refresh_progress(&self, id: &ProjectId) -> Result<ProgressReport, SyncError> {
        let lock = self.lock_project(id);
        let _guard = guard(&lock);
        let mut project = self.get_project(id)?;
        let api = self.connect(&self.resolve_config(&project)?)?;
        self.progress_locked(&mut project, api.as_ref())
    }

    fn progress_locked(
        &self,
        project: &mut Project,
        api: &dyn GridApi,
    ) -> Result<ProgressReport, SyncError> {
        let records = fetch_all(api, self.settings.page_limit)?;
        let languages: Vec<String> = project
            .subprojects
            .iter()
            .map(|s| s.target_language.clone())
            .collect();
        let report = compute_progress(&records, &languages);

        let now = Utc::now();
        project.overall_progress = report.overall;
        project.last_progress_update = Some(now);
        for sub in project.subprojects.iter_mut() {
            if let Some(lang) = report.language(&sub.target_language) {
                sub.progress = lang.percent;
                sub.last_progress_update = Some(now);
            }
        }
        registry::save_project_at(&self.home, project)?;
        tracing::info!(project = %project.id, overall = report.overall, "progress updated");
        Ok(report)
    }

    /// Import up-to-date translations for `languages` (all subproject
    /// languages when empty).
    pub fn import_project(&self, id: &ProjectId, languages: &[String]) -> Result<ImportReport, SyncError> {
        let lock = self.lock_project(id);
        let _guard = guard(&lock);
        let mut project = self.get_project(id)?;
        let languages: Vec<String> = if languages.is_empty() {
            project.target_languages()
        } else {
            languages.to_vec()
        };

        let records = self
            .resolve_config(&project)
            .and_then(|config| self.connect(&config))
            .and_then(|api| fetch_all(api.as_ref(), self.settings.page_limit).map_err(SyncError::from));
        let records = match records {
            Ok(records) => records,
            Err(err) => {
                project.import_status = Some(ImportStatus::Failed);
                project.import_error = Some(err.to_string());
                registry::save_project_at(&self.home, &project)?;
                return Err(err);
            }
        };

        let policy = &self.settings.field_policy;
        let groups = group_records(&records, &languages, self.store.as_ref(), policy);
        let report = ImportReport {
            total_records: records.len(),
            results: apply_groups(self.store.as_ref(), &groups),
        };

        project.last_import = Some(Utc::now());
        project.import_status = Some(ImportStatus::Completed);
        project.import_error = None;
        project.entries_imported = report.succeeded();
        registry::save_project_at(&self.home, &project)?;
        tracing::info!(
            project = %project.id,
            imported = report.succeeded(),
            failed = report.failed(),
            "import completed"
        );
        Ok(report)
    }
}

fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|p| p.into_inner())
}
