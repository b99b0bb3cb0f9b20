//! In-memory grid view for tests and offline runs.
//!
//! Behaves like the remote service where the engine depends on it:
//! - record upserts merge cells by column id
//! - changing a source cell marks dependent target cells `outOfDate`
//! - every call is logged; failures can be scripted per operation

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use gridsync_core::GridConfig;
use serde_json::{json, Value};

use crate::client::{validate_config, Connect, GridApi};
use crate::error::GridError;
use crate::wire::{Cell, Column, Dependency, DependencyStatus, NewColumn, Record, View};

/// Operation kinds, for scripting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetView,
    ListRecords,
    CreateRecords,
    CreateColumn,
    ListDependencies,
    CreateDependency,
}

/// One logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetView,
    ListRecords { limit: usize, offset: usize },
    CreateRecords { count: usize },
    CreateColumn { id: String },
    ListDependencies,
    CreateDependency { source: String, target: String },
}

#[derive(Debug, Default)]
struct State {
    columns: Vec<Column>,
    records: Vec<Record>,
    dependencies: Vec<Dependency>,
    calls: Vec<Call>,
    /// Pending failures: op → (calls to let through first, status, body).
    failures: HashMap<Op, (usize, u16, Value)>,
}

/// Cloning shares the underlying view.
#[derive(Debug, Clone, Default)]
pub struct FakeGrid {
    state: Arc<Mutex<State>>,
}

impl FakeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `status` and `body`.
    pub fn fail_next(&self, op: Op, status: u16, body: Value) {
        self.fail_after(op, 0, status, body);
    }

    /// Let `skip` calls of `op` succeed, then fail one.
    pub fn fail_after(&self, op: Op, skip: usize, status: u16, body: Value) {
        self.lock().failures.insert(op, (skip, status, body));
    }

    pub fn insert_column(&self, column: Column) {
        self.lock().columns.push(column);
    }

    pub fn insert_dependency(&self, dependency: Dependency) {
        self.lock().dependencies.push(dependency);
    }

    pub fn insert_record(&self, record: Record) {
        self.lock().records.push(record);
    }

    /// Simulate a translator filling in `column` on `record_id`.
    pub fn set_cell(
        &self,
        record_id: &str,
        column: &str,
        value: &str,
        status: DependencyStatus,
    ) -> bool {
        let mut state = self.lock();
        let Some(record) = state.records.iter_mut().find(|r| r.id == record_id) else {
            return false;
        };
        let cell = Cell {
            column_id: column.to_string(),
            value: Some(Value::String(value.to_string())),
            dependency_status: Some(status),
        };
        match record.cells.iter().position(|c| c.column_id == column) {
            Some(i) => record.cells[i] = cell,
            None => record.cells.push(cell),
        }
        true
    }

    pub fn columns(&self) -> Vec<Column> {
        self.lock().columns.clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn record(&self, id: &str) -> Option<Record> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.lock().dependencies.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Sizes of every `create_records` call, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateRecords { count } => Some(*count),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log `call` and return the scripted failure for `op`, if due.
    fn enter(&self, op: Op, call: Call) -> Result<MutexGuard<'_, State>, GridError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some((skip, status, body)) = state.failures.remove(&op) {
            if skip == 0 {
                return Err(GridError::api(status, body));
            }
            state.failures.insert(op, (skip - 1, status, body));
        }
        Ok(state)
    }
}

impl GridApi for FakeGrid {
    fn get_view(&self) -> Result<View, GridError> {
        let state = self.enter(Op::GetView, Call::GetView)?;
        Ok(View {
            id: Some("fake".to_string()),
            name: Some("Fake view".to_string()),
            columns: state.columns.clone(),
        })
    }

    fn list_records(&self, limit: usize, offset: usize) -> Result<Vec<Record>, GridError> {
        let state = self.enter(Op::ListRecords, Call::ListRecords { limit, offset })?;
        Ok(state.records.iter().skip(offset).take(limit).cloned().collect())
    }

    fn create_records(&self, records: &[Record]) -> Result<Value, GridError> {
        let mut state = self.enter(
            Op::CreateRecords,
            Call::CreateRecords {
                count: records.len(),
            },
        )?;
        let sources: Vec<Dependency> = state.dependencies.clone();
        for incoming in records {
            match state.records.iter().position(|r| r.id == incoming.id) {
                Some(i) => merge_record(&mut state.records[i], incoming, &sources),
                None => state.records.push(incoming.clone()),
            }
        }
        Ok(json!(records.iter().map(|r| json!({ "id": r.id })).collect::<Vec<_>>()))
    }

    fn create_column(&self, column: &NewColumn) -> Result<Column, GridError> {
        let mut state = self.enter(
            Op::CreateColumn,
            Call::CreateColumn {
                id: column.id().to_string(),
            },
        )?;
        if state.columns.iter().any(|c| c.id == column.id()) {
            return Err(GridError::api(
                409,
                json!({ "message": format!("Column {} already exists", column.id()) }),
            ));
        }
        let created = match column {
            NewColumn::Metadata(c) => Column {
                id: c.id.clone(),
                name: Some(c.name.clone()),
                kind: Some(c.kind.clone()),
                is_source: None,
                is_target: None,
                language_code: None,
                localization_type: None,
            },
            NewColumn::Language(c) => Column {
                id: c.id.clone(),
                name: Some(c.name.clone()),
                kind: Some(c.kind.clone()),
                is_source: Some(c.is_source),
                is_target: Some(c.is_target),
                language_code: Some(c.language_code.clone()),
                localization_type: Some(c.localization_type),
            },
        };
        state.columns.push(created.clone());
        Ok(created)
    }

    fn list_dependencies(&self) -> Result<Vec<Dependency>, GridError> {
        let state = self.enter(Op::ListDependencies, Call::ListDependencies)?;
        Ok(state.dependencies.clone())
    }

    fn create_dependency(&self, dependency: &Dependency) -> Result<Dependency, GridError> {
        let mut state = self.enter(
            Op::CreateDependency,
            Call::CreateDependency {
                source: dependency.source_column_id.clone(),
                target: dependency.target_column_id.clone(),
            },
        )?;
        if state.dependencies.contains(dependency) {
            return Err(GridError::api(409, json!({ "message": "Dependency already exists" })));
        }
        state.dependencies.push(dependency.clone());
        Ok(dependency.clone())
    }
}

impl Connect for FakeGrid {
    fn connect(&self, config: &GridConfig) -> Result<Arc<dyn GridApi>, GridError> {
        validate_config(config)?;
        Ok(Arc::new(self.clone()))
    }
}

/// Overwrite cells present in `incoming`; targets of a changed source go stale.
fn merge_record(existing: &mut Record, incoming: &Record, dependencies: &[Dependency]) {
    if incoming.path.is_some() {
        existing.path = incoming.path.clone();
    }
    for cell in &incoming.cells {
        let changed = match existing.cells.iter().position(|c| c.column_id == cell.column_id) {
            Some(i) => {
                let current = &mut existing.cells[i];
                let changed = current.value != cell.value;
                current.value = cell.value.clone();
                changed
            }
            None => {
                existing.cells.push(cell.clone());
                true
            }
        };
        if !changed {
            continue;
        }
        for dep in dependencies.iter().filter(|d| d.source_column_id == cell.column_id) {
            if let Some(target) = existing
                .cells
                .iter_mut()
                .find(|c| c.column_id == dep.target_column_id)
            {
                target.dependency_status = Some(DependencyStatus::OutOfDate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: &str) -> Record {
        Record {
            id: id.to_string(),
            path: None,
            cells: vec![Cell::new("en", source)],
        }
    }

    #[test]
    fn list_records_pages() {
        let grid = FakeGrid::new();
        grid.create_records(&(0..5).map(|i| record(&format!("r{i}"), "x")).collect::<Vec<_>>())
            .expect("create");
        assert_eq!(grid.list_records(2, 0).expect("page").len(), 2);
        assert_eq!(grid.list_records(2, 4).expect("page").len(), 1);
        assert!(grid.list_records(2, 6).expect("page").is_empty());
    }

    #[test]
    fn source_change_marks_targets_stale() {
        let grid = FakeGrid::new();
        grid.insert_dependency(Dependency::new("en", "fr"));
        grid.create_records(&[record("r1", "Hello")]).expect("create");
        grid.set_cell("r1", "fr", "Bonjour", DependencyStatus::UpToDate);

        grid.create_records(&[record("r1", "Hello")]).expect("same");
        assert!(grid.record("r1").unwrap().cell("fr").unwrap().is_translated());

        grid.create_records(&[record("r1", "Hello there")]).expect("changed");
        let fr = grid.record("r1").unwrap().cell("fr").cloned().unwrap();
        assert_eq!(fr.dependency_status, Some(DependencyStatus::OutOfDate));
    }

    #[test]
    fn scripted_failure_fires_once_after_skips() {
        let grid = FakeGrid::new();
        grid.fail_after(Op::CreateRecords, 1, 500, json!({"error": "boom"}));
        assert!(grid.create_records(&[record("a", "x")]).is_ok());
        let err = grid.create_records(&[record("b", "x")]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(grid.create_records(&[record("c", "x")]).is_ok());
        assert_eq!(grid.batch_sizes(), vec![1, 1, 1]);
    }
}
