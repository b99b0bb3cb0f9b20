//! The view-bound grid API seam.

use std::sync::Arc;

use gridsync_core::GridConfig;
use serde_json::Value;

use crate::error::GridError;
use crate::wire::{Column, Dependency, NewColumn, Record, View};

/// Calls against one grid view. Every call is blocking and independent.
pub trait GridApi: Send + Sync {
    /// `GET /v1/views/{viewId}`
    fn get_view(&self) -> Result<View, GridError>;

    /// `GET /v1/views/{viewId}/records?limit&offset`
    fn list_records(&self, limit: usize, offset: usize) -> Result<Vec<Record>, GridError>;

    /// `POST /v1/views/{viewId}/records`; returns the raw response body.
    fn create_records(&self, records: &[Record]) -> Result<Value, GridError>;

    /// `POST /v1/views/{viewId}/columns`
    fn create_column(&self, column: &NewColumn) -> Result<Column, GridError>;

    /// `GET /v1/views/{viewId}/dependencies`
    fn list_dependencies(&self) -> Result<Vec<Dependency>, GridError>;

    /// `POST /v1/views/{viewId}/dependencies`
    fn create_dependency(&self, dependency: &Dependency) -> Result<Dependency, GridError>;
}

/// Opens a [`GridApi`] for a configuration.
pub trait Connect: Send + Sync {
    fn connect(&self, config: &GridConfig) -> Result<Arc<dyn GridApi>, GridError>;
}

/// Fails fast when the configuration cannot authenticate against a view.
pub fn validate_config(config: &GridConfig) -> Result<(), GridError> {
    if config.api_key.trim().is_empty() {
        return Err(GridError::Config(format!(
            "configuration '{}' has no API key",
            config.id
        )));
    }
    if config.view_id.trim().is_empty() {
        return Err(GridError::Config(format!(
            "configuration '{}' has no view id",
            config.id
        )));
    }
    Ok(())
}
