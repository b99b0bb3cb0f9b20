//! Blocking HTTP implementation over `ureq`.

use std::sync::Arc;
use std::time::Duration;

use gridsync_core::GridConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{validate_config, Connect, GridApi};
use crate::error::GridError;
use crate::wire::{Column, Dependency, NewColumn, Record, View};

pub struct HttpGridClient {
    agent: ureq::Agent,
    base_url: String,
    view_id: String,
    authorization: String,
}

impl HttpGridClient {
    pub fn new(config: &GridConfig, base_url: &str, timeout: Duration) -> Result<Self, GridError> {
        validate_config(config)?;
        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            view_id: config.view_id.clone(),
            authorization: format!("ApiKey {}", config.api_key),
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/v1/views/{}{}", self.base_url, self.view_id, suffix)
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, GridError> {
        let mut request = self.agent.get(url).set("Authorization", &self.authorization);
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::debug!(url, "GET");
        let response = request.call().map_err(from_ureq)?;
        read_json(url, response)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, GridError> {
        tracing::debug!(url, "POST");
        let response = self
            .agent
            .post(url)
            .set("Authorization", &self.authorization)
            .set("Content-Type", "application/json")
            .send_json(body)
            .map_err(from_ureq)?;
        read_json(url, response)
    }
}

impl GridApi for HttpGridClient {
    fn get_view(&self) -> Result<View, GridError> {
        self.get(&self.url(""), &[])
    }

    fn list_records(&self, limit: usize, offset: usize) -> Result<Vec<Record>, GridError> {
        self.get(
            &self.url("/records"),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
    }

    fn create_records(&self, records: &[Record]) -> Result<Value, GridError> {
        self.post(&self.url("/records"), records)
    }

    fn create_column(&self, column: &NewColumn) -> Result<Column, GridError> {
        self.post(&self.url("/columns"), column)
    }

    fn list_dependencies(&self) -> Result<Vec<Dependency>, GridError> {
        self.get(&self.url("/dependencies"), &[])
    }

    fn create_dependency(&self, dependency: &Dependency) -> Result<Dependency, GridError> {
        self.post(&self.url("/dependencies"), dependency)
    }
}

/// Builds [`HttpGridClient`]s against one API base URL.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl Connect for HttpConnector {
    fn connect(&self, config: &GridConfig) -> Result<Arc<dyn GridApi>, GridError> {
        Ok(Arc::new(HttpGridClient::new(config, &self.base_url, self.timeout)?))
    }
}

fn from_ureq(err: ureq::Error) -> GridError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let details = serde_json::from_str(&body).unwrap_or(Value::String(body));
            GridError::api(status, details)
        }
        ureq::Error::Transport(transport) => GridError::Transport(transport.to_string()),
    }
}

/// Empty bodies decode as JSON `null`.
fn read_json<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, GridError> {
    let body = response.into_string().map_err(|source| GridError::Io {
        url: url.to_string(),
        source,
    })?;
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(text).map_err(|source| GridError::Decode {
        url: url.to_string(),
        source,
    })
}
