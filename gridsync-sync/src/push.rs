//! Batched record upload.

use serde::Serialize;
use serde_json::Value;

use gridsync_grid::{GridApi, GridError, Record};

/// Result of a successful push.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub records_count: usize,
    /// Response body of each batch, in upload order.
    pub batch_responses: Vec<Value>,
}

/// Upload `records` in consecutive batches of at most `batch_size`.
///
/// Batches are sent one at a time; the first failure stops the push. Batches
/// accepted before the failure stay on the grid.
pub fn push_records(
    api: &dyn GridApi,
    records: &[Record],
    batch_size: usize,
) -> Result<PushReport, GridError> {
    let batch_size = batch_size.max(1);
    let batches = records.len().div_ceil(batch_size);
    let mut report = PushReport {
        records_count: records.len(),
        batch_responses: Vec::with_capacity(batches),
    };

    for (index, batch) in records.chunks(batch_size).enumerate() {
        tracing::info!(batch = index + 1, of = batches, records = batch.len(), "uploading batch");
        match api.create_records(batch) {
            Ok(response) => report.batch_responses.push(response),
            Err(err) => {
                tracing::error!(batch = index + 1, error = %err, "batch upload failed");
                return Err(err);
            }
        }
    }
    Ok(report)
}
