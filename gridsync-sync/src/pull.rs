//! Paginated reads and translation progress.

use serde::Serialize;

use gridsync_fields::format_language_code;
use gridsync_grid::{GridApi, GridError, Record};

use crate::codec::{translated_text, RecordMeta};

/// Read every record of the view, `limit` at a time, until a short page.
pub fn fetch_all(api: &dyn GridApi, limit: usize) -> Result<Vec<Record>, GridError> {
    let limit = limit.max(1);
    let mut records = Vec::new();
    let mut offset = 0;
    loop {
        let page = api.list_records(limit, offset)?;
        let len = page.len();
        records.extend(page);
        if len < limit {
            break;
        }
        offset += len;
    }
    tracing::debug!(records = records.len(), "fetched grid records");
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProgress {
    pub language: String,
    pub column: String,
    pub translated: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub per_language: Vec<LanguageProgress>,
    pub translated: usize,
    pub total: usize,
    /// `translated / total` across all languages, not a mean of percentages.
    pub overall: u8,
}

impl ProgressReport {
    pub fn language(&self, language: &str) -> Option<&LanguageProgress> {
        self.per_language.iter().find(|p| p.language == language)
    }
}

/// Rounded percentage; zero when `total` is zero.
pub fn percent(translated: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((translated as f64 / total as f64) * 100.0).round() as u8
}

/// Count, per target language, the engine-written records holding a cell in
/// that language's column and how many of those are translated.
pub fn compute_progress(records: &[Record], target_languages: &[String]) -> ProgressReport {
    let mut per_language: Vec<LanguageProgress> = target_languages
        .iter()
        .map(|lang| LanguageProgress {
            language: lang.clone(),
            column: format_language_code(lang),
            translated: 0,
            total: 0,
            percent: 0,
        })
        .collect();

    for record in records {
        if RecordMeta::read(record).is_none() {
            tracing::debug!(record = %record.id, "record without metadata ignored");
            continue;
        }
        for progress in per_language.iter_mut() {
            if record.cell(&progress.column).is_none() {
                continue;
            }
            progress.total += 1;
            if translated_text(record, &progress.column).is_some() {
                progress.translated += 1;
            }
        }
    }

    let mut translated = 0;
    let mut total = 0;
    for progress in per_language.iter_mut() {
        progress.percent = percent(progress.translated, progress.total);
        translated += progress.translated;
        total += progress.total;
    }
    ProgressReport {
        per_language,
        translated,
        total,
        overall: percent(translated, total),
    }
}
