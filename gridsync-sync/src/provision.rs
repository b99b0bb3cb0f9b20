//! Lazy, idempotent provisioning of grid columns and dependency edges.
//!
//! Existing columns and edges are detected by membership in the remote
//! listing before anything is created, so repeated calls are no-ops. Any
//! creation failure aborts the call with the remote error.

use serde::Serialize;

use gridsync_core::Locale;
use gridsync_fields::format_language_code;
use gridsync_grid::{Column, Dependency, GridApi, GridError, LanguageColumn, MetadataColumn, NewColumn};

use crate::codec::METADATA_COLUMNS;

/// What a provisioning call created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
    pub created_columns: Vec<Column>,
    pub created_dependencies: Vec<Dependency>,
}

impl SchemaReport {
    pub fn is_empty(&self) -> bool {
        self.created_columns.is_empty() && self.created_dependencies.is_empty()
    }
}

/// Formatted target column ids: deduplicated, source excluded.
pub fn target_columns(source_language: &str, target_languages: &[String]) -> Vec<String> {
    let source = format_language_code(source_language);
    let mut out: Vec<String> = Vec::new();
    for lang in target_languages {
        let id = format_language_code(lang);
        if id != source && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Create the metadata columns and the source/target language columns the
/// view lacks.
pub fn ensure_columns(
    api: &dyn GridApi,
    locales: &[Locale],
    source_language: &str,
    target_languages: &[String],
) -> Result<Vec<Column>, GridError> {
    let view = api.get_view()?;
    let existing: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();

    let mut wanted: Vec<NewColumn> = METADATA_COLUMNS
        .iter()
        .filter(|(id, _, _)| !existing.contains(id))
        .map(|(id, name, description)| {
            NewColumn::Metadata(MetadataColumn {
                id: (*id).to_string(),
                editable: true,
                name: (*name).to_string(),
                kind: "singleLine".to_string(),
                description: (*description).to_string(),
            })
        })
        .collect();

    let mut languages = vec![source_language.to_string()];
    for lang in target_languages {
        if !languages.contains(lang) {
            languages.push(lang.clone());
        }
    }
    for lang in &languages {
        let id = format_language_code(lang);
        if existing.contains(&id.as_str()) || wanted.iter().any(|c| c.id() == id) {
            continue;
        }
        let name = locales
            .iter()
            .find(|l| &l.code == lang)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| lang.clone());
        wanted.push(NewColumn::Language(LanguageColumn::new(
            id,
            name,
            lang == source_language,
        )));
    }

    let mut created = Vec::with_capacity(wanted.len());
    for column in &wanted {
        tracing::info!(column = column.id(), "creating grid column");
        created.push(api.create_column(column)?);
    }
    Ok(created)
}

/// Create the missing `source → target` dependency edges.
pub fn ensure_dependencies(
    api: &dyn GridApi,
    source_language: &str,
    target_languages: &[String],
) -> Result<Vec<Dependency>, GridError> {
    let source = format_language_code(source_language);
    let existing: Vec<String> = api
        .list_dependencies()?
        .into_iter()
        .filter(|d| d.source_column_id == source)
        .map(|d| d.target_column_id)
        .collect();

    let mut created = Vec::new();
    for target in target_columns(source_language, target_languages) {
        if existing.contains(&target) {
            continue;
        }
        tracing::info!(source = %source, target = %target, "creating dependency");
        created.push(api.create_dependency(&Dependency::new(source.clone(), target))?);
    }
    Ok(created)
}

/// Columns first, then (optionally) dependencies.
pub fn ensure_schema(
    api: &dyn GridApi,
    locales: &[Locale],
    source_language: &str,
    target_languages: &[String],
    include_dependencies: bool,
) -> Result<SchemaReport, GridError> {
    let created_columns = ensure_columns(api, locales, source_language, target_languages)?;
    let created_dependencies = if include_dependencies {
        ensure_dependencies(api, source_language, target_languages)?
    } else {
        Vec::new()
    };
    Ok(SchemaReport {
        created_columns,
        created_dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_grid::{Call, FakeGrid, Op};
    use serde_json::json;

    fn locales() -> Vec<Locale> {
        vec![
            Locale {
                code: "en".into(),
                name: "English (en)".into(),
                is_default: true,
            },
            Locale {
                code: "fr-FR".into(),
                name: "French (France) (fr-FR)".into(),
                is_default: false,
            },
        ]
    }

    fn langs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn second_call_creates_nothing() {
        let grid = FakeGrid::new();
        let first = ensure_schema(&grid, &locales(), "en", &langs(&["fr-FR", "de"]), true)
            .expect("first");
        assert_eq!(first.created_columns.len(), 7 + 3);
        assert_eq!(first.created_dependencies.len(), 2);

        let second = ensure_schema(&grid, &locales(), "en", &langs(&["fr-FR", "de"]), true)
            .expect("second");
        assert!(second.is_empty());
        assert_eq!(grid.columns().len(), 10);
        assert_eq!(grid.dependencies().len(), 2);
    }

    #[test]
    fn language_columns_use_locale_names_and_formatted_ids() {
        let grid = FakeGrid::new();
        ensure_columns(&grid, &locales(), "en", &langs(&["fr-FR", "ja"])).expect("columns");
        let columns = grid.columns();
        let fr = columns.iter().find(|c| c.id == "frFR").expect("fr");
        assert_eq!(fr.name.as_deref(), Some("French (France) (fr-FR)"));
        assert_eq!(fr.is_target, Some(true));
        let ja = columns.iter().find(|c| c.id == "ja").expect("ja");
        assert_eq!(ja.name.as_deref(), Some("ja"));
        let en = columns.iter().find(|c| c.id == "en").expect("en");
        assert_eq!(en.is_source, Some(true));
    }

    #[test]
    fn source_listed_as_target_gets_no_self_edge() {
        let grid = FakeGrid::new();
        let deps = ensure_dependencies(&grid, "en", &langs(&["en", "fr-FR", "fr-FR"])).expect("deps");
        assert_eq!(deps, vec![Dependency::new("en", "frFR")]);
    }

    #[test]
    fn existing_edges_from_other_sources_do_not_count() {
        let grid = FakeGrid::new();
        grid.insert_dependency(Dependency::new("de", "frFR"));
        let deps = ensure_dependencies(&grid, "en", &langs(&["fr-FR"])).expect("deps");
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn creation_failure_aborts_with_remote_message() {
        let grid = FakeGrid::new();
        grid.fail_after(Op::CreateColumn, 2, 400, json!({"message": "Column limit reached"}));
        let err = ensure_columns(&grid, &locales(), "en", &langs(&["fr-FR"])).unwrap_err();
        assert_eq!(err.to_string(), "Column limit reached");
        assert_eq!(grid.columns().len(), 2);
        let attempts = grid
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreateColumn { .. }))
            .count();
        assert_eq!(attempts, 3);
    }
}
