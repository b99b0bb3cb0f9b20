//! `gridsync project create|list|show|delete`

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use gridsync_core::{ConfigId, ContentRef, Project, ProjectId, SyncStatus};
use gridsync_sync::NewProject;

use super::{format_time, open_engine, print_json};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project; pushes its content right away when a configuration resolves.
    Create(CreateArgs),

    /// List projects.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one project with its per-language subprojects.
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Delete a project. Remote records are left untouched.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,

    /// Source language code (e.g. "en").
    #[arg(long)]
    pub source: String,

    /// Target language code; repeatable.
    #[arg(long = "target", value_name = "CODE")]
    pub targets: Vec<String>,

    /// Content to translate as `<type>:<id>` or `<type>:<id>:<field>,<field>`; repeatable.
    #[arg(long = "content", value_name = "REF")]
    pub content: Vec<ContentArg>,

    /// Grid configuration id; the first active one is used when omitted.
    #[arg(long)]
    pub config: Option<String>,
}

/// `<type>:<id>[:<field>,...]` parsed into a [`ContentRef`].
#[derive(Debug, Clone)]
pub struct ContentArg(pub ContentRef);

impl FromStr for ContentArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let content_type = parts.next().filter(|p| !p.is_empty());
        let entry_id = parts.next().filter(|p| !p.is_empty());
        let (Some(content_type), Some(entry_id)) = (content_type, entry_id) else {
            return Err(format!(
                "invalid content reference '{s}'; expected <type>:<id>[:<field>,...]"
            ));
        };
        let mut reference = ContentRef::new(content_type, entry_id);
        if let Some(fields) = parts.next() {
            let fields: Vec<&str> = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            if !fields.is_empty() {
                reference = reference.with_fields(fields);
            }
        }
        Ok(Self(reference))
    }
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "targets")]
    targets: String,
    #[tabled(rename = "items")]
    items: usize,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "progress")]
    progress: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

#[derive(Tabled)]
struct SubprojectRow {
    #[tabled(rename = "language")]
    language: String,
    #[tabled(rename = "records")]
    records: usize,
    #[tabled(rename = "progress")]
    progress: String,
    #[tabled(rename = "updated")]
    updated: String,
}

pub fn run(command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Create(args) => create(args),
        ProjectCommand::List { json } => list(json),
        ProjectCommand::Show { id, json } => show(&id, json),
        ProjectCommand::Delete { id } => delete(&id),
    }
}

fn create(args: CreateArgs) -> Result<()> {
    let engine = open_engine()?;
    let (project, outcome) = engine
        .create_project(NewProject {
            name: args.name.clone(),
            source_language: args.source,
            target_languages: args.targets,
            selected_content: args.content.into_iter().map(|c| c.0).collect(),
            config: args.config.map(ConfigId::from),
        })
        .with_context(|| format!("failed to create project '{}'", args.name))?;

    println!(
        "✓ Created project '{}' ({} → {})",
        project.id,
        project.source_language,
        languages(&project)
    );
    match outcome {
        Some(outcome) => println!(
            "  pushed {} records in {} batches",
            outcome.records_sent, outcome.batches
        ),
        None if project.selected_content.is_empty() => {
            println!("  no content selected; nothing pushed")
        }
        None => println!("  no grid configuration; run `gridsync sync {}` later", project.id),
    }
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let engine = open_engine()?;
    let projects = engine.list_projects().context("failed to list projects")?;
    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects.");
        println!("Run: gridsync project create <name> --source <code> --target <code>");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| ProjectRow {
            id: p.id.to_string(),
            source: p.source_language.clone(),
            targets: languages(p),
            items: p.selected_content.len(),
            status: status_label(p),
            progress: format!("{}%", p.overall_progress),
            last_sync: format_time(p.last_sync),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn show(id: &str, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let project = engine
        .get_project(&ProjectId::from(id))
        .with_context(|| format!("project '{id}' not found"))?;
    if json {
        return print_json(&project);
    }

    println!("{} {} ({})", "Project".bold(), project.id, project.name);
    println!("  source:     {}", project.source_language);
    println!(
        "  config:     {}",
        project
            .config
            .as_ref()
            .map(ConfigId::to_string)
            .unwrap_or_else(|| "first active".to_string())
    );
    println!("  items:      {}", project.selected_content.len());
    println!("  status:     {}", status_label(&project));
    if let Some(error) = &project.sync_error {
        println!("  sync error: {}", error.red());
    }
    println!("  last sync:  {}", format_time(project.last_sync));
    println!(
        "  records:    {} sent / {} total",
        project.records_sent, project.total_records
    );
    println!("  progress:   {}%", project.overall_progress);
    println!(
        "  import:     {} ({} entries)",
        format_time(project.last_import),
        project.entries_imported
    );
    if let Some(error) = &project.import_error {
        println!("  import error: {}", error.red());
    }

    if !project.subprojects.is_empty() {
        let rows: Vec<SubprojectRow> = project
            .subprojects
            .iter()
            .map(|s| SubprojectRow {
                language: s.target_language.clone(),
                records: s.number_of_records,
                progress: format!("{}%", s.progress),
                updated: format_time(s.last_progress_update),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    Ok(())
}

fn delete(id: &str) -> Result<()> {
    let engine = open_engine()?;
    engine
        .delete_project(&ProjectId::from(id))
        .with_context(|| format!("failed to delete project '{id}'"))?;
    println!("✓ Deleted project '{id}'");
    Ok(())
}

fn languages(project: &Project) -> String {
    let targets = project.target_languages();
    if targets.is_empty() {
        "-".to_string()
    } else {
        targets.join(", ")
    }
}

fn status_label(project: &Project) -> String {
    match project.sync_status {
        Some(SyncStatus::Completed) => "synced".green().to_string(),
        Some(SyncStatus::Failed) => "failed".red().to_string(),
        None => "never synced".dimmed().to_string(),
    }
}
