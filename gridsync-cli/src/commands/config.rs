//! `gridsync config`: grid configurations (API key + view id).

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gridsync_core::{ConfigId, GridConfig};
use gridsync_sync::NewConfig;

use super::{format_time, open_engine, print_json};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Register a grid configuration.
    Add(AddArgs),

    /// List registered configurations.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one configuration.
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Delete a configuration.
    Remove { id: String },

    /// Fetch the view and list its columns.
    Test { id: String },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name; the id is derived from it.
    pub name: String,

    #[arg(long)]
    pub api_key: String,

    #[arg(long)]
    pub view_id: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Register without making it a fallback for projects with no configuration.
    #[arg(long)]
    pub inactive: bool,

    #[arg(long)]
    pub created_by: Option<String>,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Add(args) => add(args),
        ConfigCommand::List { json } => list(json),
        ConfigCommand::Show { id, json } => show(&id, json),
        ConfigCommand::Remove { id } => remove(&id),
        ConfigCommand::Test { id } => test(&id),
    }
}

/// A configuration as printed; the key is always masked.
#[derive(Serialize)]
struct ConfigView {
    id: String,
    name: String,
    view_id: String,
    api_key: String,
    description: Option<String>,
    is_active: bool,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<&GridConfig> for ConfigView {
    fn from(config: &GridConfig) -> Self {
        Self {
            id: config.id.to_string(),
            name: config.name.clone(),
            view_id: config.view_id.clone(),
            api_key: config.masked_key(),
            description: config.description.clone(),
            is_active: config.is_active,
            created_by: config.created_by.clone(),
            created_at: config.created_at.to_rfc3339(),
            updated_at: config.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "view")]
    view: String,
    #[tabled(rename = "api key")]
    api_key: String,
    #[tabled(rename = "active")]
    active: String,
}

fn add(args: AddArgs) -> Result<()> {
    let engine = open_engine()?;
    let config = engine
        .add_config(NewConfig {
            name: args.name.clone(),
            api_key: args.api_key,
            view_id: args.view_id,
            description: args.description,
            is_active: !args.inactive,
            created_by: args.created_by,
        })
        .with_context(|| format!("failed to add configuration '{}'", args.name))?;
    println!("✓ Added configuration '{}' (view {})", config.id, config.view_id);
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let engine = open_engine()?;
    let configs = engine.list_configs().context("failed to list configurations")?;

    if json {
        let views: Vec<ConfigView> = configs.iter().map(ConfigView::from).collect();
        return print_json(&views);
    }
    if configs.is_empty() {
        println!("No grid configurations.");
        println!("Run: gridsync config add <name> --api-key <key> --view-id <view>");
        return Ok(());
    }

    let rows: Vec<ConfigRow> = configs
        .iter()
        .map(|c| ConfigRow {
            id: c.id.to_string(),
            name: c.name.clone(),
            view: c.view_id.clone(),
            api_key: c.masked_key(),
            active: if c.is_active {
                "yes".green().to_string()
            } else {
                "no".dimmed().to_string()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn show(id: &str, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let config = engine
        .get_config(&ConfigId::from(id))
        .with_context(|| format!("configuration '{id}' not found"))?;
    let view = ConfigView::from(&config);
    if json {
        return print_json(&view);
    }

    println!("{} {}", "Configuration".bold(), view.id);
    println!("  name:        {}", view.name);
    println!("  view:        {}", view.view_id);
    println!("  api key:     {}", view.api_key);
    if let Some(description) = &view.description {
        println!("  description: {description}");
    }
    println!("  active:      {}", view.is_active);
    if let Some(created_by) = &view.created_by {
        println!("  created by:  {created_by}");
    }
    println!("  updated:     {}", format_time(Some(config.updated_at)));
    Ok(())
}

fn remove(id: &str) -> Result<()> {
    let engine = open_engine()?;
    engine
        .delete_config(&ConfigId::from(id))
        .with_context(|| format!("failed to remove configuration '{id}'"))?;
    println!("✓ Removed configuration '{id}'");
    Ok(())
}

fn test(id: &str) -> Result<()> {
    let engine = open_engine()?;
    let columns = engine
        .test_connection(&ConfigId::from(id))
        .with_context(|| format!("connection test failed for '{id}'"))?;
    println!("✓ Connected to view ({} columns)", columns.len());
    for column in &columns {
        let kind = column.kind.as_deref().unwrap_or("-");
        match &column.name {
            Some(name) => println!("  {} {} [{kind}]", column.id, name.dimmed()),
            None => println!("  {} [{kind}]", column.id),
        }
    }
    Ok(())
}
