//! `pt project import` and `pt project show`.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Subcommand};
use plantrack_core::CoreError;
use plantrack_core::model::project::Project;
use plantrack_core::store::DocumentStore;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::Context;
use crate::output::{pretty_kv, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(
        about = "Import raw project records",
        after_help = "EXAMPLES:\n    # Import an array of planning records\n    pt project import records.json"
    )]
    Import(ImportArgs),

    #[command(
        about = "Show one project's resolved fields",
        after_help = "EXAMPLES:\n    pt project show 4411\n    pt project show 4411 --json"
    )]
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file holding one record or an array of records.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project id.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ImportOutput {
    imported: Vec<String>,
    /// Positions of records skipped for lacking an id or not being objects.
    skipped: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    id: String,
    category_class: String,
    fields: Vec<Field>,
}

#[derive(Debug, Serialize)]
struct Field {
    label: &'static str,
    value: String,
}

pub fn run_project(args: &ProjectArgs, ctx: &Context) -> anyhow::Result<()> {
    match &args.command {
        ProjectCommand::Import(import) => run_import(import, ctx),
        ProjectCommand::Show(show) => run_show(show, ctx),
    }
}

/// Load a project record by id. The document id stands in for a missing id field.
pub fn load_project(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Project, CoreError> {
    let id = id.trim();
    let doc = store
        .get_document(collection, id)?
        .ok_or_else(|| CoreError::ProjectNotFound(id.to_string()))?;

    let mut record = doc.data;
    record
        .entry("docId")
        .or_insert_with(|| Value::from(doc.id.clone()));
    Ok(Project::from_record(&record))
}

fn records_from(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn run_import(args: &ImportArgs, ctx: &Context) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("parse {} as JSON", args.file.display()))?;

    let store = ctx.open_store()?;
    let collection = &ctx.collections().projects;

    let mut result = ImportOutput {
        imported: Vec::new(),
        skipped: Vec::new(),
    };
    for (idx, record) in records_from(parsed).into_iter().enumerate() {
        let Value::Object(record) = record else {
            warn!(index = idx, "skipping non-object record");
            result.skipped.push(idx);
            continue;
        };
        let project = Project::from_record(&record);
        let Some(id) = project.stored_id() else {
            warn!(index = idx, title = %project.title, "skipping record without an id");
            result.skipped.push(idx);
            continue;
        };
        store.set_document(collection, id, record)?;
        result.imported.push(id.to_string());
    }

    info!(
        imported = result.imported.len(),
        skipped = result.skipped.len(),
        "imported project records"
    );

    render(ctx.output, &result, |r, w| {
        writeln!(w, "imported {} project(s)", r.imported.len())?;
        if !r.skipped.is_empty() {
            let positions: Vec<String> = r.skipped.iter().map(ToString::to_string).collect();
            writeln!(w, "skipped records at {}", positions.join(", "))?;
        }
        Ok(())
    })
}

fn run_show(args: &ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let project = load_project(&store, &ctx.collections().projects, &args.id)?;

    let result = ShowOutput {
        id: project.key.to_string(),
        category_class: project.category_class.to_string(),
        fields: project
            .display_fields()
            .into_iter()
            .map(|(label, value)| Field { label, value })
            .collect(),
    };

    render_mode(
        ctx.output,
        &result,
        |r, w| {
            for f in &r.fields {
                writeln!(w, "{}\t{}", f.label, f.value)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Project {}", r.id))?;
            for f in &r.fields {
                pretty_kv(w, f.label, &f.value)?;
            }
            pretty_kv(w, "Class", &r.category_class)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantrack_core::store::MemoryStore;
    use serde_json::{Map, json};

    fn record(value: &Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn single_object_and_array_both_import() {
        assert_eq!(records_from(json!({"id": 1})).len(), 1);
        assert_eq!(records_from(json!([{"id": 1}, {"id": 2}])).len(), 2);
    }

    #[test]
    fn load_project_falls_back_to_document_id() {
        let store = MemoryStore::new();
        store
            .set_document("projects", "4411", record(&json!({"planning_title": "Bypass"})))
            .expect("seed");

        let project = load_project(&store, "projects", " 4411 ").expect("load");
        assert_eq!(project.stored_id(), Some("4411"));
        assert_eq!(project.title, "Bypass");
    }

    #[test]
    fn missing_project_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_project(&store, "projects", "nope"),
            Err(CoreError::ProjectNotFound(_))
        ));
    }
}
