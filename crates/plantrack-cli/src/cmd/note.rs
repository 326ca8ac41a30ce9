//! `pt note` and `pt notes`: per-project notes for the signed-in user.


use clap::{Args, Subcommand};
use plantrack_core::format::format_date;
use plantrack_core::model::Note;
use plantrack_core::notes::{NoteService, NotesPanel};
use serde::Serialize;

use super::Context;
use super::project::load_project;
use crate::output::{pretty_rule, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct NoteArgs {
    #[command(subcommand)]
    pub command: NoteCommand,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    #[command(
        about = "Add a note to a project",
        after_help = "EXAMPLES:\n    pt note add 4411 \"Called the council planning office\""
    )]
    Add(NoteAddArgs),

    #[command(about = "Replace a note's text")]
    Edit(NoteEditArgs),

    #[command(about = "Delete a note")]
    Rm(NoteRmArgs),
}

#[derive(Args, Debug)]
pub struct NoteAddArgs {
    /// Project id.
    pub project: String,
    /// Note text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct NoteEditArgs {
    pub note_id: String,
    /// Replacement text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct NoteRmArgs {
    pub note_id: String,
}

#[derive(Args, Debug)]
pub struct NotesArgs {
    /// Project id.
    pub project: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    note_id: String,
    deleted: bool,
}

fn note_date(note: &Note) -> String {
    format_date(
        note.updated_at
            .as_deref()
            .or(note.created_at.as_deref())
            .unwrap_or_default(),
    )
}

pub fn run_note(args: &NoteArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let max_chars = ctx.config.project.notes.max_chars;
    let service = NoteService::new(&store, ctx.session(), &ctx.collections().notes, max_chars);

    match &args.command {
        NoteCommand::Add(add) => {
            let project = load_project(&store, &ctx.collections().projects, &add.project)?;
            let note = service.add_note_for(&project, &add.text)?;
            render(ctx.output, &note, |n, w| writeln!(w, "✓ note {} added", n.id))
        }
        NoteCommand::Edit(edit) => {
            let note = service.update_note(&edit.note_id, &edit.text)?;
            render(ctx.output, &note, |n, w| writeln!(w, "✓ note {} updated", n.id))
        }
        NoteCommand::Rm(rm) => {
            let result = DeleteOutput {
                note_id: rm.note_id.clone(),
                deleted: service.delete_note(&rm.note_id)?,
            };
            render(ctx.output, &result, |r, w| {
                if r.deleted {
                    writeln!(w, "✓ note {} deleted", r.note_id)
                } else {
                    writeln!(w, "note {} not found", r.note_id)
                }
            })
        }
    }
}

pub fn run_notes(args: &NotesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let max_chars = ctx.config.project.notes.max_chars;
    let service = NoteService::new(&store, ctx.session(), &ctx.collections().notes, max_chars);

    let mut panel = NotesPanel::new(args.project.trim(), max_chars);
    panel.refresh(&service)?;
    let notes = panel.notes();

    render_mode(
        ctx.output,
        &notes,
        |notes, w| {
            for n in *notes {
                writeln!(w, "{}\t{}\t{}", n.id, note_date(n), n.text)?;
            }
            Ok(())
        },
        |notes, w| {
            pretty_section(w, &format!("Notes on {} ({})", panel.project_id(), notes.len()))?;
            for n in *notes {
                writeln!(w, "[{}] {}", note_date(n), n.id)?;
                writeln!(w, "{}", n.text)?;
                pretty_rule(w)?;
            }
            Ok(())
        },
    )
}
