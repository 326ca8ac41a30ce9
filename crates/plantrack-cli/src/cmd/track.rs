//! `pt track`, `pt untrack` and `pt tracked`.


use clap::Args;
use plantrack_core::format::format_currency;
use plantrack_core::tracking::{Tracker, UntrackOutcome};
use serde::Serialize;

use super::Context;
use super::project::load_project;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Project id.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct TrackOutput {
    project_id: String,
    title: String,
    /// `false` when the project was already tracked.
    newly_tracked: bool,
}

#[derive(Debug, Serialize)]
struct UntrackOutput {
    project_id: String,
    removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TrackedRow {
    id: String,
    title: String,
    status: String,
    category: String,
    value: f64,
    value_display: String,
}

pub fn run_track(args: &TrackArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let project = load_project(&store, &ctx.collections().projects, &args.id)?;
    let tracker = Tracker::new(&store, ctx.session(), ctx.collections());
    let newly_tracked = tracker.track(&project)?;

    let result = TrackOutput {
        project_id: project.key.to_string(),
        title: project.title,
        newly_tracked,
    };
    render(ctx.output, &result, |r, w| {
        if r.newly_tracked {
            writeln!(w, "✓ tracking {} ({})", r.project_id, r.title)
        } else {
            writeln!(w, "already tracking {} ({})", r.project_id, r.title)
        }
    })
}

pub fn run_untrack(args: &TrackArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let tracker = Tracker::new(&store, ctx.session(), ctx.collections());

    let result = match tracker.untrack(&args.id)? {
        UntrackOutcome::Removed {
            strategy,
            documents,
        } => UntrackOutput {
            project_id: args.id.trim().to_string(),
            removed: true,
            strategy: Some(strategy),
            documents,
        },
        UntrackOutcome::NotFound => UntrackOutput {
            project_id: args.id.trim().to_string(),
            removed: false,
            strategy: None,
            documents: None,
        },
    };

    render(ctx.output, &result, |r, w| {
        if r.removed {
            writeln!(w, "✓ untracked {}", r.project_id)
        } else {
            writeln!(w, "{} was not tracked", r.project_id)
        }
    })
}

pub fn run_tracked(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let tracker = Tracker::new(&store, ctx.session(), ctx.collections());

    let rows: Vec<TrackedRow> = tracker
        .tracked_projects()?
        .into_iter()
        .map(|p| TrackedRow {
            id: p.key.to_string(),
            value_display: format_currency(p.value),
            value: p.value,
            title: p.title,
            status: p.status,
            category: p.category,
        })
        .collect();

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    r.id, r.title, r.status, r.category, r.value_display
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Tracked projects ({})", rows.len()))?;
            for r in rows {
                pretty_kv(w, &r.id, &r.title)?;
                pretty_kv(w, "  status", &r.status)?;
                pretty_kv(w, "  category", &r.category)?;
                pretty_kv(w, "  value", &r.value_display)?;
            }
            if !rows.is_empty() {
                pretty_rule(w)?;
            }
            Ok(())
        },
    )
}
