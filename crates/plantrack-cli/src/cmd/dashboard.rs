//! `pt dashboard`: summaries over the signed-in user's tracked projects.


use clap::Args;
use plantrack_core::dashboard::{self, Dashboard, DashboardCache, Distribution, TopStatus};
use plantrack_core::format::format_currency;
use plantrack_core::session::require_user;
use plantrack_core::tracking::Tracker;
use serde::Serialize;
use tracing::debug;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct DashboardArgs {
    /// Rebuild and save the cached summary before reporting.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
struct DashboardOutput {
    project_count: usize,
    total_value: f64,
    total_value_display: String,
    top_status: TopStatus,
    project_distribution: Distribution,
    value_distribution: Distribution,
    from_cache: bool,
}

pub fn run_dashboard(args: &DashboardArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let collections = ctx.collections();
    let user_id = require_user(ctx.session())?;

    let projects = Tracker::new(&store, ctx.session(), collections).tracked_projects()?;

    let cache = if args.refresh {
        let cache = DashboardCache::build(&projects);
        dashboard::save_cache(&store, &collections.dashboard, user_id, &cache)?;
        debug!(user_id = %user_id, projects = projects.len(), "rebuilt dashboard cache");
        Some(cache)
    } else {
        dashboard::load_cache(&store, &collections.dashboard, user_id)?
    };

    let dash = Dashboard::new(&projects, cache.as_ref());
    let total_value = dash.total_value();
    let result = DashboardOutput {
        project_count: projects.len(),
        total_value,
        total_value_display: format_currency(total_value),
        top_status: dash.top_status(),
        project_distribution: dash.project_distribution(),
        value_distribution: dash.value_distribution(),
        from_cache: cache.is_some(),
    };

    render_mode(
        ctx.output,
        &result,
        |r, w| {
            writeln!(w, "projects\t{}", r.project_count)?;
            writeln!(w, "total_value\t{}", r.total_value_display)?;
            writeln!(w, "top_status\t{}\t{}", r.top_status.status, r.top_status.count)?;
            for (label, count) in r.project_distribution.iter() {
                writeln!(w, "status\t{label}\t{count}")?;
            }
            for (label, value) in r.value_distribution.iter() {
                writeln!(w, "category\t{label}\t{}", format_currency(value))?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Dashboard")?;
            pretty_kv(w, "Tracked projects", r.project_count.to_string())?;
            pretty_kv(w, "Total value", &r.total_value_display)?;
            pretty_kv(
                w,
                "Top status",
                format!("{} ({})", r.top_status.status, r.top_status.count),
            )?;
            writeln!(w)?;
            pretty_section(w, "By status")?;
            for (label, count) in r.project_distribution.iter() {
                pretty_kv(w, label, format!("{count}"))?;
            }
            writeln!(w)?;
            pretty_section(w, "Value by category")?;
            for (label, value) in r.value_distribution.iter() {
                pretty_kv(w, label, format_currency(value))?;
            }
            Ok(())
        },
    )
}
