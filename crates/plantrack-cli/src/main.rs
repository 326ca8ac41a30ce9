#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use plantrack_core::config;
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pt: track infrastructure projects, notes and dashboards",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (skips env and config resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Projects",
        about = "Import or inspect project records"
    )]
    Project(cmd::project::ProjectArgs),

    #[command(
        next_help_heading = "Tracking",
        about = "Track a project",
        after_help = "EXAMPLES:\n    pt --user alice track 4411"
    )]
    Track(cmd::track::TrackArgs),

    #[command(
        next_help_heading = "Tracking",
        about = "Stop tracking a project",
        long_about = "Stop tracking a project. Untracking something that is not tracked succeeds with no change.",
        after_help = "EXAMPLES:\n    pt --user alice untrack 4411"
    )]
    Untrack(cmd::track::TrackArgs),

    #[command(next_help_heading = "Tracking", about = "List tracked projects")]
    Tracked,

    #[command(next_help_heading = "Notes", about = "Add, edit or delete notes")]
    Note(cmd::note::NoteArgs),

    #[command(next_help_heading = "Notes", about = "List notes on a project")]
    Notes(cmd::note::NotesArgs),

    #[command(
        next_help_heading = "Reporting",
        about = "Summarize tracked projects",
        after_help = "EXAMPLES:\n    pt dashboard\n\n    # Rebuild the cached summary\n    pt dashboard --refresh --json"
    )]
    Dashboard(cmd::dashboard::DashboardArgs),

    #[command(next_help_heading = "Account", about = "View or edit your profile")]
    Profile(cmd::profile::ProfileArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PLANTRACK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pt=debug,plantrack=debug,info"
        } else {
            "pt=info,plantrack=info,warn"
        })
    });

    let format = env::var("PLANTRACK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn dispatch(cli: &Cli, ctx: &cmd::Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Project(args) => cmd::project::run_project(args, ctx),
        Commands::Track(args) => cmd::track::run_track(args, ctx),
        Commands::Untrack(args) => cmd::track::run_untrack(args, ctx),
        Commands::Tracked => cmd::track::run_tracked(ctx),
        Commands::Note(args) => cmd::note::run_note(args, ctx),
        Commands::Notes(args) => cmd::note::run_notes(args, ctx),
        Commands::Dashboard(args) => cmd::dashboard::run_dashboard(args, ctx),
        Commands::Profile(args) => cmd::profile::run_profile(args, ctx),
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let root = env::current_dir()?;
    let config = config::resolve_config(&root, cli.json)?;
    let output = OutputMode::from_resolved(&config.resolved_output);
    let session = identity::resolve_session(cli.user.as_deref(), &config.user);

    let ctx = cmd::Context {
        root,
        config,
        output,
        session,
    };
    dispatch(cli, &ctx)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            // Config may be what failed, so only the flag decides the error format here.
            let mode = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };
            if render_error(mode, &CliError::from_anyhow(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["pt", "tracked", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Tracked));
    }

    #[test]
    fn user_flag_is_global() {
        let cli = Cli::parse_from(["pt", "track", "4411", "--user", "alice"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(cli.command, Commands::Track(_)));
    }

    #[test]
    fn note_subcommands_parse() {
        let cli = Cli::parse_from(["pt", "note", "add", "4411", "Site visit"]);
        assert!(matches!(cli.command, Commands::Note(_)));
        let cli = Cli::parse_from(["pt", "note", "rm", "abc"]);
        assert!(matches!(cli.command, Commands::Note(_)));
    }

    #[test]
    fn dashboard_refresh_flag() {
        let cli = Cli::parse_from(["pt", "dashboard", "--refresh"]);
        assert!(matches!(
            cli.command,
            Commands::Dashboard(cmd::dashboard::DashboardArgs { refresh: true })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["pt", "project", "import", "records.json"],
            vec!["pt", "project", "show", "1"],
            vec!["pt", "track", "1"],
            vec!["pt", "untrack", "1"],
            vec!["pt", "tracked"],
            vec!["pt", "note", "add", "1", "text"],
            vec!["pt", "note", "edit", "n", "text"],
            vec!["pt", "note", "rm", "n"],
            vec!["pt", "notes", "1"],
            vec!["pt", "dashboard"],
            vec!["pt", "profile", "show"],
            vec!["pt", "profile", "set", "--name", "A", "--create"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }
}
