//! `pt profile show` and `pt profile set`.


use clap::{Args, Subcommand};
use plantrack_core::CoreError;
use plantrack_core::profile::{ProfileClient, UserProfile};

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    #[command(about = "Show the signed-in user's profile")]
    Show,

    #[command(
        about = "Update profile fields",
        after_help = "EXAMPLES:\n    PLANTRACK_TOKEN=... pt profile set --name \"Alice Byrne\" --email alice@example.com\n\n    # First-time setup\n    pt profile set --name \"Alice Byrne\" --create"
    )]
    Set(ProfileSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct ProfileSetArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub organisation: Option<String>,
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// Create the profile (POST) instead of updating it (PUT).
    #[arg(long)]
    pub create: bool,
}

impl ProfileSetArgs {
    /// Overlay the given flags onto `profile`.
    fn apply(&self, profile: &mut UserProfile) {
        let fields = [
            (&self.name, &mut profile.display_name),
            (&self.email, &mut profile.email),
            (&self.organisation, &mut profile.organisation),
            (&self.role, &mut profile.role),
            (&self.phone, &mut profile.phone),
        ];
        for (flag, slot) in fields {
            if let Some(value) = flag {
                *slot = Some(value.trim().to_string());
            }
        }
    }
}

pub fn run_profile(args: &ProfileArgs, ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.session().ok_or(CoreError::NotSignedIn)?;
    let client = ProfileClient::new(&ctx.config.project.api, session);

    let profile = match &args.command {
        ProfileCommand::Show => client.get_profile()?,
        ProfileCommand::Set(set) if set.create => {
            let mut profile = UserProfile::default();
            set.apply(&mut profile);
            client.create_profile(&profile)?
        }
        ProfileCommand::Set(set) => {
            let mut profile = client.get_profile()?;
            set.apply(&mut profile);
            client.update_profile(&profile)?
        }
    };

    render_mode(
        ctx.output,
        &profile,
        |p, w| {
            for (key, value) in rows(p) {
                writeln!(w, "{key}\t{value}")?;
            }
            Ok(())
        },
        |p, w| {
            pretty_section(w, &format!("Profile for {}", session.user_id))?;
            for (key, value) in rows(p) {
                pretty_kv(w, key, value)?;
            }
            Ok(())
        },
    )
}

fn rows(profile: &UserProfile) -> Vec<(&'static str, &str)> {
    [
        ("Name", &profile.display_name),
        ("Email", &profile.email),
        ("Organisation", &profile.organisation),
        ("Role", &profile.role),
        ("Phone", &profile.phone),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    .collect()
}
