//! Whoami command implementation.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Also ask the server who it thinks we are
    #[arg(long)]
    pub remote: bool,
}

pub async fn run(args: WhoamiArgs, ctx: &AppContext) -> Result<()> {
    let state = ctx.app_state()?;
    let snapshot = state.snapshot();

    if !snapshot.is_authorized {
        bail!("No active session. Run 'mindrecord login' first.");
    }

    output::optional_field("User", snapshot.user_id());
    output::optional_field("Role", snapshot.user_role());
    if snapshot.is_admin() {
        output::field("Admin", "yes");
    }

    if let Some(user) = snapshot.user.as_ref()
        && let Some(exp) = user.expires_at()
    {
        let mut expires = exp.to_rfc3339();
        if user.is_expired_at(Utc::now()) {
            expires = format!("{} {}", expires, "(expired)".red());
        }
        output::field("Expires", &expires);
    }

    output::field("Language", ctx.lang());
    output::field("API", ctx.api_url().as_str());
    output::field("Store", &ctx.store_path().display().to_string());

    if args.remote {
        let info = ctx
            .api()?
            .current_user_info()
            .await
            .context("Failed to fetch user from server")?;
        println!();
        output::optional_field("Server user", info.id.as_deref());
        output::field("Server role", &info.role);
    }

    Ok(())
}
