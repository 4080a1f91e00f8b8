//! Subcommand implementations.

pub mod catalog;
pub mod login;
mod logout;
pub mod open;
mod refresh;
pub mod results;
pub mod verify_email;
pub mod whoami;

use anyhow::{Result, bail};

use mindrecord_core::{AuthSnapshot, AuthStatus};

use crate::cli::Commands;
use crate::config::AppContext;

pub async fn handle(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, ctx).await,
        Commands::Logout => logout::run(ctx).await,
        Commands::Refresh => refresh::run(ctx).await,
        Commands::Whoami(args) => whoami::run(args, ctx).await,
        Commands::Tests(cmd) => catalog::handle(cmd, ctx).await,
        Commands::Results(cmd) => results::handle(cmd, ctx).await,
        Commands::Open(args) => open::run(args, ctx).await,
        Commands::VerifyEmail(args) => verify_email::run(args, ctx).await,
    }
}

/// Turn a settled snapshot back into an error for the exit status.
fn require_success(snapshot: &AuthSnapshot, action: &str) -> Result<()> {
    if snapshot.status == AuthStatus::Error {
        let reason = snapshot.error.as_deref().unwrap_or("unknown error");
        bail!("{} failed: {}", action, reason);
    }
    Ok(())
}
