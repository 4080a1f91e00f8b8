//! Refresh command implementation.

use anyhow::{Result, bail};

use super::require_success;
use crate::config::AppContext;
use crate::output;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let state = ctx.app_state()?;
    if ctx.session().refresh_token().is_none() {
        bail!("No active session. Run 'mindrecord login' first.");
    }

    output::progress("Refreshing session...");
    let snapshot = state.refresh().await;
    require_success(&snapshot, "Refresh")?;

    output::success("Session refreshed successfully");
    output::optional_field("User", snapshot.user_id());

    Ok(())
}
