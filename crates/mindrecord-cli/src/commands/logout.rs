//! Logout command implementation.

use anyhow::Result;

use crate::config::AppContext;
use crate::output;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let state = ctx.app_state()?;
    let was_authorized = state.is_authorized();

    state.logout().await;

    if was_authorized {
        output::success("Logged out");
    } else {
        output::success("No active session");
    }
    Ok(())
}
