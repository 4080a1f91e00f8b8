//! Login command implementation.

use anyhow::Result;
use clap::Args;

use mindrecord_core::Credentials;

use super::require_success;
use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email; without it an anonymous session is created
    #[arg(long, requires = "password")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, requires = "email")]
    pub password: Option<String>,
}

pub async fn run(args: LoginArgs, ctx: &AppContext) -> Result<()> {
    let state = ctx.app_state()?;

    let snapshot = match (args.email, args.password) {
        (Some(email), Some(password)) => {
            output::progress("Logging in...");
            state
                .login_with_credentials(&Credentials::new(email, password))
                .await
        }
        _ => {
            output::progress("Creating anonymous session...");
            state.login_anonymous().await
        }
    };
    require_success(&snapshot, "Login")?;

    output::success("Logged in successfully");
    println!();
    output::optional_field("User", snapshot.user_id());
    output::optional_field("Role", snapshot.user_role());
    output::field("API", ctx.api_url().as_str());

    Ok(())
}
