//! Email verification command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct VerifyEmailArgs {
    /// Token from the verification link
    pub token: String,
}

pub async fn run(args: VerifyEmailArgs, ctx: &AppContext) -> Result<()> {
    let response = ctx
        .api()?
        .verify_email(&args.token)
        .await
        .context("Email verification failed")?;

    output::success(&response.message);
    Ok(())
}
