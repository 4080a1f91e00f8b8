//! `tests` subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct TestsCommand {
    #[command(subcommand)]
    pub command: TestsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TestsSubcommand {
    /// List published tests
    List(ListArgs),

    /// Show one test
    Show {
        /// Test id
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the full test descriptions as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle(cmd: TestsCommand, ctx: &AppContext) -> Result<()> {
    let api = ctx.api()?;

    match cmd.command {
        TestsSubcommand::List(args) => {
            let tests = api.list_tests().await.context("Failed to list tests")?;
            if args.json {
                return output::json_pretty(&tests);
            }
            for test in &tests {
                println!("{}\t{}", test.id, test.name);
            }
            Ok(())
        }
        TestsSubcommand::Show { id } => {
            let test = api
                .get_test(&id)
                .await
                .with_context(|| format!("Failed to fetch test {}", id))?;
            output::json_pretty(&test)
        }
    }
}
