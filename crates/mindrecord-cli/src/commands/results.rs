//! `results` subcommands.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand};

use mindrecord_http::FormBody;

use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct ResultsCommand {
    #[command(subcommand)]
    pub command: ResultsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ResultsSubcommand {
    /// Show a result
    Show {
        /// Result id
        id: String,
    },

    /// Print the processing log of a result
    Log {
        /// Result id
        id: String,
    },

    /// Print the error log of a result
    ErrorLog {
        /// Result id
        id: String,
    },

    /// Submit the outputs of a test run
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Test id
    pub test_id: String,

    /// Input values as key=value
    #[arg(value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Create an anonymous session first if there is none
    #[arg(long)]
    pub anonymous: bool,
}

pub async fn handle(cmd: ResultsCommand, ctx: &AppContext) -> Result<()> {
    match cmd.command {
        ResultsSubcommand::Show { id } => {
            let result = ctx
                .api()?
                .get_result(&id)
                .await
                .with_context(|| format!("Failed to fetch result {}", id))?;
            output::json_pretty(&result)
        }
        ResultsSubcommand::Log { id } => {
            let log = ctx
                .api()?
                .get_result_log(&id)
                .await
                .context("Failed to fetch log")?;
            print!("{}", log);
            Ok(())
        }
        ResultsSubcommand::ErrorLog { id } => {
            let log = ctx
                .api()?
                .get_result_error_log(&id)
                .await
                .context("Failed to fetch error log")?;
            print!("{}", log);
            Ok(())
        }
        ResultsSubcommand::Submit(args) => submit(args, ctx).await,
    }
}

async fn submit(args: SubmitArgs, ctx: &AppContext) -> Result<()> {
    if args.anonymous && !ctx.session().has_session() {
        output::progress("Creating anonymous session...");
        ctx.auth_client()?
            .login_anonymous()
            .await
            .context("Anonymous login failed")?;
    }

    let api = ctx.api()?;
    let test = api
        .get_test(&args.test_id)
        .await
        .with_context(|| format!("Failed to fetch test {}", args.test_id))?;

    let missing: Vec<&str> = test
        .required_inputs()
        .into_iter()
        .filter(|name| !args.fields.iter().any(|(key, _)| key == name))
        .collect();
    if !missing.is_empty() {
        bail!("Missing required inputs: {}", missing.join(", "));
    }

    for (key, _) in &args.fields {
        if !test.inputs.contains_key(key) {
            output::warning(&format!("'{}' is not an input of {}", key, test.id));
        }
    }

    let fields: FormBody = args.fields;
    let receipt = api
        .submit_results(&test.id, fields)
        .await
        .context("Failed to submit results")?;

    output::success("Results submitted");
    output::field("Result", &receipt.results_id);

    Ok(())
}

fn parse_field(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        bail!("empty key in '{}'", s);
    }
    Ok((key.to_string(), value.to_string()))
}
