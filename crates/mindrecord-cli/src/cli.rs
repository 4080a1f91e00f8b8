//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{catalog, login, open, results, verify_email, whoami};

/// Command-line client for the mindrecord test platform.
#[derive(Parser, Debug)]
#[command(name = "mindrecord")]
#[command(author, version = env!("MINDRECORD_VERSION"), about, long_about = None)]
pub struct Cli {
    /// API base URL
    #[arg(long, env = "MINDRECORD_API", global = true)]
    pub api: Option<String>,

    /// Session store file [default: <data dir>/mindrecord/session.json]
    #[arg(long, env = "MINDRECORD_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Interface language; remembered for later runs
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in, anonymously unless an email is given
    Login(login::LoginArgs),

    /// Forget the stored session
    Logout,

    /// Replace the stored tokens using the refresh token
    Refresh,

    /// Show the current user
    Whoami(whoami::WhoamiArgs),

    /// Browse tests
    Tests(catalog::TestsCommand),

    /// Inspect and submit results
    Results(results::ResultsCommand),

    /// Resolve a client route and run the navigation guard
    Open(open::OpenArgs),

    /// Confirm an email address
    VerifyEmail(verify_email::VerifyEmailArgs),
}
