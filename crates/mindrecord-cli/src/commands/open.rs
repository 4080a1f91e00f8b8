//! Open command: resolve a client route through the navigation guard.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use mindrecord_core::{Navigation, RouteGuard, RouteTable};

use crate::config::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Client path, e.g. /profile/u1
    pub path: String,
}

pub async fn run(args: OpenArgs, ctx: &AppContext) -> Result<()> {
    let state = ctx.app_state()?;
    let guard = RouteGuard::new(RouteTable::application(), state.subscribe());

    match guard.before_each(&args.path) {
        Navigation::Proceed(Some(route)) => {
            let names: Vec<&str> = route.matched.iter().map(|r| r.name.as_str()).collect();
            output::field("Route", &names.join(" > "));
            output::field("Path", &route.path);
            for (name, value) in &route.params {
                output::field(name, value);
            }
            if route.requires_auth() {
                output::field("Protected", "yes");
            }
        }
        Navigation::Proceed(None) => {
            output::warning(&format!("No route matches {}", args.path));
        }
        Navigation::Redirect { to } => {
            println!("{} {}", "Redirected to".yellow(), to);
        }
    }

    Ok(())
}
