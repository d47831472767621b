//! # kcp
//!
//! Applies a manifest of Keycloak resources, keeps what was created in a
//! state file and can refresh, import or destroy those resources later.
//!

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{Opts, SubCommand};
mod commands;
mod manifest;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts: Opts = Opts::parse();
    let filter = if opts.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    match opts.subcmd {
        SubCommand::Schema(ref cmd) => cmd.run()?,
        SubCommand::Apply(ref cmd) => cmd.run(&opts).await?,
        SubCommand::Refresh(ref cmd) => cmd.run(&opts).await?,
        SubCommand::Import(ref cmd) => cmd.run(&opts).await?,
        SubCommand::Destroy(ref cmd) => cmd.run(&opts).await?,
    }
    Ok(())
}
