use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use walletlogin::Config;
use walletlogin::cli::{Cli, Command, run_doctor_command, run_inspect_command, run_sign_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Inspect { url } => run_inspect_command(&url),
        Command::Doctor { strict } => run_doctor_command(cli.config.as_deref(), strict).await,
        Command::Sign { url, no_open } => {
            let config = Config::from_env_with_toml(cli.config.as_deref())
                .context("failed to load configuration")?;
            run_sign_command(&config, &url, no_open).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("walletlogin=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
