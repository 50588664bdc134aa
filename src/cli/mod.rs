//! Command-line interface.

pub mod doctor;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::handshake::{ChallengeContext, HandshakeState, LoginHandshake};
use crate::navigator::{BrowserNavigator, Navigator, StdoutNavigator};

pub use self::doctor::run_doctor_command;

#[derive(Parser, Debug)]
#[command(name = "walletlogin", version, about = "Sign in to an OIDC provider with your crypto wallet")]
pub struct Cli {
    /// Path to a TOML config file (default: ~/.walletlogin/config.toml).
    #[arg(long, global = true, env = "WALLETLOGIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the login handshake for a login page URL.
    Sign {
        /// Login page URL carrying the `nonce` challenge.
        url: String,

        /// Print the authorization URL instead of opening the browser.
        #[arg(long)]
        no_open: bool,
    },

    /// Show the challenge carried by a login page URL.
    Inspect {
        url: String,
    },

    /// Check configuration and wallet bridge reachability.
    Doctor {
        /// Exit with an error if any check fails.
        #[arg(long)]
        strict: bool,
    },
}

/// Run the full handshake: detect, trigger, navigate.
pub async fn run_sign_command(config: &Config, url: &str, no_open: bool) -> anyhow::Result<()> {
    let base = Url::parse(url)
        .map_err(|e| anyhow::anyhow!("login URL must be absolute ({e}): {url}"))?;
    let navigator: Arc<dyn Navigator> = if no_open || !config.handshake.open_browser {
        Arc::new(StdoutNavigator::new(base))
    } else {
        Arc::new(BrowserNavigator::new(base))
    };

    let handshake = LoginHandshake::new(
        url,
        config.wallet.gateway(),
        navigator,
        config.handshake.options(),
    );

    if let Some(context) = handshake.context() {
        println!("{}", context.chain_description(None));
        let subject = context.subject_description();
        if !subject.is_empty() {
            println!("{subject}");
        }
    }

    let state = handshake.detect().await;
    if let HandshakeState::Failed(_) = state {
        print_failure(&handshake);
        anyhow::bail!("login cannot start: {state}");
    }

    println!("Approve the account request and sign the message in your wallet...");
    match handshake.trigger().await {
        Ok(target) => {
            tracing::debug!(target = %target, "handshake complete");
            Ok(())
        }
        Err(err) => {
            print_failure(&handshake);
            Err(err.into())
        }
    }
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    #[serde(flatten)]
    context: &'a ChallengeContext,
    chain_description: String,
    subject_description: String,
}

/// Print the parsed challenge as JSON.
pub fn run_inspect_command(url: &str) -> anyhow::Result<()> {
    let context = ChallengeContext::parse(url)?;
    let output = InspectOutput {
        context: &context,
        chain_description: context.chain_description(None),
        subject_description: context.subject_description(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_failure(handshake: &LoginHandshake) {
    if let Some(payload) = handshake.failure_payload() {
        eprintln!("{}", payload.code.guidance());
        tracing::debug!(status = %payload.to_status_line(), "handshake failure");
    }
}
