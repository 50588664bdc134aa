//! `walletlogin doctor` - active health diagnostics.
//!
//! Validates configuration and probes the wallet bridge so problems show up
//! before a user is sent to the login page.

use std::path::Path;

use crate::config::Config;
use crate::wallet::{Eip1193RpcGateway, WalletGateway};

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(config_path: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    println!("walletlogin doctor");
    println!("==================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let config = Config::from_env_with_toml(config_path);
    check(
        "Configuration",
        match &config {
            Ok(c) => CheckResult::Pass(format!(
                "authorize path '{}', message format '{}'",
                c.handshake.authorize_path,
                c.handshake.message_format.as_str()
            )),
            Err(e) => CheckResult::Fail(e.to_string()),
        },
        &mut passed,
        &mut failed,
    );

    match config {
        Ok(config) => {
            check(
                "Wallet bridge",
                check_wallet_bridge(&config).await,
                &mut passed,
                &mut failed,
            );
            check(
                "Wallet chain id",
                check_wallet_chain(&config).await,
                &mut passed,
                &mut failed,
            );
        }
        Err(_) => {
            check(
                "Wallet bridge",
                CheckResult::Skip("configuration did not load".to_string()),
                &mut passed,
                &mut failed,
            );
        }
    }

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Sign-in will be disabled until they pass.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

#[derive(Debug)]
enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

async fn check_wallet_bridge(config: &Config) -> CheckResult {
    let Some(url) = config.wallet.rpc_url.as_deref() else {
        return CheckResult::Fail(
            "WALLETLOGIN_WALLET_RPC_URL is not set; no wallet provider available".to_string(),
        );
    };
    let gateway = Eip1193RpcGateway::new(url, config.wallet.probe_timeout);
    if gateway.is_available().await {
        CheckResult::Pass(format!("reachable at {url}"))
    } else {
        CheckResult::Fail(format!(
            "no response from {url} within {}ms",
            config.wallet.probe_timeout.as_millis()
        ))
    }
}

async fn check_wallet_chain(config: &Config) -> CheckResult {
    if config.wallet.rpc_url.is_none() {
        return CheckResult::Skip("no wallet bridge configured".to_string());
    }
    if !config.handshake.include_chain_id {
        return CheckResult::Skip("chain id is not sent to the authorization endpoint".to_string());
    }
    match config.wallet.gateway().current_chain_id().await {
        Ok(id) => CheckResult::Pass(format!("wallet connected to chain {id}")),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}
