//! Example: Vote on a proposal and wait for confirmation
//!
//! Usage: `cargo run --example cast_vote -- <proposal-id> <yes|no> [config.toml]`

use anyhow::{bail, Context};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vrdao_client::{ClientConfig, ClientError, GovernanceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vrdao_client=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let proposal_id: u64 = args
        .next()
        .context("missing proposal id")?
        .parse()
        .context("proposal id must be a number")?;
    let support = match args.next().as_deref() {
        Some("yes") => true,
        Some("no") => false,
        _ => bail!("second argument must be `yes` or `no`"),
    };
    let path = args
        .next()
        .unwrap_or_else(|| "vrdao.example.toml".to_string());

    let config = ClientConfig::from_file(&path)
        .with_context(|| format!("loading configuration from {}", path))?;
    let client = GovernanceClient::new(Arc::new(config))?;

    client.connect().await.context("connecting wallet")?;
    println!("Connected as {}", client.session().role);

    println!("Submitting vote on proposal {}...", proposal_id);
    match client.vote(proposal_id, support).await {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                println!("⚠ {}", warning);
            }
            println!("✓ Vote confirmed");
            println!("  - Hash: {}", outcome.tx_hash);
            println!("  - Block: {:?}", outcome.receipt.block_number);
            println!("  - Confirmed at: {}", outcome.confirmed_at);
            if let Some(feed) = outcome.feed {
                println!("  - Open proposals left: {}", feed.proposals.len());
            }
        }
        Err(e @ ClientError::NotMember) => {
            eprintln!("✗ {}", e);
        }
        Err(e) if e.is_user_facing() => {
            eprintln!("✗ Vote failed: {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
