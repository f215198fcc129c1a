//! Example: Connect a wallet and list the open proposals
//!
//! Usage: `cargo run --example list_proposals -- [config.toml]`

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vrdao_client::{ClientConfig, GovernanceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vrdao_client=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vrdao.example.toml".to_string());
    let config = ClientConfig::from_file(&path)
        .with_context(|| format!("loading configuration from {}", path))?;

    println!("=== Vegan Rob's DAO ===\n");
    println!("Chain: {} ({})", config.chain.chain_name, config.chain.chain_id);
    println!("RPC URL: {}\n", config.rpc_url);

    let client = GovernanceClient::new(Arc::new(config))?;

    if !client.health_check().await? {
        anyhow::bail!("node does not serve the configured chain");
    }
    println!("✓ Node reachable\n");

    let account = client.connect().await.context("connecting wallet")?;
    let header = client.header_view();
    println!(
        "✓ Connected {} ({})\n",
        header.account_label.unwrap_or_default(),
        header.role_label
    );
    tracing::debug!("Full account: {:?}", account);

    let page = client.vote_page().await;
    println!("{}", page.heading);
    if page.rows.is_empty() {
        println!("  (no open proposals)");
    }
    for row in &page.rows {
        println!("  Election {}: {} [{}]", row.number, row.name, row.image_url);
    }

    client.disconnect().await;
    Ok(())
}
