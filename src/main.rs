//! candymint CLI entry point.
//!
//! Subcommands cover the candy machine lifecycle: `init` the machine,
//! `upload` metadata config lines, `scrape` a mint site for its config
//! address, and `mint` (the one-click loop: discover if needed, then mint).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, signer::Signer};
use tracing::{error, info, Level};

use candymint::candy::resolver::{probe_candidate, resolve_candidates, ResolvedContract};
use candymint::candy::uploader::{load_metadata_items, upload_config_lines};
use candymint::candy::{derive_candy_machine, initialize_candy_machine_instruction, uuid_of};
use candymint::chain::{ChainClient, RpcChainClient};
use candymint::config::{load_keypair, CandyFileConfig, RunConfig};
use candymint::error::Error;
use candymint::logs::RunLogs;
use candymint::minter::{LoopOutcome, MintLoopDriver};
use candymint::scrape::{extract_candidates, fetch_site_text};

#[derive(Parser)]
#[command(name = "candymint", about = "Solana candy machine automation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the mint loop described by a run config file.
    Mint {
        /// Path to the run config JSON.
        config: PathBuf,
    },
    /// Upload metadata config lines to an existing candy machine config.
    Upload {
        /// Candy machine config account address.
        #[arg(long)]
        config_address: String,
        /// Directory of per-NFT JSON asset files.
        #[arg(long)]
        assets: PathBuf,
        /// URI template; `{index}` is replaced with the item index.
        #[arg(long)]
        uri_template: String,
        #[arg(long, default_value = "devnet")]
        cluster: String,
        /// Wallet key file (JSON byte array).
        #[arg(long)]
        keypair: PathBuf,
    },
    /// Initialize a candy machine for an existing config account.
    Init {
        #[arg(long)]
        config_address: String,
        /// Mint price in SOL.
        #[arg(long)]
        price: f64,
        /// Number of items available.
        #[arg(long)]
        items: u64,
        #[arg(long, default_value = "devnet")]
        cluster: String,
        #[arg(long)]
        keypair: PathBuf,
    },
    /// Discover a candy machine config address from a mint site.
    Scrape {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "mainnet-beta")]
        cluster: String,
        /// Directory the discovered config is saved into.
        #[arg(long, default_value = "candyMachine")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Mint { config } => run_mint(&config).await,
        Command::Upload {
            config_address,
            assets,
            uri_template,
            cluster,
            keypair,
        } => run_upload(&config_address, &assets, &uri_template, &cluster, &keypair).await,
        Command::Init {
            config_address,
            price,
            items,
            cluster,
            keypair,
        } => run_init(&config_address, price, items, &cluster, &keypair).await,
        Command::Scrape { url, cluster, out } => run_scrape(&url, &cluster, &out).await,
    };

    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}

async fn run_mint(config_path: &PathBuf) -> Result<()> {
    let mut config = RunConfig::load(config_path)
        .with_context(|| format!("reading run config {}", config_path.display()))?;
    let logs = Arc::new(RunLogs::open(&config.logs_dir, &config.name)?);
    config.validate()?;

    logs.info(&format!(
        "Config Loaded! Task: \"{}\"; Cluster: \"{}\"; MintCount: \"{}\"; Candy Machine: \"{}\"",
        config.name,
        config.cluster,
        if config.unbounded() {
            "Unlimited".to_string()
        } else {
            config.mint_count.to_string()
        },
        config.candy_machine,
    ));

    logs.info(&format!("Connecting to cluster ({})...", config.cluster));
    let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect(&config.cluster)?);
    let payer = Arc::new(load_keypair(&config.wallet_priv_key)?);

    let candy = ready_candy(&client, &mut config, config_path, &logs).await?;
    logs.info(&format!(
        "Candy machine ready: config {} / machine {}",
        candy.config, candy.candy_machine
    ));

    let driver = MintLoopDriver::new(client, payer, candy, Arc::clone(&logs));
    let (outcome, attempts) = driver.run(config.mint_count).await;

    logs.info("Writing results...");
    let report = logs.write_report(&attempts)?;
    logs.info(&format!(
        "Done! {:?}; {} attempt(s) recorded; report at {}",
        outcome,
        attempts.len(),
        report.display()
    ));
    if outcome == LoopOutcome::Stopped {
        info!("run stopped early; report is complete for all dispatched attempts");
    }
    Ok(())
}

/// Use the configured candy machine address, or discover one from the mint
/// site and persist it back into the run config.
async fn ready_candy(
    client: &Arc<dyn ChainClient>,
    config: &mut RunConfig,
    config_path: &PathBuf,
    logs: &RunLogs,
) -> Result<ResolvedContract> {
    if !config.candy_machine.is_empty() {
        return Ok(probe_candidate(client.as_ref(), &config.candy_machine).await?);
    }

    logs.info(&format!(
        "CandyMachine is not set, trying to get it from MintUrl ({})",
        config.mint_url
    ));
    logs.info("Downloading mint site resources...");
    let http = reqwest::Client::new();
    let texts = fetch_site_text(&http, &config.mint_url).await?;
    let candidates = extract_candidates(texts.iter().map(String::as_str));
    logs.info(&format!(
        "Found {} candidate(s) that may be candy machines. Confirming with the chain...",
        candidates.len()
    ));

    let resolved = resolve_candidates(Arc::clone(client), candidates).await?;
    logs.info(&format!(
        "Candy machine has been obtained: {}, saving...",
        resolved.address
    ));
    config.candy_machine = resolved.address.clone();
    config.save(config_path)?;
    Ok(resolved)
}

async fn run_upload(
    config_address: &str,
    assets: &PathBuf,
    uri_template: &str,
    cluster: &str,
    keypair: &PathBuf,
) -> Result<()> {
    let config: Pubkey = config_address
        .parse()
        .map_err(|e| Error::Config(format!("bad config address: {}", e)))?;
    let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect(cluster)?);
    let payer = Arc::new(load_keypair(keypair)?);

    let items = load_metadata_items(assets)?;
    info!("{} NFTs found", items.len());

    let results = upload_config_lines(client, payer, config, &items, uri_template).await;
    let failed: Vec<_> = results.iter().filter(|r| !r.succeeded()).collect();
    for result in &failed {
        error!(
            "batch at offset {} ({} item(s)) failed: {}",
            result.offset,
            result.items,
            result.error.as_deref().unwrap_or("unknown")
        );
    }
    info!(
        "upload finished: {}/{} batch(es) succeeded",
        results.len() - failed.len(),
        results.len()
    );
    if !failed.is_empty() {
        anyhow::bail!("{} batch(es) failed; re-run upload for those offsets", failed.len());
    }
    Ok(())
}

async fn run_init(
    config_address: &str,
    price_sol: f64,
    items: u64,
    cluster: &str,
    keypair: &PathBuf,
) -> Result<()> {
    let config: Pubkey = config_address
        .parse()
        .map_err(|e| Error::Config(format!("bad config address: {}", e)))?;
    let client = RpcChainClient::connect(cluster)?;
    let payer = load_keypair(keypair)?;

    let uuid = uuid_of(config_address);
    let (candy_machine, bump) = derive_candy_machine(&config, &uuid);
    let price_lamports = (price_sol * LAMPORTS_PER_SOL as f64) as u64;

    let ix = initialize_candy_machine_instruction(
        bump,
        &uuid,
        price_lamports,
        items,
        &candy_machine,
        &payer.pubkey(),
        &config,
        &payer.pubkey(),
    );
    let tx = client
        .submit_transaction(&[ix], &payer.pubkey(), &[&payer])
        .await?;
    info!(
        "Candy machine initialized! PublicKey: {}; UUID: {}; TX: {}",
        candy_machine, uuid, tx
    );
    Ok(())
}

async fn run_scrape(url: &str, cluster: &str, out: &PathBuf) -> Result<()> {
    let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect(cluster)?);
    let http = reqwest::Client::new();

    info!("Getting candy machine from {}...", url);
    let texts = fetch_site_text(&http, url).await?;
    let candidates = extract_candidates(texts.iter().map(String::as_str));
    info!("Found {} candidate(s), confirming with the chain...", candidates.len());

    let resolved = resolve_candidates(client, candidates).await?;
    let file = CandyFileConfig {
        uuid: resolved.uuid.clone(),
        config: resolved.address.clone(),
        network: cluster.to_string(),
    };
    let path = out.join(format!("{}.json", sanitize_host(url)));
    file.save(&path)?;
    info!(
        "Candy machine obtained! MintSite: {}; CandyMachine: {}; saved at {}",
        url,
        resolved.address,
        path.display()
    );
    Ok(())
}

/// Turn a mint-site URL into a file-name-safe slug.
fn sanitize_host(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
