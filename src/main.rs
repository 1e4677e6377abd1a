use std::sync::atomic::Ordering;

use arbwatch::arb::pool::PoolStore;
use arbwatch::arb::sizing::SizingEngine;
use arbwatch::bot::{detection_pass, Bot, BotSettings};
use arbwatch::config::Config;
use arbwatch::notify::ArbLog;
use arbwatch::persist::pool_table::{read_rows, store_from_rows, PoolTable};
use arbwatch::sync::{ChainClient, LogPoller, SnapshotFetcher};
use arbwatch::utils::app_context::AppContext;
use arbwatch::utils::logger::setup_logger;
use clap::{Parser, Subcommand};
use eyre::{Error, Result};
use log::{info, warn};

/// Command line of the monitor
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// What to do, `run` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Entry points
#[derive(Subcommand)]
enum Commands {
    /// Snapshot every pool at the current block, then monitor
    Init,
    /// Resume from the persisted pool table, catch up on missed events, then monitor
    Run,
    /// One detection pass over the persisted pool table, without polling the chain
    Scan,
}

/// Snapshots the pool list at the head block and starts monitoring after it
async fn init(ctx: AppContext) -> Result<(), Error> {
    let rows = read_rows(&ctx.config.pools_path)?;
    let mut store = store_from_rows(rows, &ctx.decimals)?;
    let chain = ctx.chain();

    let head = chain.block_number().await?;
    SnapshotFetcher::new(
        &chain,
        ctx.config.rate_limit,
        ctx.config.batch_period,
        ctx.config.snapshot_retries,
    )
    .initial_load(&mut store, head)
    .await?;

    let pool_table = PoolTable::new(&ctx.config.pool_table_path);
    pool_table.save(&store)?;
    info!("Snapshot of {} pools at block {head} saved", store.len());

    let mut poller = LogPoller::new(head + 1, ctx.config.max_block_range);
    if poller.catch_up(&chain, &mut store).await? > 0 {
        pool_table.save(&store)?;
    }
    monitor(ctx, store, poller).await
}

/// Reloads the pool table and applies every event since its latest block
async fn resume(ctx: AppContext) -> Result<(), Error> {
    let pool_table = PoolTable::new(&ctx.config.pool_table_path);
    let mut store = pool_table.load_store(&ctx.decimals)?;
    let chain = ctx.chain();

    let mut poller = LogPoller::new(store.latest_block(), ctx.config.max_block_range);
    poller.catch_up(&chain, &mut store).await?;

    monitor(ctx, store, poller).await
}

/// Runs the bot until Ctrl-C
async fn monitor(ctx: AppContext, store: PoolStore, poller: LogPoller) -> Result<(), Error> {
    let settings = BotSettings {
        anchor: ctx.config.anchor_token,
        sizing: SizingEngine::new(ctx.config.fee),
        idle_interval: ctx.config.idle_interval,
        pool_table: PoolTable::new(&ctx.config.pool_table_path),
        arb_log: ArbLog::new(&ctx.config.arb_log_dir)?,
    };
    let mut bot = Bot::new(ctx.chain(), ctx.routers(), store, poller, settings);

    let shutdown = bot.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, finishing the current iteration");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    bot.run().await
}

/// Looks for arbitrage in the persisted state once
async fn scan(ctx: AppContext) -> Result<(), Error> {
    let store = PoolTable::new(&ctx.config.pool_table_path).load_store(&ctx.decimals)?;
    let arb_log = ArbLog::new(&ctx.config.arb_log_dir)?;
    let found = detection_pass(
        &store,
        &ctx.config.anchor_token,
        &SizingEngine::new(ctx.config.fee),
        &ctx.routers(),
    )
    .await?;
    for record in &found {
        arb_log.write(record)?;
    }
    info!(
        "Scan of {} pools at block {} found {} opportunities",
        store.len(),
        store.latest_block(),
        found.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_logger()?;

    let cli = Cli::parse();
    let ctx = AppContext::new(Config::from_env()?)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => init(ctx).await,
        Commands::Run => resume(ctx).await,
        Commands::Scan => scan(ctx).await,
    }
}
