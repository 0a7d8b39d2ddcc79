use std::sync::Arc;

use cfg_if::cfg_if;
use clap::Parser;
use colored::Colorize;
use shared::{
    interaction::NetworkEvent,
    log::init_log,
    plot::PlotFiles,
    utils::{format_capacity, format_deadline},
};
use tokio::{signal, sync::mpsc};
use tracing::*;

use crate::{config::load_config_file, network::Network};

mod config;
mod network;

cfg_if! {
    if #[cfg(feature = "build-version")] {
        include!(concat!(env!("OUT_DIR"), "/version.rs"));
    } else {
        pub const VERSION: &str = "unknown";
    }
}

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    #[arg(
        long,
        value_name = "CONFIG_FILE",
        help = "Path to the mining config file",
        default_value = "./config.json"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log();

    let args = Args::parse();

    info!("VERSION:{}", VERSION);

    let cfg = load_config_file(&args.config)?;
    debug!("config: {cfg:?}");

    let plot_files = PlotFiles::scan(&cfg.plot_paths, cfg.chunk_part_nonces);
    if plot_files.is_empty() {
        warn!("no plot files found, check 'plot_paths' in {}", args.config);
    } else {
        info!(
            "{} plot files, total capacity {}",
            plot_files.plot_files().len(),
            format_capacity(plot_files.total_size())
        );
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let network = Arc::new(Network::new(&cfg, event_tx));
    network.start_mining();

    let event_network = network.clone();
    let events = tokio::spawn(async move {
        let mut round_start = shared::timestamp();
        while let Some(event) = event_rx.recv().await {
            if let NetworkEvent::StateChange { .. } = &event {
                debug!("previous round lasted '{} sec.'", (shared::timestamp() - round_start) / 1000);
                round_start = shared::timestamp();
            }
            handle_event(&event_network, event);
        }
    });

    signal::ctrl_c().await?;
    info!("ctrl+c received, shutting down");
    events.abort();
    Ok(())
}

fn handle_event(network: &Network, event: NetworkEvent) {
    match event {
        NetworkEvent::StateChange { block_number, base_target, generation_signature, target_deadline } => {
            network.handle_state_change(block_number);
            info!(
                "{}",
                format!("==================== block '{block_number}' ====================").bold().cyan()
            );
            debug!("base target '{base_target}', target deadline '{}'", format_deadline(target_deadline));
            trace!("generation signature '{generation_signature}'");
            network.check_last_winner(block_number);
            network.check_pool_info();
        }
        NetworkEvent::LastWinner { block_number, account_id, account_rs } => {
            info!("block '{block_number}' was won by {account_rs} ({account_id})");
        }
        NetworkEvent::PoolInfo { reward_recipient_rs, balance_nqt, forged_balance_nqt, miner_count } => {
            info!(
                "pool {reward_recipient_rs}: {miner_count} miners, balance '{}', forged '{}'",
                format_nqt(balance_nqt),
                format_nqt(forged_balance_nqt)
            );
        }
        NetworkEvent::SubmitResult { block_number, nonce, deadline, .. } => {
            info!(
                "confirmed nonce '{nonce}' for block '{block_number}', deadline {}",
                format_deadline(deadline)
            );
        }
    }
}

fn format_nqt(nqt: u64) -> String {
    format!("{}.{:08} BURST", nqt / 100_000_000, nqt % 100_000_000)
}
