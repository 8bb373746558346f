// Copyright (c) 2022-2023 The MobileCoin Foundation

use clap::Parser;
use log::{debug, info, LevelFilter};

use keychain_sim::*;

/// Keychain firmware simulator
///
/// Runs the keychain scheduler loop on the host, serving the
/// command channel over TCP for use with `keychain-cli` or the
/// `keychain` library.
#[derive(Clone, PartialEq, Debug, Parser)]
pub struct Args {
    #[clap(flatten)]
    sim_opts: Options,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    info!("Launching simulator...");

    let mut s = Simulator::start(args.sim_opts).await?;

    // Await simulator exit or exit signal
    tokio::select!(
        r = s.wait() => {
            debug!("Complete!");
            r?;
        }
        // Exit on ctrl + c
        _ = tokio::signal::ctrl_c() => {
            debug!("Exit!");
            s.exit().await?;
        },
    );

    Ok(())
}
