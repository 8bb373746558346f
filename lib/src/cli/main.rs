// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with keychain devices

use std::path::Path;

use clap::Parser;
use log::{debug, info, LevelFilter};
use serde::Serialize;

use keychain::{
    proto::{prelude::Settings, MSG_LEN, PK_LEN},
    TcpHandle, DEFAULT_ADDR, DEFAULT_REQUEST_TIMEOUT_S, DEFAULT_USER_TIMEOUT_S,
};

mod helpers;
use helpers::*;

/// Keychain command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Device (or simulator) command channel address
    #[clap(long, default_value = DEFAULT_ADDR)]
    target: String,

    /// Timeout for device responses
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_S)]
    request_timeout_s: usize,

    /// Timeout for user approval
    #[clap(long, default_value_t = DEFAULT_USER_TIMEOUT_S)]
    user_timeout_s: usize,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch account keys
    Account {
        /// Account index
        #[clap(long, default_value = "0")]
        index: i32,

        /// Write account keys to a `.json` file
        #[clap(long)]
        output: Option<String>,
    },

    /// Enter account selection mode
    Select,

    /// Generate a new account
    Generate {
        /// Account index
        #[clap(long, default_value = "0")]
        index: i32,
    },

    /// Sign a message, waiting for approval
    Sign {
        /// Account index
        #[clap(long, default_value = "0")]
        index: i32,

        /// Account public key (hex encoded, omit to fetch from the device)
        #[clap(long)]
        pk: Option<HexData<PK_LEN>>,

        /// Message to be signed (hex encoded)
        #[clap(long)]
        msg: HexData<MSG_LEN>,
    },

    /// Approve the pending signature request
    Approve,

    /// Reject the pending signature request
    Reject,

    /// Fetch the stored artifact
    Artifact {
        /// Output file
        #[clap(long)]
        output: String,
    },

    /// Fetch the sender for the selected account
    Sender,

    /// Select an account and sender (in selection mode)
    SelectAccount {
        /// Account index
        #[clap(long)]
        index: i32,

        /// Sender identifier (0x prefixed, 64 hex digits)
        #[clap(long)]
        sender: String,
    },

    /// Cancel account selection
    CancelSelection,

    /// Fetch device settings
    Settings,

    /// Write device settings
    WriteSettings {
        /// Access point SSID
        #[clap(long)]
        ssid: String,

        /// Access point password
        #[clap(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    // Connect to device
    debug!("Connecting to: {}", args.target);

    let t = TcpHandle::connect(&args.target)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to '{}': {}", args.target, e))?
        .with_timeouts(args.request_timeout_s, args.user_timeout_s);

    // Execute command
    execute(t, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided handle
async fn execute(t: TcpHandle, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Account { index, output } => {
            info!("requesting keys for account: {}", index);

            let a = match t.account(index).await? {
                Some(a) => a,
                None => {
                    info!("account {} not initialised", index);
                    return Ok(());
                }
            };

            info!("public key: {}", hex::encode(a.pk));
            info!("salt: {}", hex::encode(a.salt));

            if let Some(o) = output {
                write_output(&o, &a).await?;
            }
        }
        Actions::Select => {
            t.select_accounts().await?;

            info!("account selection started");
        }
        Actions::Generate { index } => {
            info!("generating account: {}", index);

            t.generate_account(index).await?;

            if let Some(a) = t.account(index).await? {
                info!("public key: {}", hex::encode(a.pk));
            }
        }
        Actions::Sign { index, pk, msg } => {
            let pk = match pk {
                Some(pk) => pk.0,
                None => match t.account(index).await? {
                    Some(a) => a.pk,
                    None => return Err(anyhow::anyhow!("account {} not initialised", index)),
                },
            };

            info!("requesting signature for message: {}", msg);
            info!("waiting for approval...");

            let s = t.sign(index, &pk, msg.as_ref()).await?;

            info!("signature: {}", hex::encode(s));
        }
        Actions::Approve => decide(&t, true).await?,
        Actions::Reject => decide(&t, false).await?,
        Actions::Artifact { output } => {
            let a = t.artifact().await?;

            info!("received artifact ({} bytes)", a.len());

            tokio::fs::write(&output, a).await?;

            info!("wrote artifact to '{}'", output);
        }
        Actions::Sender => {
            let s = t.sender().await?;

            info!("sender: {}", s);
        }
        Actions::SelectAccount { index, sender } => {
            t.select_account(index, &sender).await?;

            info!("selected account: {}", index);
        }
        Actions::CancelSelection => {
            t.cancel_selection().await?;

            info!("account selection cancelled");
        }
        Actions::Settings => {
            let s = t.settings().await?;

            info!("ssid: {}", s.ssid);
            info!("password: {}", mask(&s.password));
        }
        Actions::WriteSettings { ssid, password } => {
            t.write_settings(&Settings { ssid, password }).await?;

            info!("settings written");
        }
    }

    Ok(())
}

/// Send an approval decision for the pending signature request
async fn decide(t: &TcpHandle, approve: bool) -> anyhow::Result<()> {
    match t.approve(approve).await? {
        Some(s) => info!("signature: {}", hex::encode(s)),
        None => info!("signature request rejected"),
    }

    Ok(())
}

/// Mask secrets for display
fn mask(s: &str) -> String {
    s.chars().map(|_| '*').collect()
}

/// Helper to write output files
async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        // Encode to JSON for `.json` files
        Some("json") => {
            let s = serde_json::to_string(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
