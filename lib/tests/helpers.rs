#![allow(unused)]

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use log::{debug, LevelFilter};
use portpicker::pick_unused_port;
use simplelog::SimpleLogger;

use keychain::TcpHandle;
use keychain_sim::{ApprovalPolicy, Options, Simulator};

/// Message as issued by the serial integration harness
pub const MSG: [u8; 64] = *b"amessagewith32charactersforsure1amessagewith32charactersforsure1";

pub const SENDER: &str = "0x2a1f3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f809";

/// Setup a simulator instance with the provided approval policy
pub async fn setup(approval: ApprovalPolicy) -> (Simulator, TcpHandle) {
    setup_with(approval, None).await
}

/// Setup a simulator instance with an optional artifact file
pub async fn setup_with(
    approval: ApprovalPolicy,
    artifact: Option<PathBuf>,
) -> (Simulator, TcpHandle) {
    // Setup logging
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());

    // Find open port
    let port = pick_unused_port().unwrap();

    // Fast task periods to keep tests quick
    let opts = Options {
        listen: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port),
        artifact,
        approval,
        protocol_period_ms: 5,
        provisioning_period_ms: 5,
        ..Default::default()
    };

    let s = Simulator::start(opts).await.expect("Simulator launch failed");

    debug!("Connecting to simulator at {}", s.addr());

    let h = TcpHandle::connect(s.addr())
        .await
        .expect("Simulator connection failed")
        .with_timeouts(2, 5);

    (s, h)
}
