// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keychain firmware simulator
//!
//! Runs the device scheduler loop on the host, with a file backed
//! storage image, a timing jitter noise source, and a TCP command channel
//! serving one client at a time. A provisioning stand-in logs device status
//! changes and resolves signature requests per [`ApprovalPolicy`].

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use log::{debug, info};
use tokio::net::TcpListener;

use keychain_core::{
    device::Device,
    engine::Engine,
    helpers::{Conditioned, P256Curve},
    scheduler::{Runner, Scheduler, TaskId},
};

pub mod channel;
pub mod noise;
pub mod provisioning;
pub mod storage;

use channel::channel;
pub use provisioning::ApprovalPolicy;
use provisioning::SimProvisioning;
use storage::FileStorage;

/// Default command channel port
pub const DEFAULT_PORT: u16 = 1237;

/// Simulator options
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct Options {
    /// Command channel listen address
    #[clap(long, env = "KEYCHAIN_LISTEN", default_value = "127.0.0.1:1237")]
    pub listen: SocketAddr,

    /// Storage image, created (erased) if missing
    #[clap(long, env = "KEYCHAIN_STORAGE")]
    pub storage: Option<PathBuf>,

    /// Artifact file served to GetArtifact requests
    #[clap(long, env = "KEYCHAIN_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Signature approval policy
    #[clap(long, value_enum, default_value = "manual")]
    pub approval: ApprovalPolicy,

    /// Protocol (command handling) task period
    #[clap(long, default_value_t = TaskId::Protocol.default_period_ms())]
    pub protocol_period_ms: u64,

    /// Provisioning task period
    #[clap(long, default_value_t = TaskId::Provisioning.default_period_ms())]
    pub provisioning_period_ms: u64,

    /// Telemetry report period
    #[clap(long, default_value_t = TaskId::Telemetry.default_period_ms())]
    pub telemetry_period_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), DEFAULT_PORT),
            storage: None,
            artifact: None,
            approval: ApprovalPolicy::Manual,
            protocol_period_ms: TaskId::Protocol.default_period_ms(),
            provisioning_period_ms: TaskId::Provisioning.default_period_ms(),
            telemetry_period_ms: TaskId::Telemetry.default_period_ms(),
        }
    }
}

/// Handle to a running simulator instance
pub struct Simulator {
    addr: SocketAddr,
    exit: Arc<AtomicBool>,
    device: Option<JoinHandle<()>>,
    server: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Simulator {
    /// Start a simulator with the provided options
    pub async fn start(opts: Options) -> anyhow::Result<Self> {
        let storage = FileStorage::open(opts.storage.as_deref(), opts.artifact.as_deref())?;

        let listener = TcpListener::bind(opts.listen).await?;
        let addr = listener.local_addr()?;

        // Setup device context
        let (channel, host) = channel();
        let provisioning = SimProvisioning::new(opts.approval, host.commands());
        let curve = P256Curve::new(Conditioned::new(noise::JitterNoise::new()));

        let device = Device::new(Engine::new(storage, curve), channel, provisioning);

        let mut scheduler = Scheduler::new();
        scheduler.set_period_ms(TaskId::Protocol, opts.protocol_period_ms);
        scheduler.set_period_ms(TaskId::Provisioning, opts.provisioning_period_ms);
        scheduler.set_period_ms(TaskId::Telemetry, opts.telemetry_period_ms);

        debug!("Using approval policy: {}", opts.approval);

        // Run device loop
        let exit = Arc::new(AtomicBool::new(false));
        let e = exit.clone();
        let device = std::thread::Builder::new()
            .name("keychain-device".into())
            .spawn(move || run_device(device, scheduler, e))?;

        // Serve command channel
        let server = tokio::spawn(host.serve(listener));

        info!("Simulator listening on {}", addr);

        Ok(Self {
            addr,
            exit,
            device: Some(device),
            server,
        })
    }

    /// Fetch the bound command channel address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Await simulator exit
    pub async fn wait(&mut self) -> anyhow::Result<()> {
        (&mut self.server).await??;
        Ok(())
    }

    /// Stop the simulator
    pub async fn exit(mut self) -> anyhow::Result<()> {
        self.exit.store(true, Ordering::Relaxed);
        self.server.abort();

        if let Some(d) = self.device.take() {
            tokio::task::spawn_blocking(move || d.join())
                .await?
                .map_err(|_| anyhow::anyhow!("device thread panicked"))?;
        }

        Ok(())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.exit.store(true, Ordering::Relaxed);
        self.server.abort();
    }
}

/// Device scheduler loop, runs until `exit` is set
fn run_device<R: Runner>(mut device: R, mut scheduler: Scheduler, exit: Arc<AtomicBool>) {
    let origin = Instant::now();
    let clock = move || origin.elapsed().as_micros() as u64;

    while !exit.load(Ordering::Relaxed) {
        if scheduler.tick(&mut device, &clock) == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    debug!("Device loop exited");
}
