// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Provisioning interface stand-in for simulated devices

use std::{io::BufRead, sync::mpsc};

use bytes::Bytes;
use log::{debug, error, info, warn};

use keychain_core::{
    device::{Provisioning, StatusView},
    engine::DeviceStatus,
    proto::{prelude::ApprovalDecision, Request},
};

/// Signature approval policy
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Prompt for approval on the console
    Manual,
    /// Approve every request
    Approve,
    /// Reject every request
    Deny,
    /// Leave decisions to the connected host
    Remote,
}

/// [`SimProvisioning`] logs device status changes and resolves pending
/// signature requests according to an [`ApprovalPolicy`], queueing
/// decisions into the device command channel.
pub struct SimProvisioning {
    policy: ApprovalPolicy,
    commands: mpsc::Sender<Bytes>,
    console: Option<mpsc::Receiver<String>>,
    prompted: bool,
    decided: bool,
}

impl SimProvisioning {
    /// Create a new provisioning stand-in
    ///
    /// [`ApprovalPolicy::Manual`] reads decisions from stdin.
    pub fn new(policy: ApprovalPolicy, commands: mpsc::Sender<Bytes>) -> Self {
        let console = match policy {
            ApprovalPolicy::Manual => Some(console()),
            _ => None,
        };

        Self {
            policy,
            commands,
            console,
            prompted: false,
            decided: false,
        }
    }

    /// Resolve a decision for the pending request, if available
    fn decision(&mut self) -> Option<bool> {
        match self.policy {
            ApprovalPolicy::Approve => Some(true),
            ApprovalPolicy::Deny => Some(false),
            ApprovalPolicy::Remote => None,
            ApprovalPolicy::Manual => {
                let l = self.console.as_ref()?.try_recv().ok()?;

                match l.trim() {
                    "y" | "yes" => Some(true),
                    "n" | "no" => Some(false),
                    _ => {
                        warn!("Unrecognised input '{}', expected y/n", l.trim());
                        None
                    }
                }
            }
        }
    }
}

impl Provisioning for SimProvisioning {
    fn poll(&mut self, view: &StatusView<'_>) -> bool {
        for s in view.transitions {
            info!("Status: {}", s);
        }

        let req = match (view.status, view.pending) {
            (DeviceStatus::Signing, Some(r)) => r,
            _ => {
                self.prompted = false;
                self.decided = false;
                return true;
            }
        };

        // One decision per request, the device resolves it on the next protocol task
        if self.decided {
            return true;
        }

        if !self.prompted {
            info!(
                "Signature request for account {}, message: {}",
                req.index,
                hex::encode(req.msg)
            );

            if self.policy == ApprovalPolicy::Manual {
                info!("Approve? [y/n]");
            }

            self.prompted = true;
        }

        let approve = match self.decision() {
            Some(v) => v,
            None => return true,
        };

        debug!("Queueing decision (approve: {})", approve);

        let frame = match Request::SignatureApprovalDecision(ApprovalDecision { approve }).encode() {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to encode decision: {}", e);
                return false;
            }
        };

        if self.commands.send(Bytes::from(frame)).is_err() {
            error!("Command channel closed");
            return false;
        }

        self.decided = true;

        true
    }
}

/// Spawn a reader for console input lines
fn console() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || forward_lines(std::io::stdin().lock(), &tx));

    rx
}

/// Forward input lines until the input ends or the receiver is dropped
fn forward_lines(r: impl BufRead, tx: &mpsc::Sender<String>) {
    for l in r.lines() {
        match l {
            Ok(l) => {
                if tx.send(l).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}
