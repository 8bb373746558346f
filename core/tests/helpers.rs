#![allow(unused)]

use std::{cell::Cell, collections::VecDeque};

use log::{debug, trace};
use rand::{rngs::StdRng, SeedableRng};

use keychain_core::{
    device::{Channel, Device, Provisioning, StatusView},
    engine::{DeviceStatus, Engine, Error, SignatureRequest},
    helpers::P256Curve,
    keystore::{Storage, ERASED, STORAGE_LEN},
    proto::{Request, Response},
};

pub const SEED: u64 = 0x6b65_7963_6861_696e;

/// Message as issued by the serial integration harness
pub const MSG: [u8; 64] = *b"amessagewith32charactersforsure1amessagewith32charactersforsure1";

pub const SENDER: &str = "0x2a1f3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f809";

pub type TestDevice = Device<MemStorage, P256Curve<StdRng>, ScriptedChannel, Recorder>;

pub fn setup() -> TestDevice {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());

    let engine = Engine::new(MemStorage::default(), curve());

    Device::new(engine, ScriptedChannel::default(), Recorder::default())
}

pub fn curve() -> P256Curve<StdRng> {
    P256Curve::new(StdRng::seed_from_u64(SEED))
}

/// In-memory storage, erased on creation
#[derive(Clone, PartialEq, Debug)]
pub struct MemStorage {
    pub data: Vec<u8>,
    pub artifact: Vec<u8>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self {
            data: vec![ERASED; STORAGE_LEN],
            artifact: vec![],
        }
    }
}

impl Storage for MemStorage {
    fn read_bytes(&self, offset: usize, buff: &mut [u8]) {
        buff.copy_from_slice(&self.data[offset..][..buff.len()]);
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        self.data[offset..][..data.len()].copy_from_slice(data);
    }

    fn commit(&mut self) {}

    fn artifact_len(&self) -> usize {
        self.artifact.len()
    }

    fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize {
        let d = self.artifact.get(offset..).unwrap_or_default();
        let n = d.len().min(buff.len());
        buff[..n].copy_from_slice(&d[..n]);
        n
    }
}

/// Channel replaying queued frames and capturing device output
#[derive(Default)]
pub struct ScriptedChannel {
    pub incoming: VecDeque<Vec<u8>>,
    pub outgoing: Vec<u8>,
}

impl ScriptedChannel {
    /// Queue a request frame
    pub fn push(&mut self, req: &Request) {
        let v = req.encode().unwrap();
        trace!("queue: {}", String::from_utf8_lossy(&v));
        self.incoming.push_back(v);
    }

    /// Queue raw frame bytes
    pub fn push_raw(&mut self, frame: &[u8]) {
        self.incoming.push_back(frame.to_vec());
    }

    /// Take all output written since the last call
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take and decode response frames written since the last call
    pub fn responses(&mut self) -> Vec<Response> {
        let out = self.take();

        out.split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| {
                debug!("resp: {}", String::from_utf8_lossy(l));
                Response::decode(l).unwrap()
            })
            .collect()
    }
}

impl Channel for ScriptedChannel {
    fn read_frame(&mut self, buff: &mut [u8]) -> Result<Option<usize>, Error> {
        let f = match self.incoming.pop_front() {
            Some(f) => f,
            None => return Ok(None),
        };

        if f.len() > buff.len() {
            return Err(Error::MalformedMessage);
        }

        buff[..f.len()].copy_from_slice(&f);
        Ok(Some(f.len()))
    }

    fn write_frame(&mut self, frame: &[u8]) {
        self.outgoing.extend_from_slice(frame);
        self.outgoing.push(b'\n');
    }

    fn write_raw(&mut self, data: &[u8]) {
        self.outgoing.extend_from_slice(data);
    }
}

/// Provisioning collaborator recording the views it is given
#[derive(Default)]
pub struct Recorder {
    pub polls: usize,
    pub status: Vec<DeviceStatus>,
    pub transitions: Vec<DeviceStatus>,
    pub pending: Vec<SignatureRequest>,
}

impl Provisioning for Recorder {
    fn poll(&mut self, view: &StatusView<'_>) -> bool {
        self.polls += 1;
        self.status.push(view.status);
        self.transitions.extend_from_slice(view.transitions);
        if let Some(p) = view.pending {
            self.pending.push(p.clone());
        }
        true
    }
}

/// Manually advanced microsecond clock
#[derive(Default)]
pub struct ManualClock(pub Cell<u64>);

impl ManualClock {
    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms * 1_000);
    }
}

impl keychain_core::scheduler::Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.0.get()
    }
}

/// Issue a request and collect the resulting response frames
pub fn exchange(d: &mut TestDevice, req: &Request) -> Vec<Response> {
    debug!("cmd: {:?}", req);

    d.channel_mut().push(req);
    d.process_command();
    d.channel_mut().responses()
}
