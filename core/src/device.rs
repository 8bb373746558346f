// Copyright (c) 2022-2023 The MobileCoin Foundation

//! [`Device`] binds an [`Engine`] to its command [`Channel`], provisioning
//! collaborator, and [`Telemetry`], executing scheduled tasks via [`Runner`].

use heapless::Vec;
use strum::EnumCount;

use keychain_proto::{ProtoError, Request, Response, MAX_FRAME_LEN};

use crate::{
    engine::{
        error_response, DeviceStatus, Engine, Error, Event, Output, SignatureRequest,
        TRANSITION_LOG_LEN,
    },
    keystore::Storage,
    scheduler::{Runner, TaskContext, TaskId, TaskResult},
    signer::Curve,
    telemetry::Telemetry,
};

/// [`Channel`] trait provides the framed command channel
pub trait Channel {
    /// Read a single frame (without the newline delimiter) into `buff`
    ///
    /// Returns `Ok(None)` when no complete frame is available. Frames
    /// exceeding `buff` are discarded and reported as [`Error::MalformedMessage`].
    fn read_frame(&mut self, buff: &mut [u8]) -> Result<Option<usize>, Error>;

    /// Write a frame, followed by a newline delimiter
    fn write_frame(&mut self, frame: &[u8]);

    /// Write raw (unframed) bytes
    fn write_raw(&mut self, data: &[u8]);
}

impl<T: Channel> Channel for &mut T {
    fn read_frame(&mut self, buff: &mut [u8]) -> Result<Option<usize>, Error> {
        T::read_frame(self, buff)
    }

    fn write_frame(&mut self, frame: &[u8]) {
        T::write_frame(self, frame)
    }

    fn write_raw(&mut self, data: &[u8]) {
        T::write_raw(self, data)
    }
}

/// Read-only device snapshot provided to the provisioning collaborator
#[derive(Clone, PartialEq, Debug)]
pub struct StatusView<'a> {
    pub status: DeviceStatus,
    /// Signature request awaiting approval
    pub pending: Option<&'a SignatureRequest>,
    /// Status transitions since the previous poll, oldest first
    pub transitions: &'a [DeviceStatus],
}

/// [`Provisioning`] trait provides the provisioning interface collaborator
///
/// Collaborators only observe device state, any resulting commands
/// (approval decisions, account selection, settings) must be queued
/// via the command [`Channel`].
pub trait Provisioning {
    /// Service the provisioning interface, returning `false` on failure
    fn poll(&mut self, view: &StatusView<'_>) -> bool;
}

impl<T: Provisioning> Provisioning for &mut T {
    fn poll(&mut self, view: &StatusView<'_>) -> bool {
        T::poll(self, view)
    }
}

/// No-op [`Provisioning`] implementation
impl Provisioning for () {
    fn poll(&mut self, _view: &StatusView<'_>) -> bool {
        true
    }
}

/// Keychain device context, owning all mutable device state
pub struct Device<S: Storage, C: Curve, CH: Channel, P: Provisioning> {
    engine: Engine<S, C>,
    channel: CH,
    provisioning: P,
    telemetry: Telemetry,
    buff: [u8; MAX_FRAME_LEN],
}

impl<S: Storage, C: Curve, CH: Channel, P: Provisioning> Device<S, C, CH, P> {
    /// Create a new device context
    pub fn new(engine: Engine<S, C>, channel: CH, provisioning: P) -> Self {
        Self {
            engine,
            channel,
            provisioning,
            telemetry: Telemetry::new(),
            buff: [0u8; MAX_FRAME_LEN],
        }
    }

    /// Read and handle at most one command from the channel
    pub fn process_command(&mut self) -> TaskResult {
        let n = match self.channel.read_frame(&mut self.buff) {
            Ok(Some(n)) => n,
            Ok(None) => return TaskResult::ok(),
            Err(e) => return self.fail(e),
        };

        let req = match Request::decode(&self.buff[..n]) {
            Ok(r) => r,
            Err(ProtoError::UnknownType(_) | ProtoError::UnexpectedType(_)) => {
                #[cfg(feature = "log")]
                log::warn!("unknown command");

                // Unknown commands are counted but not answered
                self.telemetry.record_error(Error::UnknownCommand);
                return TaskResult::failed();
            }
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("malformed command: {}", _e);

                return self.fail(Error::MalformedMessage);
            }
        };

        #[cfg(feature = "log")]
        log::debug!("request: {}", req.kind());

        let evt = match Event::parse(&req) {
            Ok(e) => e,
            Err(e) => return self.fail(e),
        };

        let output = match self.engine.update(&evt) {
            Ok(o) => o,
            Err(e) => return self.fail(e),
        };

        let r = match &output {
            Output::ArtifactStart { size } => return self.send_artifact(*size),
            _ => self.send(&output),
        };

        match (r, &output) {
            (Err(e), _) => self.fail(e),
            // The signature is returned regardless, the failure is recorded
            (
                Ok(()),
                Output::Signature {
                    verified: false, ..
                },
            ) => {
                self.telemetry
                    .record_error(Error::SignatureVerificationFailed);
                TaskResult::failed()
            }
            (Ok(()), _) => TaskResult::ok(),
        }
    }

    /// Provide a [`StatusView`] to the provisioning collaborator
    pub fn poll_provisioning(&mut self) -> TaskResult {
        let transitions: Vec<DeviceStatus, TRANSITION_LOG_LEN> =
            self.engine.drain_transitions().collect();

        let view = StatusView {
            status: self.engine.status(),
            pending: self.engine.pending(),
            transitions: &transitions,
        };

        match self.provisioning.poll(&view) {
            true => TaskResult::ok(),
            false => TaskResult::failed(),
        }
    }

    /// Emit and reset telemetry
    pub fn report(&mut self, now: u64, enabled: &[bool; TaskId::COUNT]) -> TaskResult {
        let _r = self.telemetry.report(now, enabled);

        #[cfg(feature = "log")]
        log::info!("telemetry ({:.2}s)\r\n{}", _r.elapsed, _r);

        TaskResult::ok()
    }

    /// Encode and send the response for an output, if any
    fn send(&mut self, output: &Output) -> Result<(), Error> {
        match output.response()? {
            Some(r) => self.write_response(&r),
            None => Ok(()),
        }
    }

    fn write_response(&mut self, r: &Response) -> Result<(), Error> {
        let v = r.encode().map_err(|_e| {
            #[cfg(feature = "log")]
            log::error!("failed to encode {}: {}", r.kind(), _e);

            Error::EncodingFailed
        })?;

        self.channel.write_frame(&v);

        Ok(())
    }

    /// Stream the artifact: header frame, `size` raw bytes, then a newline
    fn send_artifact(&mut self, size: usize) -> TaskResult {
        if let Err(e) = self.send(&Output::ArtifactStart { size }) {
            return self.fail(e);
        }

        let mut offset = 0;
        while offset < size {
            let max = (size - offset).min(self.buff.len());

            let n = self
                .engine
                .keystore()
                .read_artifact(offset, &mut self.buff[..max]);
            if n == 0 {
                #[cfg(feature = "log")]
                log::error!("artifact truncated at {} of {} bytes", offset, size);

                self.channel.write_raw(b"\n");
                self.telemetry.record_error(Error::InvalidLength);
                return TaskResult::failed();
            }

            self.channel.write_raw(&self.buff[..n]);
            offset += n;
        }

        self.channel.write_raw(b"\n");

        TaskResult::ok()
    }

    /// Record an error and send an error response
    fn fail(&mut self, e: Error) -> TaskResult {
        #[cfg(feature = "log")]
        log::warn!("command failed: {:?}", e);

        self.telemetry.record_error(e);

        // Error responses are short and always encode
        if let Ok(v) = error_response(e).encode() {
            self.channel.write_frame(&v);
        }

        TaskResult::failed()
    }

    /// Access the engine
    pub fn engine(&self) -> &Engine<S, C> {
        &self.engine
    }

    /// Mutably access the engine
    pub fn engine_mut(&mut self) -> &mut Engine<S, C> {
        &mut self.engine
    }

    /// Access the command channel
    pub fn channel(&self) -> &CH {
        &self.channel
    }

    /// Mutably access the command channel
    pub fn channel_mut(&mut self) -> &mut CH {
        &mut self.channel
    }

    /// Mutably access the provisioning collaborator
    pub fn provisioning_mut(&mut self) -> &mut P {
        &mut self.provisioning
    }

    /// Access device telemetry
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

impl<S: Storage, C: Curve, CH: Channel, P: Provisioning> Runner for Device<S, C, CH, P> {
    fn run(&mut self, task: TaskId, ctx: &TaskContext) -> TaskResult {
        match task {
            TaskId::Protocol => self.process_command(),
            TaskId::Provisioning => self.poll_provisioning(),
            TaskId::Telemetry => self.report(ctx.now, &ctx.enabled),
        }
    }

    fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }
}
