// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected keychain devices
//!
//! This provides methods for interacting with the device and is generic
//! over the underlying stream, TCP for the simulator or a serial bridge
//! for hardware devices.

use std::{sync::Arc, time::Duration};

use log::{debug, trace};
use tokio::{
    io::{
        AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
        BufStream,
    },
    net::{TcpStream, ToSocketAddrs},
    sync::Mutex,
    time::timeout,
};

use keychain_proto::{prelude::*, MAX_ACCOUNTS, MSG_LEN, PK_LEN, SIG_LEN};

use crate::Error;

/// Default timeout for user interaction (signature approval)
pub const DEFAULT_USER_TIMEOUT_S: usize = 30;

/// Default timeout for device responses
pub const DEFAULT_REQUEST_TIMEOUT_S: usize = 2;

/// Minimum expected artifact transfer rate (bytes per second)
const MIN_TRANSFER_RATE: usize = 8 * 1024;

/// Out of range account index, always rejected by the device
const FENCE_INDEX: i32 = MAX_ACCOUNTS as i32;

/// Device error code for invalid account indices
const INVALID_INDEX: u8 = 6;

/// Keychain handle for a connected device stream.
///
/// Requests are serialised through the handle, so clones
/// may be shared between tasks.
pub struct DeviceHandle<T> {
    /// Buffered device stream
    t: Arc<Mutex<BufStream<T>>>,
    /// Timeout for user acknowledgements
    user_timeout_s: usize,
    /// Timeout for device responses
    request_timeout_s: usize,
}

impl<T> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            user_timeout_s: self.user_timeout_s,
            request_timeout_s: self.request_timeout_s,
        }
    }
}

/// Create a [DeviceHandle] wrapper from a device stream
impl<T: AsyncRead + AsyncWrite + Unpin + Send> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(BufStream::new(t))),
            user_timeout_s: DEFAULT_USER_TIMEOUT_S,
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
        }
    }
}

impl DeviceHandle<TcpStream> {
    /// Connect to a device (or simulator) via TCP
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        let s = TcpStream::connect(addr).await?;
        s.set_nodelay(true)?;

        Ok(Self::from(s))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> DeviceHandle<T> {
    /// Set request and user interaction timeouts
    pub fn with_timeouts(mut self, request_timeout_s: usize, user_timeout_s: usize) -> Self {
        self.request_timeout_s = request_timeout_s;
        self.user_timeout_s = user_timeout_s;
        self
    }

    /// Helper to fetch user interaction timeout
    fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s as u64)
    }

    /// Helper to fetch request timeout
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s as u64)
    }

    /// Fetch keys for the provided account index, returning `None`
    /// where the account is not initialised
    pub async fn account(&self, index: i32) -> Result<Option<GetAccountResp>, Error> {
        debug!("Requesting account: {}", index);

        match self.request(&Request::GetAccount(GetAccountReq::new(index))).await? {
            Response::Account(a) => Ok(Some(a)),
            Response::AccountRejected(_) => Ok(None),
            r => Err(Error::UnexpectedResponse(r.kind())),
        }
    }

    /// Enter account selection mode
    pub async fn select_accounts(&self) -> Result<(), Error> {
        debug!("Starting account selection");

        let mut t = self.t.lock().await;
        match self
            .send_fenced(&mut t, &Request::GetAccount(GetAccountReq::select()))
            .await?
        {
            None => Ok(()),
            Some(r) => Err(Error::UnexpectedResponse(r.kind())),
        }
    }

    /// Generate a new account at the provided index
    pub async fn generate_account(&self, index: i32) -> Result<(), Error> {
        debug!("Generating account: {}", index);

        let r = self
            .request(&Request::GenerateAccount(GenerateAccountReq { index }))
            .await?;

        expect_ok(r)
    }

    /// Sign a message with the provided account, waiting for user approval
    pub async fn sign(
        &self,
        index: i32,
        pk: &[u8; PK_LEN],
        msg: &[u8; MSG_LEN],
    ) -> Result<[u8; SIG_LEN], Error> {
        debug!("Requesting signature with account: {}", index);

        check_index(index)?;

        let mut t = self.t.lock().await;

        let req = Request::SignatureRequest(SignatureReq::new(index, *pk, *msg));
        let early = self.send_fenced(&mut t, &req).await?;

        debug!("Waiting for user approval");

        let r = match early {
            Some(r) => r,
            None => match timeout(self.user_timeout(), recv(&mut *t)).await {
                Ok(r) => check(r?)?,
                Err(_) => return Err(Error::UserTimeout),
            },
        };

        match signature_outcome(r)? {
            Some(s) => Ok(s),
            None => Err(Error::UserDenied),
        }
    }

    /// Issue a signature request without waiting for approval
    ///
    /// The outcome is returned by the subsequent [`DeviceHandle::approve`] call.
    pub async fn request_signature(
        &self,
        index: i32,
        pk: &[u8; PK_LEN],
        msg: &[u8; MSG_LEN],
    ) -> Result<(), Error> {
        debug!("Issuing signature request with account: {}", index);

        check_index(index)?;

        let mut t = self.t.lock().await;

        let req = Request::SignatureRequest(SignatureReq::new(index, *pk, *msg));
        match self.send_fenced(&mut t, &req).await? {
            None => Ok(()),
            Some(r) => Err(Error::UnexpectedResponse(r.kind())),
        }
    }

    /// Approve or reject the pending signature request, returning
    /// the signature where approved
    pub async fn approve(&self, approve: bool) -> Result<Option<[u8; SIG_LEN]>, Error> {
        debug!("Sending approval decision (approve: {})", approve);

        let r = self
            .request(&Request::SignatureApprovalDecision(ApprovalDecision {
                approve,
            }))
            .await?;

        signature_outcome(r)
    }

    /// Fetch the stored artifact
    pub async fn artifact(&self) -> Result<Vec<u8>, Error> {
        debug!("Requesting artifact");

        let mut t = self.t.lock().await;
        send(&mut *t, &[&Request::GetArtifact]).await?;

        let r = timeout(self.request_timeout(), recv(&mut *t)).await??;
        let size = match check(r)? {
            Response::ArtifactStart(a) => a.size as usize,
            r => return Err(Error::UnexpectedResponse(r.kind())),
        };

        debug!("Reading artifact ({} bytes)", size);

        // Artifact bytes follow the start frame unframed
        let d = self.request_timeout()
            + Duration::from_millis((size * 1000 / MIN_TRANSFER_RATE) as u64);
        let mut buff = vec![0u8; size];
        timeout(d, t.read_exact(&mut buff)).await??;

        // Consume the trailing delimiter
        let mut l = Vec::new();
        timeout(self.request_timeout(), t.read_until(b'\n', &mut l)).await??;

        Ok(buff)
    }

    /// Fetch the sender identifier for the selected account
    pub async fn sender(&self) -> Result<String, Error> {
        debug!("Requesting sender");

        match self.request(&Request::GetSender).await? {
            Response::Sender(s) => Ok(s.sender),
            r => Err(Error::UnexpectedResponse(r.kind())),
        }
    }

    /// Select an account and sender identifier (while in selection mode)
    pub async fn select_account(&self, index: i32, sender: &str) -> Result<(), Error> {
        debug!("Selecting account: {} (sender: {})", index, sender);

        let r = self
            .request(&Request::SelectAccount(SelectAccountReq {
                index,
                sender: sender.to_string(),
            }))
            .await?;

        expect_ok(r)
    }

    /// Cancel account selection
    pub async fn cancel_selection(&self) -> Result<(), Error> {
        debug!("Cancelling account selection");

        let r = self
            .request(&Request::SelectAccount(SelectAccountReq::cancel()))
            .await?;

        expect_ok(r)
    }

    /// Fetch device settings
    pub async fn settings(&self) -> Result<Settings, Error> {
        debug!("Requesting settings");

        match self.request(&Request::GetSettings).await? {
            Response::Settings(s) => Ok(s),
            r => Err(Error::UnexpectedResponse(r.kind())),
        }
    }

    /// Write device settings
    pub async fn write_settings(&self, settings: &Settings) -> Result<(), Error> {
        debug!("Writing settings (ssid: {})", settings.ssid);

        let r = self
            .request(&Request::WriteSettings(settings.clone()))
            .await?;

        expect_ok(r)
    }

    /// Issue a request and await the response
    async fn request(&self, req: &Request) -> Result<Response, Error> {
        let mut t = self.t.lock().await;

        send(&mut *t, &[req]).await?;

        let r = timeout(self.request_timeout(), recv(&mut *t)).await??;

        check(r)
    }

    /// Issue a request the device only answers on failure (or on completion),
    /// fenced by an out of range [`Request::GetAccount`] the device rejects
    /// in any status, to collect any error.
    ///
    /// Fenced requests must carry valid indices. Responses arriving ahead of
    /// the fence are returned.
    async fn send_fenced(
        &self,
        t: &mut BufStream<T>,
        req: &Request,
    ) -> Result<Option<Response>, Error> {
        let fence = Request::GetAccount(GetAccountReq::new(FENCE_INDEX));
        send(&mut *t, &[req, &fence]).await?;

        let mut early = None;

        loop {
            match timeout(self.request_timeout(), recv(&mut *t)).await?? {
                Response::Error(e) if e.code == INVALID_INDEX => return Ok(early),
                Response::Error(e) => {
                    // Collect the fence response
                    match timeout(self.request_timeout(), recv(&mut *t)).await?? {
                        Response::Error(f) if f.code == INVALID_INDEX => (),
                        r => return Err(Error::UnexpectedResponse(r.kind())),
                    }

                    return Err(Error::Device {
                        code: e.code,
                        reason: e.error,
                    });
                }
                r if early.is_none() => early = Some(r),
                r => return Err(Error::UnexpectedResponse(r.kind())),
            }
        }
    }
}

/// Check an account index is in range ahead of fenced requests
fn check_index(index: i32) -> Result<(), Error> {
    match usize::try_from(index) {
        Ok(i) if i < MAX_ACCOUNTS => Ok(()),
        _ => Err(Error::InvalidIndex(index)),
    }
}

/// Write request frames in a single transfer
async fn send<S: AsyncWrite + Unpin>(s: &mut S, reqs: &[&Request]) -> Result<(), Error> {
    let mut buff = Vec::new();

    for r in reqs {
        let f = r.encode()?;

        trace!("TX: {}", String::from_utf8_lossy(&f));

        buff.extend_from_slice(&f);
        buff.push(b'\n');
    }

    s.write_all(&buff).await?;
    s.flush().await?;

    Ok(())
}

/// Read the next response frame, skipping blank and non-frame (log) lines
async fn recv<S: AsyncBufRead + Unpin>(s: &mut S) -> Result<Response, Error> {
    let mut line = Vec::new();

    loop {
        line.clear();

        if s.read_until(b'\n', &mut line).await? == 0 {
            return Err(Error::Closed);
        }

        let f = trim(&line);
        if f.is_empty() {
            continue;
        }

        trace!("RX: {}", String::from_utf8_lossy(f));

        match Response::decode(f) {
            Ok(r) => return Ok(r),
            Err(ProtoError::InvalidEncoding) => {
                debug!("Skipping line: {}", String::from_utf8_lossy(f));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Map device error responses to [`Error::Device`]
fn check(r: Response) -> Result<Response, Error> {
    match r {
        Response::Error(e) => Err(Error::Device {
            code: e.code,
            reason: e.error,
        }),
        r => Ok(r),
    }
}

fn expect_ok(r: Response) -> Result<(), Error> {
    match r {
        Response::Ok => Ok(()),
        r => Err(Error::UnexpectedResponse(r.kind())),
    }
}

fn signature_outcome(r: Response) -> Result<Option<[u8; SIG_LEN]>, Error> {
    match r {
        Response::Signature(s) => Ok(Some(s.signature)),
        Response::SignatureRejected => Ok(None),
        r => Err(Error::UnexpectedResponse(r.kind())),
    }
}

/// Strip the line delimiter (and any carriage return)
fn trim(line: &[u8]) -> &[u8] {
    let mut l = line;
    while let [rest @ .., b'\n' | b'\r'] = l {
        l = rest;
    }
    l
}
