// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated command [`Channel`], bridging the device loop to a TCP client

use std::sync::mpsc;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use keychain_core::{device::Channel, engine::Error};
use keychain_proto::MAX_FRAME_LEN;

/// Maximum buffered line length (frame plus `\r\n` delimiter)
const MAX_LINE_LEN: usize = MAX_FRAME_LEN + 2;

/// Device side of the simulated channel
pub struct SimChannel {
    incoming: mpsc::Receiver<Bytes>,
    outgoing: UnboundedSender<Bytes>,
}

/// Host side of the simulated channel
pub struct ChannelHost {
    commands: mpsc::Sender<Bytes>,
    outgoing: UnboundedReceiver<Bytes>,
}

/// Create a connected [`SimChannel`] and [`ChannelHost`] pair
pub fn channel() -> (SimChannel, ChannelHost) {
    let (commands, incoming) = mpsc::channel();
    let (outgoing_tx, outgoing_rx) = unbounded_channel();

    (
        SimChannel {
            incoming,
            outgoing: outgoing_tx,
        },
        ChannelHost {
            commands,
            outgoing: outgoing_rx,
        },
    )
}

impl Channel for SimChannel {
    fn read_frame(&mut self, buff: &mut [u8]) -> Result<Option<usize>, Error> {
        let f = match self.incoming.try_recv() {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };

        if f.len() > buff.len() {
            warn!("Discarding oversized frame ({} bytes)", f.len());
            return Err(Error::MalformedMessage);
        }

        buff[..f.len()].copy_from_slice(&f);

        Ok(Some(f.len()))
    }

    fn write_frame(&mut self, frame: &[u8]) {
        let mut b = BytesMut::with_capacity(frame.len() + 1);
        b.put_slice(frame);
        b.put_u8(b'\n');

        let _ = self.outgoing.send(b.freeze());
    }

    fn write_raw(&mut self, data: &[u8]) {
        let _ = self.outgoing.send(Bytes::copy_from_slice(data));
    }
}

impl ChannelHost {
    /// Fetch a command queue handle, frames are handled as if received from the host
    pub fn commands(&self) -> mpsc::Sender<Bytes> {
        self.commands.clone()
    }

    /// Serve the command channel to TCP clients, one at a time
    pub async fn serve(mut self, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;

            info!("Client connected: {}", addr);

            // Discard output left over from previous clients
            while self.outgoing.try_recv().is_ok() {}

            let (r, mut w) = stream.into_split();
            let mut r = BufReader::new(r);
            let mut line = Vec::new();
            let mut discard = false;

            loop {
                let limit = (MAX_LINE_LEN - line.len()) as u64;
                let mut reader = (&mut r).take(limit);

                tokio::select! {
                    // Forward newline delimited frames to the device
                    n = reader.read_until(b'\n', &mut line) => {
                        match n {
                            Ok(0) => break,
                            Ok(_) => (),
                            Err(e) => {
                                warn!("Read failed: {}", e);
                                break;
                            }
                        }

                        // Overlong lines are truncated (and rejected by the device),
                        // the remainder is dropped up to the next delimiter
                        let overflow = line.len() >= MAX_LINE_LEN && line.last() != Some(&b'\n');

                        if discard {
                            discard = overflow;
                            line.clear();
                            continue;
                        }

                        if overflow {
                            warn!("Truncating oversized line");
                            discard = true;
                        }

                        let f = trim(&line);
                        if !f.is_empty() {
                            debug!("RX: {}", String::from_utf8_lossy(f));
                            self.commands.send(Bytes::copy_from_slice(f))?;
                        }

                        line.clear();
                    }
                    // Forward device output to the client
                    Some(d) = self.outgoing.recv() => {
                        if let Err(e) = w.write_all(&d).await {
                            warn!("Write failed: {}", e);
                            break;
                        }
                    }
                }
            }

            info!("Client disconnected: {}", addr);
        }
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trim_delimiters() {
        assert_eq!(trim(b"{\"type\":6}\r\n"), b"{\"type\":6}");
        assert_eq!(trim(b"\n"), b"");
        assert_eq!(trim(b"abc"), b"abc");
    }

    #[test]
    fn bounded_frames() {
        let (mut c, h) = channel();
        let mut buff = [0u8; 8];

        assert_eq!(c.read_frame(&mut buff), Ok(None));

        h.commands().send(Bytes::from_static(b"0123")).unwrap();
        assert_eq!(c.read_frame(&mut buff), Ok(Some(4)));
        assert_eq!(&buff[..4], b"0123");

        h.commands().send(Bytes::from_static(b"012345678")).unwrap();
        assert_eq!(c.read_frame(&mut buff), Err(Error::MalformedMessage));
    }

    #[test]
    fn frames_delimited() {
        let (mut c, mut h) = channel();

        c.write_frame(b"{\"type\":13}");
        c.write_raw(b"raw");

        assert_eq!(&h.outgoing.try_recv().unwrap()[..], b"{\"type\":13}\n");
        assert_eq!(&h.outgoing.try_recv().unwrap()[..], b"raw");
    }

    #[tokio::test]
    async fn oversized_lines() {
        let (c, h) = channel();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(h.serve(listener));

        let mut s = tokio::net::TcpStream::connect(addr).await.unwrap();

        let mut long = vec![b'a'; 3 * MAX_LINE_LEN];
        long.push(b'\n');
        s.write_all(&long).await.unwrap();
        s.write_all(b"{\"type\":6}\n").await.unwrap();
        s.flush().await.unwrap();

        let frames = tokio::task::spawn_blocking(move || {
            (0..2)
                .map(|_| c.incoming.recv_timeout(std::time::Duration::from_secs(5)).unwrap())
                .collect::<Vec<_>>()
        })
        .await
        .unwrap();

        // Truncated line is forwarded (and rejected by the device) with the tail dropped
        assert_eq!(frames[0].len(), MAX_LINE_LEN);
        assert_eq!(&frames[1][..], b"{\"type\":6}");

        server.abort();
    }
}
