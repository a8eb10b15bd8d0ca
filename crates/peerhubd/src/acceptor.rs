//! Line-framed TCP acceptor — the reference connection collaborator.
//!
//! Protocol, one frame per line:
//!   1. client sends its peer id
//!   2. client sends `{"to": "<peer>", "body": ...}` frames
//!   3. server writes every payload queued for the peer as one line
//!
//! Closing the socket unregisters the peer. Lines are length-capped: the
//! hello by `max_peer_id_len`, frames by `max_frame_len`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use peerhub_core::config::HubSettings;
use peerhub_core::{validate_peer_id, InboundFrame};
use peerhub_services::{Dispatcher, PeerHandle, Registrar};

/// Room for whitespace around the id on the hello line.
const HELLO_SLACK: usize = 16;

/// How long a departing peer's writer gets to flush before it is aborted.
const WRITER_DRAIN: Duration = Duration::from_secs(5);

type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;

pub struct PeerAcceptor {
    listener: TcpListener,
    registrar: Registrar,
    dispatcher: Dispatcher,
    settings: HubSettings,
    shutdown: broadcast::Receiver<()>,
}

impl PeerAcceptor {
    pub async fn bind(
        addr: &str,
        registrar: Registrar,
        dispatcher: Dispatcher,
        settings: HubSettings,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind peer listener on {addr}"))?;
        Ok(Self {
            listener,
            registrar,
            dispatcher,
            settings,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "peer acceptor listening");
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("peer acceptor shutting down");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(a) => a,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let conn = Connection {
                        registrar: self.registrar.clone(),
                        dispatcher: self.dispatcher.clone(),
                        settings: self.settings.clone(),
                    };
                    tokio::spawn(async move {
                        if let Err(e) = conn.serve(stream, addr).await {
                            tracing::debug!(%addr, error = %e, "connection ended with error");
                        }
                    });
                }
            }
        }
    }
}

struct Connection {
    registrar: Registrar,
    dispatcher: Dispatcher,
    settings: HubSettings,
}

impl Connection {
    async fn serve(self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let hello_limit = self.settings.max_peer_id_len.saturating_add(HELLO_SLACK);
        let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(hello_limit));

        let hello = match lines.next().await {
            None => return Ok(()),
            Some(Ok(line)) => line,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                tracing::warn!(%addr, limit = hello_limit, "hello line too long, rejecting connection");
                let reason = format!("hello line exceeds {hello_limit} bytes");
                return reject(&mut write_half, &reason).await;
            }
            Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
        };
        let peer_id = match validate_peer_id(&hello, self.settings.max_peer_id_len) {
            Ok(id) => id.to_string(),
            Err(e) => {
                tracing::warn!(%addr, error = %e, "rejecting connection");
                return reject(&mut write_half, &e.to_string()).await;
            }
        };
        *lines.decoder_mut() = LinesCodec::new_with_max_length(self.settings.max_frame_len);

        let (handle, outbound) =
            PeerHandle::new(peer_id.clone(), Some(addr), self.settings.outbound_queue);
        self.registrar.submit_register(handle.clone());

        let mut writer = tokio::spawn(write_outbound(outbound, write_half));

        // The writer only finishes once the registry has closed the queue,
        // in which case this peer is already out of the directory.
        let writer_done = tokio::select! {
            _ = self.read_frames(&peer_id, &mut lines) => false,
            _ = &mut writer => true,
        };
        if writer_done {
            return Ok(());
        }

        self.registrar.submit_unregister(handle.clone());
        self.registrar.settled().await;
        // Still open only if a newer registration displaced this handle;
        // no directory entry refers to it any more.
        if handle.close_outbound() {
            tracing::debug!(peer = %peer_id, "closed displaced handle");
        }
        if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
            writer.abort();
        }
        Ok(())
    }

    async fn read_frames(&self, peer_id: &str, lines: &mut LineReader) {
        while let Some(next) = lines.next().await {
            let line = match next {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::warn!(
                        peer = %peer_id,
                        limit = self.settings.max_frame_len,
                        "frame too long, dropping connection"
                    );
                    return;
                }
                Err(LinesCodecError::Io(e)) => {
                    tracing::debug!(peer = %peer_id, error = %e, "read failed");
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match InboundFrame::parse(&line) {
                Ok(frame) => {
                    let outcome = self.dispatcher.send_envelope(peer_id, &frame.to, frame.body);
                    tracing::trace!(from = %peer_id, to = %frame.to, ?outcome, "frame routed");
                }
                Err(e) => {
                    tracing::warn!(peer = %peer_id, error = %e, "malformed frame dropped");
                }
            }
        }
    }
}

async fn reject(write_half: &mut OwnedWriteHalf, reason: &str) -> Result<()> {
    let reply = serde_json::json!({ "error": reason });
    write_half.write_all(format!("{reply}\n").as_bytes()).await?;
    Ok(())
}

/// Copy queued payloads to `sink`, one per line, until the queue is closed.
///
/// After a failed write the remaining payloads are discarded, but the
/// receiver stays alive so senders keep seeing an open queue until the
/// registry closes it.
async fn write_outbound<W>(mut outbound: mpsc::Receiver<Bytes>, mut sink: W)
where
    W: AsyncWrite + Unpin,
{
    let mut broken = false;
    while let Some(payload) = outbound.recv().await {
        if broken {
            continue;
        }
        let written = async {
            sink.write_all(&payload).await?;
            sink.write_all(b"\n").await
        };
        if let Err(e) = written.await {
            tracing::debug!(error = %e, "write failed, discarding further payloads");
            broken = true;
        }
    }
}
