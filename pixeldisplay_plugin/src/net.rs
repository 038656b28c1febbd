use crate::codec;
use crate::error::LinkError;
use crate::protocol::{Channel, InboundMsg, OutboundMsg, Registration};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tungstenite::handshake::{HandshakeError, HandshakeRole};
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;
use url::Url;

const POLL_TIMEOUT: Duration = Duration::from_millis(30);
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Local device-host control socket.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    pub host: String,
    pub port: u16,
}

impl DeviceTarget {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// One I/O thread per connection. Dropping it stops and joins the thread.
pub struct LinkThread {
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LinkThread {
    /// Connects to the device host, registers, then relays events inbound and
    /// queued commands outbound until either side goes away.
    pub fn device(
        target: DeviceTarget,
        registration: Registration,
        in_tx: Sender<InboundMsg>,
        out_rx: Receiver<OutboundMsg>,
    ) -> Result<Self, LinkError> {
        Self::spawn("device-link", move |shutdown| {
            run_device(target, registration, in_tx, out_rx, shutdown)
        })
    }

    /// Subscribes to the board server and relays decoded board messages.
    pub fn feed(url: Url, in_tx: Sender<InboundMsg>) -> Result<Self, LinkError> {
        Self::spawn("feed-link", move |shutdown| run_feed(url, in_tx, shutdown))
    }

    fn spawn<F>(name: &str, run: F) -> Result<Self, LinkError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);

        let join_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(shutdown_for_thread))?;

        Ok(Self {
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut h) = self.join_handle.lock() {
            if let Some(h) = h.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for LinkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_device(
    target: DeviceTarget,
    registration: Registration,
    in_tx: Sender<InboundMsg>,
    out_rx: Receiver<OutboundMsg>,
    shutdown: Arc<AtomicBool>,
) {
    let mut ws = match connect_device(&target, &registration, &shutdown) {
        Ok(ws) => ws,
        Err(e) => {
            let _ = in_tx.send(InboundMsg::Closed {
                channel: Channel::Device,
                reason: e.to_string(),
            });
            return;
        }
    };
    info!(url = %target.url(), "device socket open");
    if in_tx
        .send(InboundMsg::Opened {
            channel: Channel::Device,
        })
        .is_err()
    {
        return;
    }

    let reason = 'conn: loop {
        if shutdown.load(Ordering::Relaxed) {
            let _ = ws.close(None);
            let _ = ws.flush();
            return;
        }

        // Outbound: drain queued commands.
        loop {
            match out_rx.try_recv() {
                Ok(OutboundMsg::Send { cmd }) => match send_json(&mut ws, &cmd) {
                    Ok(()) => {}
                    Err(LinkError::Ws(e)) if is_timeout(&e) => {
                        warn!("device socket write timed out; frame left buffered");
                    }
                    Err(e) => break 'conn e.to_string(),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = ws.close(None);
                    let _ = ws.flush();
                    return;
                }
            }
        }

        // Inbound: at most one message per pass; the read timeout keeps the loop moving.
        match ws.read() {
            Ok(Message::Close(_)) => break "closed by device host".to_string(),
            Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                let event = codec::frame_text(msg).and_then(|text| codec::decode_device(&text));
                match event {
                    Ok(event) => {
                        if in_tx.send(InboundMsg::Device { event }).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, "malformed device message dropped"),
                }
            }
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {}
            Err(tungstenite::Error::ConnectionClosed) => break "connection closed".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    let _ = in_tx.send(InboundMsg::Closed {
        channel: Channel::Device,
        reason,
    });
}

fn connect_device(
    target: &DeviceTarget,
    registration: &Registration,
    shutdown: &AtomicBool,
) -> Result<WebSocket<TcpStream>, LinkError> {
    let stream = connect_tcp(target.host.as_str(), target.port)?;

    let url = target.url();
    let (mut ws, _resp) = drive_handshake(tungstenite::client(url.as_str(), stream), shutdown)?;

    send_json(&mut ws, registration)?;
    debug!(event = %registration.event, "registration sent");
    Ok(ws)
}

fn run_feed(url: Url, in_tx: Sender<InboundMsg>, shutdown: Arc<AtomicBool>) {
    let mut ws = match connect_feed(&url, &shutdown) {
        Ok(ws) => ws,
        Err(e) => {
            let _ = in_tx.send(InboundMsg::Closed {
                channel: Channel::Feed,
                reason: e.to_string(),
            });
            return;
        }
    };
    if in_tx
        .send(InboundMsg::Opened {
            channel: Channel::Feed,
        })
        .is_err()
    {
        return;
    }

    let reason = loop {
        if shutdown.load(Ordering::Relaxed) {
            let _ = ws.close(None);
            let _ = ws.flush();
            return;
        }

        match ws.read() {
            Ok(Message::Close(_)) => break "closed by board server".to_string(),
            Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                match codec::frame_text(msg).and_then(|text| codec::decode_feed(&text)) {
                    Ok(Some(msg)) => {
                        if in_tx.send(InboundMsg::Feed { msg }).is_err() {
                            return;
                        }
                    }
                    Ok(None) => debug!("unhandled board message type ignored"),
                    Err(e) => warn!(error = %e, "malformed board message dropped"),
                }
            }
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {}
            Err(tungstenite::Error::ConnectionClosed) => break "connection closed".to_string(),
            Err(e) => break e.to_string(),
        }
    };

    let _ = in_tx.send(InboundMsg::Closed {
        channel: Channel::Feed,
        reason,
    });
}

fn connect_feed(
    url: &Url,
    shutdown: &AtomicBool,
) -> Result<WebSocket<MaybeTlsStream<TcpStream>>, LinkError> {
    let bad_url = |reason: &str| LinkError::Url {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    let host = url.host_str().ok_or_else(|| bad_url("missing host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| bad_url("missing port"))?;

    let stream = connect_tcp(host, port)?;
    let (ws, _resp) = drive_handshake(tungstenite::client_tls(url.as_str(), stream), shutdown)?;
    Ok(ws)
}

/// Bounded connect; the socket comes back with poll/write timeouts already set
/// so neither the handshake nor later reads can block indefinitely.
fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, LinkError> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                stream.set_read_timeout(Some(POLL_TIMEOUT))?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{host} did not resolve")))
        .into())
}

/// Resumes an interrupted handshake until it completes, fails, times out or
/// the link is asked to stop.
fn drive_handshake<R: HandshakeRole>(
    mut attempt: Result<R::FinalResult, HandshakeError<R>>,
    shutdown: &AtomicBool,
) -> Result<R::FinalResult, LinkError> {
    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    loop {
        match attempt {
            Ok(done) => return Ok(done),
            Err(HandshakeError::Interrupted(mid)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return Err(LinkError::Cancelled);
                }
                if Instant::now() >= deadline {
                    return Err(LinkError::Handshake("timed out".to_string()));
                }
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(e)) => return Err(LinkError::Handshake(e.to_string())),
        }
    }
}

fn send_json<S, T>(ws: &mut WebSocket<S>, value: &T) -> Result<(), LinkError>
where
    S: Read + Write,
    T: Serialize,
{
    let payload = serde_json::to_string(value)?;
    ws.send(Message::Text(payload.into()))?;
    Ok(())
}

fn is_timeout(e: &tungstenite::Error) -> bool {
    matches!(
        e,
        tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock
            || io.kind() == std::io::ErrorKind::TimedOut
    )
}
