//! WebSocket transport
//!
//! Each connection attempt runs on its own tokio task that owns the socket.
//! The task reports `Opened`, `Message`, `Failed` and finally `Closed` for its
//! epoch on the channel queue. Outbound frames reach it through an unbounded
//! queue; dropping that queue asks the task to close the socket and exit.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};

use super::{ChannelInput, Transport, TransportError, TransportEvent};

/// Transport backed by `tokio-tungstenite`
pub struct WsTransport {
    url: String,
    events: mpsc::UnboundedSender<ChannelInput>,
    /// Writer queue of the live connection task
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl WsTransport {
    /// Create a transport for `url` (`ws://` or `wss://`) reporting to `events`
    pub fn new(url: impl Into<String>, events: mpsc::UnboundedSender<ChannelInput>) -> Self {
        Self {
            url: url.into(),
            events,
            outbound: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WsTransport {
    fn open(&mut self, epoch: u64) {
        self.close();

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);

        let url = self.url.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            run_connection(url, epoch, rx, events).await;
        });
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotOpen)?;
        outbound.send(text).map_err(|_| TransportError::WriterClosed)
    }

    fn close(&mut self) {
        // Dropping the writer queue tells the connection task to shut down
        self.outbound = None;
    }
}

async fn run_connection(
    url: String,
    epoch: u64,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ChannelInput>,
) {
    let emit = |event: TransportEvent| {
        let _ = events.send(ChannelInput::Event(event));
    };

    debug!("🔗 Connecting to {} (epoch {})", url, epoch);

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = outbound.recv() => {
            // Discarded before the handshake finished
            debug!("Connection attempt {} abandoned", epoch);
            emit(TransportEvent::Closed { epoch });
            return;
        }
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            emit(TransportEvent::Failed {
                epoch,
                reason: format!("connect to {} failed: {}", url, e),
            });
            emit(TransportEvent::Closed { epoch });
            return;
        }
    };

    emit(TransportEvent::Opened { epoch });
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        emit(TransportEvent::Failed {
                            epoch,
                            reason: format!("write failed: {}", e),
                        });
                        break;
                    }
                }
                None => {
                    debug!("Closing connection (epoch {})", epoch);
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    trace!("Received frame: {}", text);
                    emit(TransportEvent::Message { epoch, text });
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed connection: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    emit(TransportEvent::Failed {
                        epoch,
                        reason: e.to_string(),
                    });
                    break;
                }
                None => break,
            },
        }
    }

    emit(TransportEvent::Closed { epoch });
}
