//! Client side of the live simulation socket.
//!
//! A `Connection` owns at most one open link. Each link runs three tasks: a
//! reader that dispatches inbound frames, a writer fed by an unbounded
//! channel and a heartbeat that queues `ping` frames. Shared state sits
//! behind a short-lived mutex that is never held across an await or while
//! handlers run.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatcher, Subscription};
use crate::error::{Error, Result};
use crate::models::ConnectionConfig;
use crate::protocol::{
    self, ClientMessage, ControlAction, DISCONNECT_EVENT, ERROR_EVENT, RECONNECTING_EVENT,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type CloseHook = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

struct Link {
    tx: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
    on_close: Option<CloseHook>,
}

struct Shared {
    status: ConnectionStatus,
    last_error: Option<String>,
    link: Option<Link>,
    /// Bumped by every connect attempt and disconnect; stale tasks compare
    /// against it before touching state.
    epoch: u64,
}

#[derive(Clone)]
pub struct Connection {
    config: ConnectionConfig,
    dispatcher: Dispatcher,
    shared: Arc<Mutex<Shared>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(),
            shared: Arc::new(Mutex::new(Shared {
                status: ConnectionStatus::Disconnected,
                last_error: None,
                link: None,
                epoch: 0,
            })),
        }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn is_connected(&self) -> bool {
        self.lock().link.is_some()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn on<F>(&self, event_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.dispatcher.on(event_type, handler)
    }

    pub async fn connect(&self) -> Result<()> {
        self.connect_with(|| {}, || {}).await
    }

    /// Opens the link unless one is open or being opened.
    ///
    /// `on_open` runs once the link is up; `on_close` runs once when it goes
    /// down, whichever side closes it. A `disconnect` issued while the
    /// handshake is in flight wins: the socket is dropped and this returns
    /// `Error::Connect`.
    pub async fn connect_with<O, C>(&self, on_open: O, on_close: C) -> Result<()>
    where
        O: FnOnce(),
        C: FnOnce() + Send + 'static,
    {
        let epoch = {
            let mut shared = self.lock();
            if shared.link.is_some() || shared.status == ConnectionStatus::Connecting {
                debug!(url = %self.config.url, "connect skipped; link already active");
                return Ok(());
            }
            shared.status = ConnectionStatus::Connecting;
            shared.epoch += 1;
            shared.epoch
        };

        info!(url = %self.config.url, "connecting");
        let socket = match connect_async(self.config.url.as_str()).await {
            Ok((socket, _response)) => socket,
            Err(err) => {
                let reason = err.to_string();
                warn!(url = %self.config.url, %reason, "connect failed");
                {
                    let mut shared = self.lock();
                    if shared.epoch == epoch {
                        shared.status = ConnectionStatus::Disconnected;
                    }
                }
                record_error(&self.shared, &self.dispatcher, &reason);
                return Err(Error::Connect {
                    url: self.config.url.clone(),
                    reason,
                });
            }
        };

        let (sink, stream) = socket.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, rx));
        let heartbeat = match self.config.heartbeat_interval_ms {
            0 => None,
            ms => Some(tokio::spawn(heartbeat_loop(
                tx.clone(),
                Duration::from_millis(ms),
            ))),
        };

        {
            let mut shared = self.lock();
            if shared.epoch != epoch {
                debug!(url = %self.config.url, "handshake superseded by disconnect");
                if let Some(heartbeat) = heartbeat {
                    heartbeat.abort();
                }
                let _ = tx.send(Message::Close(None));
                drop(writer);
                return Err(Error::Connect {
                    url: self.config.url.clone(),
                    reason: "superseded by disconnect".to_string(),
                });
            }
            // Spawned with the lock held so the reader's exit path always
            // finds this link installed.
            let reader = tokio::spawn(read_loop(
                stream,
                Arc::downgrade(&self.shared),
                self.dispatcher.clone(),
                epoch,
            ));
            shared.link = Some(Link {
                tx,
                reader,
                heartbeat,
                on_close: Some(Box::new(on_close)),
            });
            shared.status = ConnectionStatus::Connected;
            shared.last_error = None;
        }

        info!(url = %self.config.url, "connected");
        on_open();
        if self.config.request_positions_on_open {
            self.request_positions();
        }
        Ok(())
    }

    /// Closes the link and stops the heartbeat. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let link = {
            let mut shared = self.lock();
            shared.epoch += 1;
            shared.status = ConnectionStatus::Disconnected;
            shared.link.take()
        };
        let Some(link) = link else {
            return;
        };

        info!(url = %self.config.url, "disconnecting");
        close_link(link, &self.dispatcher);
    }

    /// Queues `{type, ...payload}` if the link is open.
    pub fn send(&self, message_type: &str, payload: Map<String, Value>) -> bool {
        self.send_text(protocol::encode(message_type, payload))
    }

    /// Queues an arbitrary JSON value unchanged.
    pub fn send_raw(&self, value: &Value) -> bool {
        self.send_text(value.to_string())
    }

    pub fn send_message(&self, message: &ClientMessage) -> bool {
        self.send(message.message_type(), message.payload())
    }

    pub fn request_positions(&self) -> bool {
        self.send_message(&ClientMessage::RequestPositions)
    }

    pub fn send_event(&self, event_type: &str, rake_id: &str, details: Map<String, Value>) -> bool {
        self.send_message(&ClientMessage::SimulationEvent {
            event_type: event_type.to_string(),
            rake_id: rake_id.to_string(),
            details,
        })
    }

    pub fn control_simulation(&self, action: ControlAction) -> bool {
        self.send_message(&ClientMessage::SimulationControl { action })
    }

    pub fn set_speed(&self, speed: f64) -> bool {
        self.send_raw(&json!({ "action": "set_speed", "speed": speed }))
    }

    /// Display-only status used between reconnect attempts.
    pub(crate) fn mark_reconnecting(&self, attempt: u32) {
        {
            let mut shared = self.lock();
            if shared.link.is_none() {
                shared.status = ConnectionStatus::Reconnecting;
            }
        }
        self.dispatcher
            .notify(RECONNECTING_EVENT, &json!({ "attempt": attempt }));
    }

    /// Queues one frame; a refused send is reported to `error` handlers.
    fn send_text(&self, text: String) -> bool {
        let refused = match &self.lock().link {
            Some(link) => link
                .tx
                .send(Message::Text(text))
                .err()
                .map(|_| "failed to send message: writer stopped"),
            None => Some("failed to send message: link not open"),
        };
        match refused {
            Some(reason) => {
                warn!(url = %self.config.url, reason, "send refused");
                record_error(&self.shared, &self.dispatcher, reason);
                false
            }
            None => true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stores `reason` as the last error and hands it to `error` handlers.
fn record_error(shared: &Mutex<Shared>, dispatcher: &Dispatcher, reason: &str) {
    lock_shared(shared).last_error = Some(reason.to_string());
    dispatcher.notify(ERROR_EVENT, &json!({ "message": reason }));
}

/// Stops the link's tasks, asks the writer to send a close frame and runs
/// the close callbacks.
fn close_link(mut link: Link, dispatcher: &Dispatcher) {
    link.reader.abort();
    if let Some(heartbeat) = link.heartbeat.take() {
        heartbeat.abort();
    }
    let _ = link.tx.send(Message::Close(None));
    dispatcher.notify(DISCONNECT_EVENT, &json!({}));
    if let Some(on_close) = link.on_close.take() {
        on_close();
    }
}

async fn write_loop(
    mut sink: SplitSink<Socket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(err) = sink.send(message).await {
            debug!(%err, "websocket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn heartbeat_loop(tx: mpsc::UnboundedSender<Message>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        if tx.send(Message::Text(ClientMessage::Ping.encode())).is_err() {
            break;
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<Socket>,
    shared: Weak<Mutex<Shared>>,
    dispatcher: Dispatcher,
    epoch: u64,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match dispatcher.dispatch_text(&text) {
                Ok(message_type) if message_type == RECONNECTING_EVENT => {
                    if let Some(shared) = shared.upgrade() {
                        let mut shared = lock_shared(&shared);
                        if shared.epoch == epoch {
                            shared.status = ConnectionStatus::Reconnecting;
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    let reason = err.to_string();
                    warn!(%reason, "dropping inbound frame");
                    if let Some(shared) = shared.upgrade() {
                        record_error(&shared, &dispatcher, &reason);
                    }
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "server closed the link");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                let reason = err.to_string();
                warn!(%reason, "websocket read failed");
                if let Some(shared) = shared.upgrade() {
                    record_error(&shared, &dispatcher, &reason);
                }
                break;
            }
        }
    }

    let Some(shared) = shared.upgrade() else {
        return;
    };
    let link = {
        let mut shared = lock_shared(&shared);
        if shared.epoch != epoch {
            return;
        }
        shared.status = ConnectionStatus::Disconnected;
        shared.link.take()
    };
    if let Some(mut link) = link {
        info!("link closed");
        if let Some(heartbeat) = link.heartbeat.take() {
            heartbeat.abort();
        }
        let _ = link.tx.send(Message::Close(None));
        dispatcher.notify(DISCONNECT_EVENT, &json!({}));
        if let Some(on_close) = link.on_close.take() {
            on_close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Connection {
        Connection::new(ConnectionConfig {
            url: "ws://127.0.0.1:9/ws".to_string(),
            ..ConnectionConfig::default()
        })
    }

    #[test]
    fn send_before_connect_is_refused() {
        let connection = offline();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        connection.on(ERROR_EVENT, move |value| {
            sink.lock().unwrap().push(value.clone());
        });

        assert!(!connection.request_positions());
        assert!(!connection.control_simulation(ControlAction::Pause));
        assert!(!connection.set_speed(2.0));
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            json!({"message": "failed to send message: link not open"})
        );
        assert_eq!(
            connection.last_error().as_deref(),
            Some("failed to send message: link not open")
        );
    }

    #[test]
    fn disconnect_is_idempotent() {
        let connection = offline();
        connection.disconnect();
        connection.disconnect();
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn failed_connect_reports_error() {
        let connection = offline();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        connection.on(ERROR_EVENT, move |value| {
            sink.lock().unwrap().push(value.clone());
        });

        let result = connection.connect().await;

        assert!(matches!(result, Err(Error::Connect { .. })));
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert!(connection.last_error().is_some());
        assert_eq!(errors.lock().unwrap().len(), 1);
    }
}
