//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws`. Every accepted ledger event is
//! pushed into one broadcast channel by a ledger listener; each subscribed
//! client gets a forwarder task that drains the channel through its own
//! [`ClientSubscription`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use ideas_ledger::{SequencedEvent, SharedLedger};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::WsError;
use crate::subscriptions::{ClientMessage, ClientSubscription, ServerMessage};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Shared state: the ledger (for replay) and the live event channel.
pub struct WsState {
    pub ledger: SharedLedger,
    pub events: broadcast::Sender<SequencedEvent>,
}

impl WsState {
    /// Create the channel and register a ledger listener that feeds it.
    pub async fn attach(ledger: SharedLedger, channel_capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(channel_capacity);
        let feed = events.clone();
        ledger
            .subscribe(Box::new(move |event: &SequencedEvent| {
                // No receivers just means no client is connected.
                let _ = feed.send(event.clone());
            }))
            .await;
        Arc::new(Self { ledger, events })
    }
}

/// The WebSocket server, configured with an address and shared state.
pub struct WebSocketServer {
    pub addr: SocketAddr,
    pub state: Arc<WsState>,
}

impl WebSocketServer {
    pub fn new(addr: SocketAddr, state: Arc<WsState>) -> Self {
        Self { addr, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(self.state.clone())
    }

    /// Start listening for WebSocket connections. Runs until the listener fails.
    pub async fn start(&self) -> Result<(), WsError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| WsError::Bind {
                addr: self.addr,
                source,
            })?;
        info!(addr = %self.addr, "WebSocket server listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Bind, then serve on a background task. Returns the bound address.
    pub async fn start_background(&self) -> Result<SocketAddr, WsError> {
        let (bound, _) = self.start_until(std::future::pending::<()>()).await?;
        Ok(bound)
    }

    /// Bind, then serve on a background task until `shutdown` resolves.
    pub async fn start_until<F>(&self, shutdown: F) -> Result<(SocketAddr, JoinHandle<()>), WsError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| WsError::Bind {
                addr: self.addr,
                source,
            })?;
        let bound = listener.local_addr()?;
        let router = self.router();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "WebSocket server stopped");
            }
        });
        info!(addr = %bound, "WebSocket server listening");
        Ok((bound, handle))
    }
}

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
///
/// The flow:
/// 1. Split the socket into sender and receiver halves.
/// 2. Listen for client messages (subscribe, unsubscribe, ping).
/// 3. On subscribe, attach to the broadcast channel, catch the client up
///    from its mark, then spawn a forwarder for live events.
/// 4. Abort the forwarder when the client unsubscribes or disconnects.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));
    let mut forwarder: Option<JoinHandle<()>> = None;

    debug!("websocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "websocket receive error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_text_message(&text, &state, &mut forwarder, &ws_sender).await;
            }
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(data) => {
                let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    if let Some(handle) = forwarder.take() {
        handle.abort();
    }
    debug!("websocket client disconnected");
}

/// Process a text message from the client.
async fn handle_text_message(
    text: &str,
    state: &Arc<WsState>,
    forwarder: &mut Option<JoinHandle<()>>,
    ws_sender: &WsSender,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            send(
                ws_sender,
                &ServerMessage::Error {
                    message: format!("invalid message: {e}"),
                },
            )
            .await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Subscribe { since, filter } => {
            if let Some(handle) = forwarder.take() {
                handle.abort();
            }

            // Attach before reading the log so nothing falls between replay
            // and live delivery; duplicates are dropped by sequence.
            let rx = state.events.subscribe();
            let mark = match since {
                Some(mark) => mark,
                None => state.ledger.high_water_mark().await,
            };
            let mut subscription = ClientSubscription::new(filter, mark);

            send(
                ws_sender,
                &ServerMessage::Ack {
                    action: "subscribe".to_string(),
                },
            )
            .await;
            let replay = state.ledger.events_since(mark).await;
            for message in subscription.catch_up(mark, replay) {
                if !send(ws_sender, &message).await {
                    return;
                }
            }

            let sender = ws_sender.clone();
            let ledger = state.ledger.clone();
            *forwarder = Some(tokio::spawn(async move {
                forward_events(rx, sender, ledger, subscription).await;
            }));
            debug!(mark, "client subscribed");
        }
        ClientMessage::Unsubscribe => {
            let reply = match forwarder.take() {
                Some(handle) => {
                    handle.abort();
                    ServerMessage::Ack {
                        action: "unsubscribe".to_string(),
                    }
                }
                None => ServerMessage::Error {
                    message: "not subscribed".to_string(),
                },
            };
            send(ws_sender, &reply).await;
        }
        ClientMessage::Ping => {
            send(ws_sender, &ServerMessage::Pong).await;
        }
    }
}

/// Forwarder task: reads events from the broadcast receiver and sends the
/// ones the subscription accepts.
async fn forward_events(
    mut rx: broadcast::Receiver<SequencedEvent>,
    ws_sender: WsSender,
    ledger: SharedLedger,
    mut subscription: ClientSubscription,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if subscription.accept(&event) && !send(&ws_sender, &event.into()).await {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "websocket client lagged behind");
                let high_water_mark = ledger.high_water_mark().await;
                subscription.fast_forward(high_water_mark);
                if !send(&ws_sender, &ServerMessage::Resync { high_water_mark }).await {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("event channel closed");
                break;
            }
        }
    }
}

/// Serialize and send one message. Returns false once the client is gone.
async fn send(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to encode websocket message");
            return true;
        }
    };
    ws_sender.lock().await.send(Message::Text(text)).await.is_ok()
}
