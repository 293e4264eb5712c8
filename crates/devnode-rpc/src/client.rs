//! WebSocket JSON-RPC client
//!
//! [`RpcClient::connect`] opens the socket and spawns a connection service
//! task that owns it. The returned [`RpcClient`] is a cheap handle that talks
//! to the service over a command channel; responses come back on oneshot
//! channels and subscription notifications on per-subscription streams.

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{RpcError, Result};
use crate::event::ClientEvent;
use crate::message::{parse_incoming, subscription_key, Incoming, Request};
use crate::subscription::Subscription;
use crate::types::TypeRegistry;

/// Default timeout for a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Options for [`RpcClient::connect`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:9944`
    pub url: String,
    /// Custom wire-type hints for the chain
    pub types: TypeRegistry,
    /// Timeout for the handshake and for each request
    pub request_timeout: Duration,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            types: TypeRegistry::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Commands sent to the connection service
#[derive(Debug)]
pub(crate) enum ClientCommand {
    /// Plain request
    Request {
        method: String,
        params: Value,
        response: oneshot::Sender<Result<Value>>,
    },
    /// Open a subscription
    Subscribe {
        method: String,
        params: Value,
        response: oneshot::Sender<Result<(Value, mpsc::UnboundedReceiver<Value>)>>,
    },
    /// Close a subscription; the node's answer is discarded
    Unsubscribe { id: Value, method: String },
    /// Close the socket
    Disconnect { done: oneshot::Sender<()> },
}

/// Handle for talking to a node
#[derive(Clone)]
pub struct RpcClient {
    command_tx: mpsc::Sender<ClientCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
    connected: Arc<AtomicBool>,
    url: Arc<str>,
    types: Arc<TypeRegistry>,
    request_timeout: Duration,
}

impl RpcClient {
    /// Connect to a node and start the connection service
    pub async fn connect(options: ClientOptions) -> Result<Self> {
        let ClientOptions {
            url,
            types,
            request_timeout,
        } = options;

        let connect = tokio_tungstenite::connect_async(url.as_str());
        let (socket, _response) = tokio::time::timeout(request_timeout, connect)
            .await
            .map_err(|_| RpcError::Connect {
                url: url.clone(),
                reason: format!("handshake timed out after {:?}", request_timeout),
            })?
            .map_err(|e| RpcError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        info!("Connected to {}", url);

        let (command_tx, command_rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);
        let connected = Arc::new(AtomicBool::new(true));

        let service = ConnectionService {
            socket,
            command_rx,
            event_tx: event_tx.clone(),
            connected: connected.clone(),
            next_id: 1,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
        };
        tokio::spawn(service.run());

        let _ = event_tx.send(ClientEvent::Connected { url: url.clone() });

        Ok(Self {
            command_tx,
            event_tx,
            connected,
            url: url.into(),
            types: Arc::new(types),
            request_timeout,
        })
    }

    /// Endpoint this client is connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wire-type hints supplied at construction
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Whether the socket is still open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Subscribe to connection events
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Send a request and wait for its result
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(ClientCommand::Request {
                method: method.to_string(),
                params,
                response: tx,
            })
            .await
            .map_err(|_| RpcError::Disconnected)?;

        self.await_response(method, rx).await
    }

    /// Send a request and decode its result
    pub async fn request_typed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }

    /// Open a subscription; `unsubscribe_method` is called when it is dropped
    pub async fn subscribe(
        &self,
        method: &str,
        params: Value,
        unsubscribe_method: &str,
    ) -> Result<Subscription> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(ClientCommand::Subscribe {
                method: method.to_string(),
                params,
                response: tx,
            })
            .await
            .map_err(|_| RpcError::Disconnected)?;

        let (id, notifications) = self.await_response(method, rx).await?;
        Ok(Subscription::new(
            id,
            unsubscribe_method.to_string(),
            notifications,
            self.command_tx.clone(),
        ))
    }

    /// Close the connection
    ///
    /// Pending requests fail with [`RpcError::Disconnected`]. Calling this on
    /// an already closed client does nothing.
    pub async fn disconnect(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self
            .command_tx
            .send(ClientCommand::Disconnect { done: tx })
            .await
            .is_err()
        {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    async fn await_response<T>(&self, method: &str, rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Disconnected),
            Err(_) => Err(RpcError::Timeout {
                method: method.to_string(),
                duration_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// What to do with the response to a request id
enum Pending {
    Call(oneshot::Sender<Result<Value>>),
    Subscribe(oneshot::Sender<Result<(Value, mpsc::UnboundedReceiver<Value>)>>),
    Discard,
}

impl Pending {
    fn fail(self, err: RpcError) {
        match self {
            Pending::Call(tx) => {
                let _ = tx.send(Err(err));
            }
            Pending::Subscribe(tx) => {
                let _ = tx.send(Err(err));
            }
            Pending::Discard => {}
        }
    }
}

/// Owns the socket; runs until disconnected or all handles are dropped
struct ConnectionService {
    socket: WsStream,
    command_rx: mpsc::Receiver<ClientCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
    connected: Arc<AtomicBool>,
    next_id: u64,
    pending: HashMap<u64, Pending>,
    subscriptions: HashMap<String, mpsc::UnboundedSender<Value>>,
}

impl ConnectionService {
    async fn run(mut self) {
        let mut done: Option<oneshot::Sender<()>> = None;

        let reason = loop {
            tokio::select! {
                message = self.socket.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => self.handle_text(&text),
                        Err(_) => warn!("Ignoring non UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break Some(format!("closed by node: {:?}", frame));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break Some("stream ended".to_string()),
                },

                command = self.command_rx.recv() => match command {
                    Some(ClientCommand::Disconnect { done: tx }) => {
                        done = Some(tx);
                        break None;
                    }
                    Some(command) => {
                        if let Err(e) = self.handle_command(command).await {
                            break Some(e.to_string());
                        }
                    }
                    // every handle is gone
                    None => break None,
                },
            }
        };

        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.socket.close(None).await {
            debug!("Error closing socket: {}", e);
        }

        for (_, pending) in self.pending.drain() {
            pending.fail(RpcError::Disconnected);
        }
        self.subscriptions.clear();

        match &reason {
            Some(reason) => warn!("Connection lost: {}", reason),
            None => info!("Connection closed"),
        }
        let _ = self.event_tx.send(ClientEvent::Disconnected { reason });

        if let Some(tx) = done {
            let _ = tx.send(());
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::Request {
                method,
                params,
                response,
            } => self.send_request(&method, &params, Pending::Call(response)).await,
            ClientCommand::Subscribe {
                method,
                params,
                response,
            } => {
                self.send_request(&method, &params, Pending::Subscribe(response))
                    .await
            }
            ClientCommand::Unsubscribe { id, method } => {
                self.subscriptions.remove(&subscription_key(&id));
                let params = Value::Array(vec![id]);
                self.send_request(&method, &params, Pending::Discard).await
            }
            // handled by the run loop
            ClientCommand::Disconnect { done } => {
                let _ = done.send(());
                Ok(())
            }
        }
    }

    async fn send_request(&mut self, method: &str, params: &Value, pending: Pending) -> Result<()> {
        let id = self.next_id;
        self.next_id += 1;

        let payload = serde_json::to_string(&Request::new(id, method, params))?;
        debug!(id, method, "Sending request");

        self.pending.insert(id, pending);
        if let Err(e) = self.socket.send(Message::Text(payload.into())).await {
            if let Some(pending) = self.pending.remove(&id) {
                pending.fail(RpcError::Transport(e.to_string()));
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring malformed message: {} - raw: {}", e, text);
                return;
            }
        };

        let messages = match value {
            Value::Array(batch) => batch,
            single => vec![single],
        };

        for message in messages {
            match parse_incoming(message) {
                Ok(incoming) => self.dispatch(incoming),
                Err(e) => warn!("Ignoring message: {}", e),
            }
        }
    }

    fn dispatch(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::Response { id, result } => {
                let Some(pending) = self.pending.remove(&id) else {
                    debug!(id, "Response for unknown request");
                    return;
                };
                match pending {
                    Pending::Call(tx) => {
                        let _ = tx.send(result.map_err(RpcError::from));
                    }
                    Pending::Subscribe(tx) => {
                        let reply = result.map_err(RpcError::from).map(|sub_id| {
                            let (notify_tx, notify_rx) = mpsc::unbounded_channel();
                            self.subscriptions
                                .insert(subscription_key(&sub_id), notify_tx);
                            debug!("Subscription {} opened", sub_id);
                            (sub_id, notify_rx)
                        });
                        let _ = tx.send(reply);
                    }
                    Pending::Discard => {}
                }
            }

            Incoming::Notification {
                method,
                subscription,
                result,
            } => match self.subscriptions.get(&subscription) {
                Some(tx) => {
                    if tx.send(result).is_err() {
                        self.subscriptions.remove(&subscription);
                    }
                }
                None => debug!(%method, %subscription, "Notification for unknown subscription"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockReply};
    use crate::substrate::TransactionStatus;
    use serde_json::json;

    async fn connect(node: &MockNode) -> RpcClient {
        RpcClient::connect(ClientOptions::new(node.url()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_response() {
        let node = MockNode::dev_chain(0, "Acala Mandala Dev").await.unwrap();
        let client = connect(&node).await;

        assert!(client.is_connected());
        assert_eq!(client.system_chain().await.unwrap(), "Acala Mandala Dev");
        assert_eq!(node.count("system_chain"), 1);

        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_correlated() {
        let node = MockNode::bind(0, |method, params| {
            MockReply::Result(json!({"method": method, "echo": params}))
        })
        .await
        .unwrap();
        let client = connect(&node).await;

        let (a, b) = tokio::join!(
            client.request("first", json!([1])),
            client.request("second", json!([2]))
        );
        assert_eq!(a.unwrap(), json!({"method": "first", "echo": [1]}));
        assert_eq!(b.unwrap(), json!({"method": "second", "echo": [2]}));
    }

    #[tokio::test]
    async fn test_rpc_error() {
        let node = MockNode::bind(0, |_, _| MockReply::Error {
            code: -32603,
            message: "execution fatal".into(),
        })
        .await
        .unwrap();
        let client = connect(&node).await;

        let err = client.request("eth_call", json!([])).await.unwrap_err();
        assert_eq!(err.rpc_code(), Some(-32603));
        assert_eq!(err.to_string(), "-32603: execution fatal");
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let node = MockNode::bind(0, |_, _| MockReply::Silent).await.unwrap();
        let options = ClientOptions::new(node.url()).with_request_timeout(Duration::from_millis(200));
        let client = RpcClient::connect(options).await.unwrap();

        let err = client.request("system_chain", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout { duration_ms: 200, .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = RpcClient::connect(ClientOptions::new(format!("ws://127.0.0.1:{}", port)))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Connect { .. }));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_subscription_notifications_and_unsubscribe_on_drop() {
        let hash = format!("0x{}", "ab".repeat(32));
        let in_block = json!({ "inBlock": hash });
        let node = MockNode::bind(0, move |method, _| match method {
            "author_submitAndWatchExtrinsic" => MockReply::Subscription {
                id: json!("sub-1"),
                notifications: vec![
                    ("author_extrinsicUpdate".into(), json!("ready")),
                    ("author_extrinsicUpdate".into(), in_block.clone()),
                ],
            },
            _ => MockReply::Result(json!(true)),
        })
        .await
        .unwrap();
        let client = connect(&node).await;

        let mut sub = client
            .submit_and_watch_extrinsic(&crate::eth::Bytes(vec![0x01]))
            .await
            .unwrap();
        assert_eq!(sub.id(), &json!("sub-1"));

        let first: TransactionStatus = sub.next_typed().await.unwrap().unwrap();
        assert_eq!(first, TransactionStatus::Ready);
        let second: TransactionStatus = sub.next_typed().await.unwrap().unwrap();
        assert!(matches!(second, TransactionStatus::InBlock(_)));

        drop(sub);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while node.count("author_unwatchExtrinsic") == 0 {
            assert!(tokio::time::Instant::now() < deadline, "unsubscribe never sent");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let unwatch = node
            .calls()
            .into_iter()
            .find(|c| c.method == "author_unwatchExtrinsic")
            .unwrap();
        assert_eq!(unwatch.params, json!(["sub-1"]));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_broadcasts() {
        let node = MockNode::dev_chain(0, "dev").await.unwrap();
        let client = connect(&node).await;
        let mut events = client.events();

        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Disconnected { reason: None }
        );

        client.disconnect().await.unwrap();
        let err = client.request("system_chain", json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Disconnected));
    }

    #[tokio::test]
    async fn test_server_close_fails_pending_request() {
        let node = MockNode::bind(0, |_, _| MockReply::Close).await.unwrap();
        let client = connect(&node).await;
        let mut events = client.events();

        let err = client.request("system_chain", json!([])).await.unwrap_err();
        assert!(err.is_connection_error());

        let event = events.recv().await.unwrap();
        assert!(event.is_disconnect());
        assert!(!client.is_connected());
    }
}
