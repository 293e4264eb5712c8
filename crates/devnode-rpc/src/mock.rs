//! In-process mock node for tests
//!
//! [`MockNode`] listens on a local port and answers JSON-RPC over WebSocket
//! with whatever its handler returns. Every request it sees is recorded so
//! tests can assert on what the client sent.

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// What the mock sends back for one request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `{"result": value}`
    Result(Value),
    /// `{"error": {code, message}}`
    Error { code: i64, message: String },
    /// Reply with a subscription id, then push each `(method, result)` notification
    Subscription {
        id: Value,
        notifications: Vec<(String, Value)>,
    },
    /// Never answer
    Silent,
    /// Close the socket instead of answering
    Close,
}

type Handler = Arc<dyn Fn(&str, &Value) -> MockReply + Send + Sync>;

/// A request the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
}

/// Mock WebSocket JSON-RPC node
pub struct MockNode {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MockNode {
    /// Bind on `127.0.0.1:port`; port 0 picks a free one
    pub async fn bind<F>(port: u16, handler: F) -> std::io::Result<Self>
    where
        F: Fn(&str, &Value) -> MockReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handler: Handler = Arc::new(handler);

        let task = tokio::spawn(accept_loop(
            listener,
            handler,
            calls.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            addr,
            calls,
            shutdown_tx,
            task,
        })
    }

    /// Mock answering `system_chain` with `chain` and everything else with `null`
    pub async fn dev_chain(port: u16, chain: &'static str) -> std::io::Result<Self> {
        Self::bind(port, move |method, _| match method {
            "system_chain" => MockReply::Result(json!(chain)),
            _ => MockReply::Result(Value::Null),
        })
        .await
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// All requests received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of requests for `method`
    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }

    /// Stop accepting and drop every open connection
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        let _ = (&mut self.task).await;
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Handler,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut connections = Vec::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Mock node accepted {}", peer);
                    connections.push(tokio::spawn(serve(
                        stream,
                        handler.clone(),
                        calls.clone(),
                    )));
                }
                Err(e) => {
                    debug!("Mock node accept failed: {}", e);
                    break;
                }
            },
            _ = shutdown_rx.changed() => break,
        }
    }
    for connection in connections {
        connection.abort();
    }
}

async fn serve(stream: TcpStream, handler: Handler, calls: Arc<Mutex<Vec<RecordedCall>>>) {
    let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    while let Some(Ok(message)) = socket.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        calls.lock().push(RecordedCall {
            method: method.clone(),
            params: params.clone(),
        });

        let mut outgoing = Vec::new();
        match handler(&method, &params) {
            MockReply::Result(result) => {
                outgoing.push(json!({"jsonrpc": "2.0", "id": id, "result": result}));
            }
            MockReply::Error { code, message } => {
                outgoing.push(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": code, "message": message}
                }));
            }
            MockReply::Subscription { id: sub_id, notifications } => {
                outgoing.push(json!({"jsonrpc": "2.0", "id": id, "result": sub_id}));
                for (method, result) in notifications {
                    outgoing.push(json!({
                        "jsonrpc": "2.0",
                        "method": method,
                        "params": {"subscription": sub_id, "result": result}
                    }));
                }
            }
            MockReply::Silent => {}
            MockReply::Close => {
                let _ = socket.close(None).await;
                return;
            }
        }

        for message in outgoing {
            if socket.send(Message::Text(message.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}
