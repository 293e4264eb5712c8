//! Subscription streams

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::ClientCommand;
use crate::error::{RpcError, Result};

/// Stream of notifications for one server-side subscription
///
/// Dropping the subscription unsubscribes on the node.
pub struct Subscription {
    id: Value,
    unsubscribe_method: String,
    notifications: mpsc::UnboundedReceiver<Value>,
    command_tx: mpsc::Sender<ClientCommand>,
    unsubscribed: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: Value,
        unsubscribe_method: String,
        notifications: mpsc::UnboundedReceiver<Value>,
        command_tx: mpsc::Sender<ClientCommand>,
    ) -> Self {
        Self {
            id,
            unsubscribe_method,
            notifications,
            command_tx,
            unsubscribed: false,
        }
    }

    /// Subscription id assigned by the node
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Next notification payload; `None` once the connection or subscription closed
    pub async fn next_notification(&mut self) -> Option<Value> {
        self.notifications.recv().await
    }

    /// Next notification decoded into `T`
    pub async fn next_typed<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        let value = self.notifications.recv().await?;
        Some(serde_json::from_value(value).map_err(RpcError::from))
    }

    /// Unsubscribe explicitly
    pub async fn unsubscribe(mut self) -> Result<()> {
        self.unsubscribed = true;
        self.command_tx
            .send(ClientCommand::Unsubscribe {
                id: self.id.clone(),
                method: self.unsubscribe_method.clone(),
            })
            .await
            .map_err(|_| RpcError::Disconnected)
    }
}

impl Stream for Subscription {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.notifications.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.unsubscribed {
            return;
        }
        let command = ClientCommand::Unsubscribe {
            id: self.id.clone(),
            method: self.unsubscribe_method.clone(),
        };
        if self.command_tx.try_send(command).is_err() {
            debug!("Could not unsubscribe {}: connection gone or busy", self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("unsubscribe_method", &self.unsubscribe_method)
            .finish()
    }
}
