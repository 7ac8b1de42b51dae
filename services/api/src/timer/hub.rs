use std::{collections::HashMap, sync::Arc};

use tokio::sync::{
    RwLock,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tracing::debug;
use uuid::Uuid;

use super::{ServerEvent, UserId};

pub type ConnectionId = Uuid;

type Connections = HashMap<UserId, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>;

/// Open real-time connections, addressable one by one or by owner
#[derive(Debug, Clone, Default)]
pub struct ConnectionHub {
    connections: Arc<RwLock<Connections>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `owner` and return its outbound queue
    pub async fn register(&self, owner: UserId) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .entry(owner)
            .or_default()
            .insert(id, tx);
        debug!("Registered connection {} for user {}", id, owner);
        (id, rx)
    }

    pub async fn unregister(&self, owner: UserId, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(owned) = connections.get_mut(&owner) {
            owned.remove(&id);
            if owned.is_empty() {
                connections.remove(&owner);
            }
        }
        debug!("Unregistered connection {} for user {}", id, owner);
    }

    /// Send to one connection. Returns false if it is gone.
    pub async fn emit_to_connection(
        &self,
        owner: UserId,
        id: ConnectionId,
        event: ServerEvent,
    ) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(&owner)
            .and_then(|owned| owned.get(&id))
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Send to every connection of `owner`. Returns how many received it.
    pub async fn emit_to_owner(&self, owner: UserId, event: ServerEvent) -> usize {
        let connections = self.connections.read().await;
        let Some(owned) = connections.get(&owner) else {
            return 0;
        };

        owned
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    pub async fn connection_count(&self, owner: UserId) -> usize {
        self.connections
            .read()
            .await
            .get(&owner)
            .map_or(0, HashMap::len)
    }
}
