//! Admin notification fan-out
//!
//! `NotificationHub` keeps the open SSE streams of every admin user. Each
//! stream owns a bounded channel; writes never block, and a stream whose
//! channel is closed or full is dropped from the registry on the spot.
//!
//! `Notifier` decides how a broadcast reaches the hubs: directly in process,
//! or through PostgreSQL `LISTEN/NOTIFY` so every server instance re-broadcasts
//! to the streams it holds.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{NotificationConfig, RelayMode};
use crate::error::{AppError, AppResult};
use crate::models::NotificationEvent;

/// Delay before the relay listener reconnects after losing its connection
const RELAY_RECONNECT_DELAY: Duration = Duration::from_secs(5);

struct Connection {
    id: Uuid,
    tx: mpsc::Sender<NotificationEvent>,
}

/// Registry of open notification streams, keyed by user
#[derive(Clone)]
pub struct NotificationHub {
    users: Arc<DashMap<Uuid, Vec<Connection>>>,
    capacity: usize,
}

impl NotificationHub {
    /// `capacity` is the number of events queued per stream before it counts as dead
    pub fn new(capacity: usize) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Open a stream for `user_id`. A `connected` event is queued immediately.
    pub fn register(&self, user_id: Uuid) -> Subscription {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);

        // Capacity is at least one and the receiver is alive
        let _ = tx.try_send(NotificationEvent::connected(connection_id));

        self.users
            .entry(user_id)
            .or_default()
            .push(Connection {
                id: connection_id,
                tx,
            });

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Notification stream opened"
        );

        Subscription {
            user_id,
            connection_id,
            rx,
            hub: self.clone(),
        }
    }

    /// Write `event` to every stream of `user_id`.
    ///
    /// Returns true if at least one stream accepted the event.
    pub fn unicast(&self, user_id: Uuid, event: &NotificationEvent) -> bool {
        let Some(mut connections) = self.users.get_mut(&user_id) else {
            return false;
        };

        let mut delivered = false;
        connections.retain(|connection| match connection.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered = true;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    user_id = %user_id,
                    connection_id = %connection.id,
                    "Dropping notification stream that stopped reading"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection.id,
                    "Dropping closed notification stream"
                );
                false
            }
        });

        let now_empty = connections.is_empty();
        drop(connections);
        if now_empty {
            self.users.remove_if(&user_id, |_, list| list.is_empty());
        }

        delivered
    }

    /// Write `event` to every registered user; returns the number of users reached
    pub fn broadcast(&self, event: &NotificationEvent) -> usize {
        let users: Vec<Uuid> = self.users.iter().map(|entry| *entry.key()).collect();
        let reached = users
            .into_iter()
            .filter(|user_id| self.unicast(*user_id, event))
            .count();

        tracing::debug!(event = event.kind(), reached, "Notification broadcast");
        reached
    }

    /// Forget one stream; the user entry goes once it has no streams left
    pub fn remove(&self, user_id: Uuid, connection_id: Uuid) {
        if let Some(mut connections) = self.users.get_mut(&user_id) {
            connections.retain(|c| c.id != connection_id);
        }
        self.users.remove_if(&user_id, |_, list| list.is_empty());
    }

    pub fn connection_count(&self) -> usize {
        self.users.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn is_registered(&self, user_id: Uuid) -> bool {
        self.users.contains_key(&user_id)
    }
}

/// Receiving end of one registered stream; unregisters itself when dropped
pub struct Subscription {
    user_id: Uuid,
    connection_id: Uuid,
    rx: mpsc::Receiver<NotificationEvent>,
    hub: NotificationHub,
}

impl Subscription {
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Next queued event; `None` once the stream has been dropped from the hub
    pub async fn next_event(&mut self) -> Option<NotificationEvent> {
        self.rx.recv().await
    }

    /// Already queued event, without waiting
    pub fn try_next_event(&mut self) -> Option<NotificationEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving without unregistering, as a disconnected client would
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.remove(self.user_id, self.connection_id);
        tracing::info!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            "Notification stream closed"
        );
    }
}

/// Publishes broadcasts to the hubs according to the configured relay mode
#[derive(Clone)]
pub enum Notifier {
    Local(NotificationHub),
    Postgres {
        hub: NotificationHub,
        db: PgPool,
        channel: String,
    },
}

impl Notifier {
    pub fn local(config: &NotificationConfig) -> Self {
        Notifier::Local(NotificationHub::new(config.channel_capacity))
    }

    /// Build the notifier for `config`; the postgres relay needs a pool
    pub fn from_config(config: &NotificationConfig, db: Option<PgPool>) -> AppResult<Self> {
        let hub = NotificationHub::new(config.channel_capacity);
        match (config.relay, db) {
            (RelayMode::Local, _) => Ok(Notifier::Local(hub)),
            (RelayMode::Postgres, Some(db)) => Ok(Notifier::Postgres {
                hub,
                db,
                channel: config.pg_channel.clone(),
            }),
            (RelayMode::Postgres, None) => Err(AppError::Internal(
                "postgres notification relay requires a database pool".to_string(),
            )),
        }
    }

    /// Hub holding the streams of this instance
    pub fn hub(&self) -> &NotificationHub {
        match self {
            Notifier::Local(hub) | Notifier::Postgres { hub, .. } => hub,
        }
    }

    /// Send `event` to every admin stream
    pub async fn publish(&self, event: &NotificationEvent) -> AppResult<()> {
        match self {
            Notifier::Local(hub) => {
                hub.broadcast(event);
                Ok(())
            }
            Notifier::Postgres { db, channel, .. } => {
                let payload = serde_json::to_string(event)
                    .map_err(|e| AppError::Internal(format!("Failed to encode event: {}", e)))?;
                sqlx::query("SELECT pg_notify($1, $2)")
                    .bind(channel)
                    .bind(payload)
                    .execute(db)
                    .await?;
                tracing::debug!(event = event.kind(), channel = %channel, "Notification relayed");
                Ok(())
            }
        }
    }

    /// Start the task re-broadcasting relayed events to the local hub.
    ///
    /// Returns `None` in local mode.
    pub fn spawn_relay_listener(&self) -> Option<JoinHandle<()>> {
        match self {
            Notifier::Local(_) => None,
            Notifier::Postgres { hub, db, channel } => Some(tokio::spawn(relay_listener(
                hub.clone(),
                db.clone(),
                channel.clone(),
            ))),
        }
    }
}

async fn relay_listener(hub: NotificationHub, db: PgPool, channel: String) {
    loop {
        match listen_once(&hub, &db, &channel).await {
            Ok(()) => tracing::warn!(channel = %channel, "Notification relay stopped"),
            Err(e) => tracing::error!(channel = %channel, error = %e, "Notification relay failed"),
        }
        tokio::time::sleep(RELAY_RECONNECT_DELAY).await;
    }
}

async fn listen_once(hub: &NotificationHub, db: &PgPool, channel: &str) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(db).await?;
    listener.listen(channel).await?;
    tracing::info!(channel = %channel, "Notification relay listening");

    loop {
        let notification = listener.recv().await?;
        match serde_json::from_str::<NotificationEvent>(notification.payload()) {
            Ok(event) => {
                hub.broadcast(&event);
            }
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Ignoring malformed relayed event");
            }
        }
    }
}
