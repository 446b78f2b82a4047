use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

use net::ProtocolState;
use tokio::sync::Notify;

use crate::{logging::ServerLogger, metrics::RegistryMetrics, telemetry::get_meter};

/// Stable key for a registry entry. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Published view of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub address: SocketAddr,
    pub state: ProtocolState,
    pub connected_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}

/// Every live connection, guarded by one mutex.
///
/// The lock is never held across an await point. Handlers keep their own
/// protocol state and publish transitions here; aggregate queries read only
/// from the locked map.
#[derive(Debug)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionId, ConnectionRecord>>,
    next_id: AtomicU64,
    drained: Notify,
    metrics: RegistryMetrics,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            drained: Notify::new(),
            metrics: RegistryMetrics::new(&get_meter()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionRecord>> {
        // entries stay consistent even if a holder panicked: every critical
        // section is a single map operation
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new connection in the `Handshaking` state.
    pub fn insert(self: &Arc<Self>, address: SocketAddr) -> ConnectionHandle {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = ConnectionRecord {
            address,
            state: ProtocolState::Handshaking,
            connected_at: Instant::now(),
        };
        let total = {
            let mut entries = self.lock();
            entries.insert(id, record);
            entries.len()
        };
        self.metrics.record_connections_active(total as u64);

        ConnectionHandle {
            registry: Arc::clone(self),
            id,
        }
    }

    pub fn remove(&self, id: ConnectionId) -> Result<ConnectionRecord, RegistryError> {
        let (record, total) = {
            let mut entries = self.lock();
            let record = entries
                .remove(&id)
                .ok_or(RegistryError::UnknownConnection(id))?;
            (record, entries.len())
        };
        self.metrics.record_connections_active(total as u64);
        if total == 0 {
            self.drained.notify_waiters();
        }
        Ok(record)
    }

    pub fn set_state(&self, id: ConnectionId, state: ProtocolState) -> Result<(), RegistryError> {
        let mut entries = self.lock();
        let record = entries
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        record.state = state;
        Ok(())
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        self.lock().get(&id).copied()
    }

    pub fn count_in_state(&self, state: ProtocolState) -> usize {
        self.lock()
            .values()
            .filter(|record| record.state == state)
            .count()
    }

    /// Connections that have reached `Play`.
    pub fn online_players(&self) -> usize {
        self.count_in_state(ProtocolState::Play)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<(ConnectionId, ConnectionRecord)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, record)| (*id, *record))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Resolves once no connection is registered.
    pub async fn wait_empty(&self) {
        loop {
            let notified = self.drained.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// Exclusive owner of one registry entry; dropping it deregisters the
/// connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> Option<ProtocolState> {
        self.registry.get(self.id).map(|record| record.state)
    }

    pub fn set_state(&self, state: ProtocolState) -> Result<(), RegistryError> {
        self.registry.set_state(self.id, state)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Err(err) = self.registry.remove(self.id) {
            ServerLogger::registry_inconsistent(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::error::ConnectionError;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn insert_starts_in_handshaking() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handle = registry.insert(addr(1000));
        assert_eq!(handle.state(), Some(ProtocolState::Handshaking));
        assert_eq!(registry.get(handle.id()).unwrap().address, addr(1000));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dropping_handle_deregisters() {
        let registry = Arc::new(ConnectionRegistry::new());
        let first = registry.insert(addr(1000));
        let second = registry.insert(addr(1001));
        let first_id = first.id();
        assert_ne!(first_id, second.id());

        drop(first);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(first_id).is_none());
        assert_eq!(registry.snapshot()[0].0, second.id());

        drop(second);
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_unknown_id_is_an_error() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handle = registry.insert(addr(1000));
        let id = handle.id();
        drop(handle);

        assert_eq!(registry.remove(id), Err(RegistryError::UnknownConnection(id)));
        assert_eq!(
            registry.set_state(id, ProtocolState::Play),
            Err(RegistryError::UnknownConnection(id))
        );
    }

    #[test]
    fn stale_handle_state_change_fails_the_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handle = registry.insert(addr(1000));
        let id = handle.id();
        registry.remove(id).unwrap();

        let err = ConnectionError::from(handle.set_state(ProtocolState::Status).unwrap_err());
        assert!(matches!(
            err,
            ConnectionError::Registry(RegistryError::UnknownConnection(stale)) if stale == id
        ));
        assert_eq!(err.kind(), "registry");
        std::mem::forget(handle);
    }

    #[test]
    fn online_players_counts_play_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let status = registry.insert(addr(1000));
        let player = registry.insert(addr(1001));
        let other = registry.insert(addr(1002));

        status.set_state(ProtocolState::Status).unwrap();
        player.set_state(ProtocolState::Play).unwrap();
        other.set_state(ProtocolState::Play).unwrap();
        assert_eq!(registry.online_players(), 2);
        assert_eq!(registry.count_in_state(ProtocolState::Status), 1);

        drop(other);
        assert_eq!(registry.online_players(), 1);
    }

    #[test]
    fn concurrent_inserts_and_removes() {
        let registry = Arc::new(ConnectionRegistry::new());
        let workers: Vec<_> = (0..8u16)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for i in 0..200u16 {
                        let handle = registry.insert(addr(worker * 1000 + i));
                        handle.set_state(ProtocolState::Play).unwrap();
                        ids.push(handle.id());
                        if i % 2 == 0 {
                            drop(handle);
                        } else {
                            std::mem::forget(handle);
                        }
                    }
                    ids
                })
            })
            .collect();

        let mut ids: Vec<ConnectionId> = workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);

        assert_eq!(registry.len(), 8 * 100);
        assert_eq!(registry.online_players(), 8 * 100);
    }

    #[tokio::test]
    async fn wait_empty_resolves_after_last_drop() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry.wait_empty().await;

        let handle = registry.insert(addr(1000));
        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_empty().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
