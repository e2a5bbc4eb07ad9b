//! Peer registry for relaychat.
//!
//! Maps a phone identifier to the connection currently registered for it.
//! This is the single source of truth for "is this peer reachable now".
//!
//! The registry is generic over the connection handle so the relay can
//! store its outbound channel while tests store plain values.

use std::collections::HashMap;

/// Identifier of one transport connection, unique per relay process.
pub type ConnId = u64;

#[derive(Debug, Clone)]
struct Entry<C> {
    conn_id: ConnId,
    conn: C,
}

/// Phone identifier to live connection.
///
/// At most one connection per phone. A later registration for the same
/// phone silently replaces the earlier one; the displaced connection is
/// not notified.
#[derive(Debug, Clone)]
pub struct PeerRegistry<C> {
    peers: HashMap<String, Entry<C>>,
}

impl<C> PeerRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Bind `phone` to a connection, overwriting any existing binding.
    ///
    /// Returns the connection id that was displaced, if any.
    pub fn register(&mut self, phone: &str, conn_id: ConnId, conn: C) -> Option<ConnId> {
        self.peers
            .insert(phone.to_string(), Entry { conn_id, conn })
            .map(|old| old.conn_id)
    }

    /// The connection registered for `phone`, if any.
    pub fn lookup(&self, phone: &str) -> Option<&C> {
        self.peers.get(phone).map(|e| &e.conn)
    }

    /// Remove `phone` when connection `conn_id` closes.
    ///
    /// No-op if the phone is absent or is now bound to a different
    /// connection (superseded by a later registration). Returns whether an
    /// entry was removed.
    pub fn remove(&mut self, phone: &str, conn_id: ConnId) -> bool {
        match self.peers.get(phone) {
            Some(entry) if entry.conn_id == conn_id => {
                self.peers.remove(phone);
                true
            }
            _ => false,
        }
    }

    /// Whether `phone` currently has a registered connection.
    pub fn is_registered(&self, phone: &str) -> bool {
        self.peers.contains_key(phone)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if no peers are registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl<C> Default for PeerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
