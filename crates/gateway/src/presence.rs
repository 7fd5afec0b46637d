//! Connection registry and session binding.
//!
//! Tracks every open channel (`conn_id` → write handle) plus the identity
//! bindings created on login. A reverse index keyed by `conn_id` keeps
//! disconnect cleanup O(1).

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

/// Write handle for one live channel. Sends are fire-and-forget: frames
/// are queued on an unbounded channel drained by the connection's write
/// task, so per-recipient delivery order matches enqueue order.
pub type ChannelSender = UnboundedSender<String>;

/// Live channels and their identity bindings.
///
/// Invariants: at most one channel per identity key (a later login for the
/// same cpf silently replaces the earlier binding), and at most one
/// identity per channel (re-login on a channel drops its previous
/// binding).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// conn_id → write handle, for every open socket (anonymous included).
    channels: HashMap<String, ChannelSender>,
    /// cpf → conn_id.
    identities: HashMap<String, String>,
    /// conn_id → cpf (reverse lookup for cleanup on disconnect).
    by_conn: HashMap<String, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened channel (still anonymous).
    pub fn attach(&mut self, conn_id: &str, sender: ChannelSender) {
        self.channels.insert(conn_id.to_string(), sender);
    }

    /// Drop a closed channel and any identity bound to it. Returns the
    /// bound cpf, if there was one. No-op for unknown ids.
    pub fn detach(&mut self, conn_id: &str) -> Option<String> {
        self.channels.remove(conn_id);
        let cpf = self.by_conn.remove(conn_id)?;
        self.identities.remove(&cpf);
        Some(cpf)
    }

    /// Bind an identity to a channel after a successful login.
    ///
    /// Overwrites both directions: a previous channel holding this cpf
    /// loses the binding (without being notified), and a previous cpf
    /// bound to this channel is dropped.
    pub fn bind(&mut self, cpf: &str, conn_id: &str) {
        if let Some(previous_conn) = self.identities.remove(cpf) {
            self.by_conn.remove(&previous_conn);
        }
        if let Some(previous_cpf) = self.by_conn.remove(conn_id) {
            self.identities.remove(&previous_cpf);
        }
        self.identities.insert(cpf.to_string(), conn_id.to_string());
        self.by_conn.insert(conn_id.to_string(), cpf.to_string());
    }

    /// The identity bound to a channel, if it has logged in.
    pub fn identity_of(&self, conn_id: &str) -> Option<&str> {
        self.by_conn.get(conn_id).map(String::as_str)
    }

    /// The live channel for an identity. `None` means offline: the caller
    /// drops the event (no queuing, no delivery guarantee).
    pub fn resolve(&self, cpf: &str) -> Option<&ChannelSender> {
        let conn_id = self.identities.get(cpf)?;
        self.channels.get(conn_id)
    }

    pub fn is_online(&self, cpf: &str) -> bool {
        self.identities.contains_key(cpf)
    }

    /// Push a frame to the channel itself (used for direct replies).
    /// Returns false if the channel is gone or its write task stopped.
    pub fn send_to_conn(&self, conn_id: &str, frame: &str) -> bool {
        self.channels
            .get(conn_id)
            .is_some_and(|sender| sender.send(frame.to_string()).is_ok())
    }

    /// Push a frame to every connected channel, anonymous ones included
    /// (legacy chat compatibility path).
    pub fn broadcast_all(&self, frame: &str) {
        for sender in self.channels.values() {
            let _ = sender.send(frame.to_string());
        }
    }

    /// Number of open channels.
    pub fn count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn attach(registry: &mut ConnectionRegistry, conn_id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.attach(conn_id, tx);
        rx
    }

    #[test]
    fn bind_and_resolve() {
        let mut registry = ConnectionRegistry::new();
        let mut rx = attach(&mut registry, "c1");
        registry.bind("111", "c1");

        assert!(registry.is_online("111"));
        assert_eq!(registry.identity_of("c1"), Some("111"));
        registry
            .resolve("111")
            .expect("channel")
            .send("hello".into())
            .expect("send");
        assert_eq!(rx.try_recv().expect("frame"), "hello");
    }

    #[test]
    fn later_login_replaces_earlier_binding() {
        let mut registry = ConnectionRegistry::new();
        let _rx1 = attach(&mut registry, "c1");
        let _rx2 = attach(&mut registry, "c2");
        registry.bind("111", "c1");
        registry.bind("111", "c2");

        assert_eq!(registry.identity_of("c1"), None);
        assert_eq!(registry.identity_of("c2"), Some("111"));
        // Both sockets stay open; only the binding moved.
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn relogin_on_same_channel_drops_previous_identity() {
        let mut registry = ConnectionRegistry::new();
        let _rx = attach(&mut registry, "c1");
        registry.bind("111", "c1");
        registry.bind("222", "c1");

        assert!(!registry.is_online("111"));
        assert!(registry.is_online("222"));
        assert_eq!(registry.identity_of("c1"), Some("222"));
    }

    #[test]
    fn detach_clears_binding_and_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let _rx = attach(&mut registry, "c1");
        registry.bind("111", "c1");

        assert_eq!(registry.detach("c1").as_deref(), Some("111"));
        assert!(!registry.is_online("111"));
        assert!(registry.resolve("111").is_none());
        assert_eq!(registry.detach("c1"), None);
    }

    #[test]
    fn detach_of_anonymous_channel_returns_none() {
        let mut registry = ConnectionRegistry::new();
        let _rx = attach(&mut registry, "c1");
        assert_eq!(registry.detach("c1"), None);
        assert_eq!(registry.count(), 0);
    }
}
