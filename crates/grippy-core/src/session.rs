// Session provider - the one place that knows who is signed in
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::models::Session;

/// Broadcasts the current session to everyone who subscribed.
///
/// Cheap to clone; clones share the same channel. Pass it to whatever needs to
/// read or react to the session instead of reaching for a global.
#[derive(Clone)]
pub struct SessionProvider {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionProvider {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Current session, ignoring one that has already expired
    pub fn active(&self) -> Option<Session> {
        self.current().filter(|s| !s.is_expired())
    }

    pub fn is_authenticated(&self) -> bool {
        self.active().is_some()
    }

    pub fn publish(&self, session: Option<Session>) {
        match &session {
            Some(s) => info!("Signed in as {}", s.email),
            None => info!("Signed out"),
        }
        // send_replace never fails, even with no subscribers
        self.tx.send_replace(session);
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// A live view of the session. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Non-blocking check for an unseen change, for event loops
    pub fn poll_change(&mut self) -> Option<Option<Session>> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}
