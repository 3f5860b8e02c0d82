use tokio::sync::watch;

use super::AuthUser;

/// Who is signed in, for code that gates UI on it.
pub trait AuthProvider: Send + Sync {
    /// Cached answer; never waits on the identity provider.
    fn current_user(&self) -> Option<AuthUser>;

    /// Notified on every login, logout or change of user.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Auth state of one visitor session.
#[derive(Debug)]
pub struct SessionAuth {
    tx: watch::Sender<Option<AuthUser>>,
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuth {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record the user a request authenticated as. Returns whether that
    /// differs from before; subscribers are only woken on a change.
    pub fn update(&self, user: Option<AuthUser>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == user {
                false
            } else {
                *current = user;
                true
            }
        })
    }
}

impl AuthProvider for SessionAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }
}
