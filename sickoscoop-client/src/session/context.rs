use crate::connectivity::Connectivity;
use sickoscoop_common::model::{auth::AuthToken, user::User};
use tokio::sync::watch;

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Session {
    pub token: Option<AuthToken>,
    pub user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn new(token: AuthToken, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum SyncMode {
    Remote,
    LocalOnly,
}

/// The session and connectivity state shared by the gateway, the mutation
/// engine, the router and the controller.
#[derive(Debug)]
pub struct SessionContext {
    session: watch::Sender<Session>,
    connectivity: Connectivity,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: watch::Sender::new(Session::default()),
            connectivity: Connectivity::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        self.session.borrow().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.session.borrow().user.clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.borrow().is_logged_in()
    }

    pub fn set(&self, session: Session) {
        self.session.send_replace(session);
    }

    pub fn refresh_user(&self, user: User) {
        self.session.send_modify(|session| session.user = Some(user));
    }

    pub fn clear(&self) {
        self.session.send_replace(Session::default());
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Mutations only reach the backend with a token and while it is not
    /// known to be unreachable.
    #[must_use]
    pub fn sync_mode(&self) -> SyncMode {
        let has_token = self
            .session
            .borrow()
            .token
            .as_ref()
            .is_some_and(|token| !token.is_empty());

        if has_token && !self.connectivity.is_disconnected() {
            SyncMode::Remote
        } else {
            SyncMode::LocalOnly
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }
}
