use crate::{
    connectivity::{self, ApiStatus},
    gateway::{GatewayError, remote::SocialRemote},
    notice::NoticeBoard,
    router::Router,
    session::{
        context::{Session, SessionContext},
        storage::SessionPersistence,
    },
    store::EntityStore,
};
use sickoscoop_common::model::{
    ModelValidationError,
    auth::{AuthResponse, AuthToken, Credentials, Registration},
    user::User,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error("The server could not be reached. Please try again.")]
    Unreachable,
    #[error("{0}")]
    Credentials(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    fn from_auth(err: GatewayError) -> Self {
        if err.is_auth_rejection() {
            SessionError::Credentials(err.to_string())
        } else if err.is_transport() {
            SessionError::Unreachable
        } else {
            SessionError::Gateway(err)
        }
    }
}

/// A freshly established session. `initial_load` fills the store with the
/// user's posts and conversations in the background.
#[derive(Debug)]
pub struct Established {
    pub user: User,
    pub initial_load: JoinHandle<()>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum RestoreOutcome {
    /// Nothing usable was persisted.
    Absent,
    Verified,
    /// The token could not be verified; the user stays logged in offline.
    Degraded,
    /// The backend rejected the token and the session was torn down.
    Rejected,
}

pub struct SessionController {
    session: Arc<SessionContext>,
    store: Arc<EntityStore>,
    router: Arc<Router>,
    notices: Arc<NoticeBoard>,
    persistence: SessionPersistence,
    remote: Arc<dyn SocialRemote>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        session: Arc<SessionContext>,
        store: Arc<EntityStore>,
        router: Arc<Router>,
        notices: Arc<NoticeBoard>,
        persistence: SessionPersistence,
        remote: Arc<dyn SocialRemote>,
    ) -> Self {
        Self {
            session,
            store,
            router,
            notices,
            persistence,
            remote,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Established, SessionError> {
        let result = self.try_login(&Credentials::new(email, password)).await;
        self.surface(result)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Established, SessionError> {
        let result = self
            .try_register(&Registration::new(username, email, password))
            .await;
        self.surface(result)
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<Established, SessionError> {
        credentials.validate()?;
        self.ensure_reachable().await?;

        let response = self
            .remote
            .login(credentials)
            .await
            .map_err(SessionError::from_auth)?;
        Ok(self.establish(response))
    }

    async fn try_register(&self, registration: &Registration) -> Result<Established, SessionError> {
        registration.validate()?;
        self.ensure_reachable().await?;

        let response = self
            .remote
            .register(registration)
            .await
            .map_err(SessionError::from_auth)?;
        Ok(self.establish(response))
    }

    async fn ensure_reachable(&self) -> Result<(), SessionError> {
        if connectivity::probe(self.remote.as_ref(), self.session.connectivity()).await {
            Ok(())
        } else {
            Err(SessionError::Unreachable)
        }
    }

    fn surface<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(err) = &result {
            warn!(error = %err, "Session request failed");
            self.notices.raise(err.to_string());
        }
        result
    }

    fn establish(&self, response: AuthResponse) -> Established {
        let AuthResponse { token, user } = response;

        self.persistence.save(&token, &user);
        self.session.set(Session::new(token.clone(), user.clone()));
        self.router.navigate("/");
        info!(user_id = %user.id, "Session established");

        // The fresh token goes along explicitly; the load must not depend on
        // reading the session back.
        let session = Arc::clone(&self.session);
        let store = Arc::clone(&self.store);
        let remote = Arc::clone(&self.remote);
        let initial_load = tokio::spawn(async move {
            load_session_data(remote.as_ref(), &session, &store, &token).await;
        });

        Established { user, initial_load }
    }

    /// Marks the persisted user logged in, then verifies the token.
    pub async fn restore_from_persistence(&self) -> RestoreOutcome {
        let Some((token, user)) = self.persistence.load() else {
            debug!("No persisted session");
            return RestoreOutcome::Absent;
        };

        info!(user_id = %user.id, "Restoring persisted session");
        self.session.set(Session::new(token.clone(), user));
        self.router.navigate("/");

        match self.remote.verify(&token).await {
            Ok(user) => {
                self.persistence.save_user(&user);
                self.session.refresh_user(user);
                load_session_data(self.remote.as_ref(), &self.session, &self.store, &token).await;
                RestoreOutcome::Verified
            }
            Err(err) if err.is_auth_rejection() => {
                warn!(error = %err, "Persisted token was rejected");
                self.logout();
                self.notices.raise(SESSION_EXPIRED_MESSAGE);
                RestoreOutcome::Rejected
            }
            Err(err) => {
                warn!(error = %err, "Could not verify persisted session, continuing offline");
                self.session.connectivity().set(ApiStatus::Disconnected);
                RestoreOutcome::Degraded
            }
        }
    }

    /// Fills the store with the public feed for visitors.
    pub async fn load_public_feed(&self) -> Result<usize, SessionError> {
        let result = match self.remote.public_posts().await {
            Ok(posts) => {
                let count = posts.len();
                self.store.replace_posts(posts);
                Ok(count)
            }
            Err(err) => Err(err.into()),
        };
        self.surface(result)
    }

    pub fn logout(&self) {
        self.persistence.clear();
        self.session.clear();
        self.store.clear();
        self.router.reset();
        info!("Logged out");
    }
}

/// Loads posts and conversations with `token`. Results are dropped when the
/// session has moved on to another token in the meantime.
async fn load_session_data(
    remote: &dyn SocialRemote,
    session: &SessionContext,
    store: &EntityStore,
    token: &AuthToken,
) {
    let (posts, chats) = tokio::join!(remote.posts(Some(token)), remote.conversations(Some(token)));

    if session.token().as_ref() != Some(token) {
        debug!("Session changed while loading, discarding results");
        return;
    }

    match posts {
        Ok(posts) => {
            debug!(count = posts.len(), "Loaded posts");
            store.replace_posts(posts);
        }
        Err(err) => report_load_failure("posts", &err),
    }

    match chats {
        Ok(chats) => {
            debug!(count = chats.len(), "Loaded conversations");
            store.replace_chats(chats);
        }
        Err(err) => report_load_failure("conversations", &err),
    }
}

/// A 401 from a data endpoint leaves the session alone. Only the auth
/// endpoints may end it.
fn report_load_failure(resource: &'static str, err: &GatewayError) {
    if err.is_unauthorized() {
        warn!(resource, error = %err, "Token refused while loading, keeping the session");
    } else {
        warn!(resource, error = %err, "Could not load");
    }
}
