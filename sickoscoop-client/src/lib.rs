pub mod config;
pub mod connectivity;
pub mod engine;
pub mod gateway;
pub mod notice;
pub mod router;
pub mod session;
pub mod store;

use crate::{
    config::Env,
    engine::MutationEngine,
    gateway::{Gateway, GatewayConfig, GatewayError, remote::SocialRemote},
    notice::NoticeBoard,
    router::Router,
    session::{
        context::SessionContext,
        controller::SessionController,
        storage::{SessionPersistence, SessionStorage},
    },
    store::{EntityStore, FeedType},
};
use sickoscoop_common::model::post::Post;
use std::{sync::Arc, time::Duration};

/// One client session: shared state plus the components that act on it.
pub struct Client {
    session: Arc<SessionContext>,
    store: Arc<EntityStore>,
    router: Arc<Router>,
    notices: Arc<NoticeBoard>,
    remote: Arc<dyn SocialRemote>,
    engine: MutationEngine,
    controller: SessionController,
}

impl Client {
    /// A client talking to the backend configured in `env`.
    pub fn new(env: &Env, storage: Arc<dyn SessionStorage>) -> Result<Self, GatewayError> {
        let session = Arc::new(SessionContext::new());
        let persistence = SessionPersistence::new(storage);
        let gateway = Gateway::new(
            GatewayConfig::new(env.api_url.clone()).with_timeout(env.request_timeout()),
            Arc::clone(&session),
            persistence.clone(),
        )?;

        Ok(Self::with_remote(
            session,
            persistence,
            Arc::new(gateway),
            env.notice_ttl(),
        ))
    }

    #[must_use]
    pub fn with_remote(
        session: Arc<SessionContext>,
        persistence: SessionPersistence,
        remote: Arc<dyn SocialRemote>,
        notice_ttl: Duration,
    ) -> Self {
        let store = Arc::new(EntityStore::new());
        let router = Arc::new(Router::new(Arc::clone(&session), Arc::clone(&store)));
        let notices = Arc::new(NoticeBoard::new(notice_ttl));

        let engine = MutationEngine::new(
            Arc::clone(&store),
            Arc::clone(&session),
            Arc::clone(&remote),
        );
        let controller = SessionController::new(
            Arc::clone(&session),
            Arc::clone(&store),
            Arc::clone(&router),
            Arc::clone(&notices),
            persistence,
            Arc::clone(&remote),
        );

        Self {
            session,
            store,
            router,
            notices,
            remote,
            engine,
            controller,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    #[must_use]
    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub async fn probe(&self) -> bool {
        connectivity::probe(self.remote.as_ref(), self.session.connectivity()).await
    }

    pub fn set_feed_type(&self, feed_type: FeedType) {
        self.store.set_feed_type(feed_type);
    }

    /// The current feed for the logged-in user, or the visitor.
    #[must_use]
    pub fn visible_posts(&self) -> Vec<Post> {
        let user_id = self.session.user().map(|user| user.id);
        self.store.visible(user_id.as_ref())
    }
}
