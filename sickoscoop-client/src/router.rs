//! Maps paths to a view and, for post detail, a focused post.
//!
//! Only the focused post's id is kept here. The post itself is looked up in
//! the entity store on every read, so the detail view never shows a stale copy.

use crate::{session::context::SessionContext, store::EntityStore};
use sickoscoop_common::model::post::{Post, PostId};
use std::{
    fmt::{self, Display, Formatter},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum View {
    #[default]
    Landing,
    Feed,
    Profile,
    Chat,
    PostDetail,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Route {
    Feed,
    Profile,
    Chat,
    Post(PostId),
}

impl Route {
    /// Unknown paths map to the feed.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());

        match (segments.next(), segments.next(), segments.next()) {
            (Some("profile"), None, _) => Route::Profile,
            (Some("chat"), None, _) => Route::Chat,
            (Some("post"), Some(id), None) => Route::Post(id.into()),
            _ => Route::Feed,
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Route::Feed => write!(f, "/"),
            Route::Profile => write!(f, "/profile"),
            Route::Chat => write!(f, "/chat"),
            Route::Post(post_id) => write!(f, "/post/{post_id}"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct RouteState {
    pub view: View,
    pub focused: Option<PostId>,
}

#[derive(Debug, Default)]
struct History {
    entries: Vec<Route>,
    position: usize,
    state: RouteState,
}

#[derive(Debug)]
pub struct Router {
    session: Arc<SessionContext>,
    store: Arc<EntityStore>,
    history: Mutex<History>,
}

impl Router {
    #[must_use]
    pub fn new(session: Arc<SessionContext>, store: Arc<EntityStore>) -> Self {
        Self {
            session,
            store,
            history: Mutex::new(History::default()),
        }
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `route` against the session and the store. A post that is
    /// not in the store resolves to the feed.
    fn resolve(&self, route: &Route) -> (Route, RouteState) {
        if !self.session.is_logged_in() {
            return (route.clone(), RouteState::default());
        }

        let view = match route {
            Route::Feed => View::Feed,
            Route::Profile => View::Profile,
            Route::Chat => View::Chat,
            Route::Post(post_id) if self.store.contains_post(post_id) => {
                return (
                    route.clone(),
                    RouteState {
                        view: View::PostDetail,
                        focused: Some(post_id.clone()),
                    },
                );
            }
            Route::Post(post_id) => {
                debug!(%post_id, "Post not found, falling back to the feed");
                return (
                    Route::Feed,
                    RouteState {
                        view: View::Feed,
                        focused: None,
                    },
                );
            }
        };

        (route.clone(), RouteState {
            view,
            focused: None,
        })
    }

    #[must_use]
    pub fn current(&self) -> RouteState {
        self.history().state.clone()
    }

    /// Pushes `path` onto the history, dropping any forward entries.
    pub fn navigate(&self, path: &str) -> RouteState {
        let (route, state) = self.resolve(&Route::parse(path));
        debug!(path, %route, view = ?state.view, "Navigating");

        let mut history = self.history();
        if !history.entries.is_empty() {
            let keep = history.position + 1;
            history.entries.truncate(keep);
        }
        history.entries.push(route);
        history.position = history.entries.len() - 1;
        history.state = state.clone();
        state
    }

    /// `None` when there is no earlier entry.
    pub fn back(&self) -> Option<RouteState> {
        let mut history = self.history();
        let position = history.position.checked_sub(1)?;
        self.replay(&mut history, position)
    }

    /// `None` when there is no later entry.
    pub fn forward(&self) -> Option<RouteState> {
        let mut history = self.history();
        let position = history.position + 1;
        self.replay(&mut history, position)
    }

    fn replay(&self, history: &mut History, position: usize) -> Option<RouteState> {
        let route = history.entries.get(position)?.clone();
        let (_, state) = self.resolve(&route);
        history.position = position;
        history.state = state.clone();
        Some(state)
    }

    /// Back to the landing view with no history and nothing focused.
    pub fn reset(&self) {
        *self.history() = History::default();
    }

    #[must_use]
    pub fn focused_post(&self) -> Option<Post> {
        let focused = self.history().state.focused.clone()?;
        self.store.post(&focused)
    }
}
