//! Canonical in-memory collections for the session, plus the feed projection
//! derived from them.
//!
//! Collections are replaced copy-on-write on every change, so a reader holding
//! a [`StoreState`] snapshot never observes a half-applied mutation.

use sickoscoop_common::model::{
    chat::{Conversation, ConversationId},
    post::{Post, PostId},
    user::UserId,
};
use std::{cmp::Reverse, sync::Arc};
use tokio::sync::watch;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum FeedType {
    #[default]
    Public,
    Personal,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct StoreState {
    pub posts: Arc<Vec<Post>>,
    pub chats: Arc<Vec<Conversation>>,
    pub feed_type: FeedType,
}

/// The posts a feed shows, computed fresh from the canonical collection.
///
/// `Public` keeps the canonical order. `Personal` keeps only the current
/// user's posts, newest first; without a user it is empty.
#[must_use]
pub fn derive_visible(
    posts: &[Post],
    feed_type: FeedType,
    current_user: Option<&UserId>,
) -> Vec<Post> {
    match feed_type {
        FeedType::Public => posts.to_vec(),
        FeedType::Personal => {
            let Some(user_id) = current_user else {
                return Vec::new();
            };

            let mut own: Vec<Post> = posts
                .iter()
                .filter(|post| &post.author.id == user_id)
                .cloned()
                .collect();
            own.sort_by_key(|post| Reverse(post.created_at));
            own
        }
    }
}

#[derive(Debug)]
pub struct EntityStore {
    state: watch::Sender<StoreState>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(StoreState::default()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn posts(&self) -> Arc<Vec<Post>> {
        Arc::clone(&self.state.borrow().posts)
    }

    #[must_use]
    pub fn post(&self, post_id: &PostId) -> Option<Post> {
        self.state
            .borrow()
            .posts
            .iter()
            .find(|post| &post.id == post_id)
            .cloned()
    }

    #[must_use]
    pub fn contains_post(&self, post_id: &PostId) -> bool {
        self.state
            .borrow()
            .posts
            .iter()
            .any(|post| &post.id == post_id)
    }

    #[must_use]
    pub fn chats(&self) -> Arc<Vec<Conversation>> {
        Arc::clone(&self.state.borrow().chats)
    }

    #[must_use]
    pub fn feed_type(&self) -> FeedType {
        self.state.borrow().feed_type
    }

    #[must_use]
    pub fn visible(&self, current_user: Option<&UserId>) -> Vec<Post> {
        let state = self.state.borrow();
        derive_visible(&state.posts, state.feed_type, current_user)
    }

    pub fn replace_posts(&self, posts: Vec<Post>) {
        self.state.send_modify(|state| state.posts = Arc::new(posts));
    }

    pub fn replace_chats(&self, chats: Vec<Conversation>) {
        self.state.send_modify(|state| state.chats = Arc::new(chats));
    }

    pub fn prepend_post(&self, post: Post) {
        self.state.send_modify(|state| {
            Arc::make_mut(&mut state.posts).insert(0, post);
        });
    }

    /// Applies `f` to a copy of the post and publishes the new collection.
    /// Returns `None` when no post has that id.
    pub fn update_post<R>(&self, post_id: &PostId, f: impl FnOnce(&mut Post) -> R) -> Option<R> {
        let mut result = None;
        self.state.send_if_modified(|state| {
            let Some(index) = state.posts.iter().position(|post| &post.id == post_id) else {
                return false;
            };
            result = Some(f(&mut Arc::make_mut(&mut state.posts)[index]));
            true
        });
        result
    }

    pub fn update_chat<R>(
        &self,
        conversation_id: &ConversationId,
        f: impl FnOnce(&mut Conversation) -> R,
    ) -> Option<R> {
        let mut result = None;
        self.state.send_if_modified(|state| {
            let Some(index) = state
                .chats
                .iter()
                .position(|chat| &chat.id == conversation_id)
            else {
                return false;
            };
            result = Some(f(&mut Arc::make_mut(&mut state.chats)[index]));
            true
        });
        result
    }

    pub fn set_feed_type(&self, feed_type: FeedType) {
        self.state.send_if_modified(|state| {
            let changed = state.feed_type != feed_type;
            state.feed_type = feed_type;
            changed
        });
    }

    /// Empties both collections and returns to the public feed.
    pub fn clear(&self) {
        self.state.send_replace(StoreState::default());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::store::{EntityStore, FeedType, derive_visible};
    use sickoscoop_common::model::{
        post::{LikeSet, Post},
        user::{UserHandle, UserId, UserSummary},
    };
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime, macros::datetime};

    pub(crate) fn author(id: &str) -> UserSummary {
        UserSummary {
            id: id.into(),
            username: UserHandle::new(format!("user-{id}")).unwrap(),
            verified: false,
        }
    }

    pub(crate) fn post(id: &str, author_id: &str, created_at: OffsetDateTime) -> Post {
        Post {
            id: id.into(),
            author: author(author_id),
            content: format!("post {id}"),
            media_files: Vec::new(),
            likes: LikeSet::new(),
            comments: Vec::new(),
            created_at,
        }
    }

    fn sample() -> Vec<Post> {
        let base = datetime!(2025-06-01 12:00 UTC);
        vec![
            post("p1", "u1", base),
            post("p2", "u2", base + Duration::hours(1)),
            post("p3", "u1", base + Duration::hours(2)),
            post("p4", "u1", base - Duration::hours(5)),
        ]
    }

    #[test]
    fn public_feed_keeps_order() {
        let posts = sample();
        let visible = derive_visible(&posts, FeedType::Public, None);
        assert_eq!(visible, posts);
    }

    #[test]
    fn personal_feed_filters_and_sorts_newest_first() {
        let posts = sample();
        let visible = derive_visible(&posts, FeedType::Personal, Some(&UserId::from("u1")));

        let ids: Vec<&str> = visible.iter().map(|post| post.id.get()).collect();
        assert_eq!(ids, ["p3", "p1", "p4"]);
        assert!(visible.iter().all(|post| post.author.id.get() == "u1"));

        assert!(derive_visible(&posts, FeedType::Personal, None).is_empty());
    }

    #[test]
    fn derivation_is_pure() {
        let posts = sample();
        let user = UserId::from("u1");

        let first = derive_visible(&posts, FeedType::Personal, Some(&user));
        let second = derive_visible(&posts, FeedType::Personal, Some(&user));
        assert_eq!(first, second);
        assert_eq!(posts, sample());
    }

    #[test]
    fn updates_are_copy_on_write() {
        let store = EntityStore::new();
        store.replace_posts(sample());

        let before = store.posts();
        let touched = store.update_post(&"p2".into(), |post| post.likes.insert("u9".into()));
        assert_eq!(touched, Some(true));

        assert!(before[1].likes.is_empty());
        assert!(!Arc::ptr_eq(&before, &store.posts()));
        assert!(store.post(&"p2".into()).unwrap().is_liked_by(&"u9".into()));

        assert_eq!(store.update_post(&"missing".into(), |_| ()), None);
    }

    #[test]
    fn visible_follows_feed_type() {
        let store = EntityStore::new();
        store.replace_posts(sample());
        let mut receiver = store.subscribe();
        receiver.mark_unchanged();

        store.set_feed_type(FeedType::Personal);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(store.visible(Some(&"u2".into())).len(), 1);

        store.prepend_post(post("p5", "u2", datetime!(2025-06-03 12:00 UTC)));
        let visible = store.visible(Some(&"u2".into()));
        assert_eq!(visible[0].id.get(), "p5");

        store.clear();
        assert_eq!(store.feed_type(), FeedType::Public);
        assert!(store.posts().is_empty());
    }
}
