//! Optimistic mutations of the entity store.
//!
//! Every mutation is written locally before the backend hears about it
//! (`Idle -> Applied`), then settles as `Confirmed` or, for likes only,
//! `RolledBack`. Comments and posts that fail remotely stay `Applied`: they
//! are kept on this device rather than silently discarded.
//!
//! There is no per-post locking. Two toggles on the same post may be in flight
//! at once; each reconciles against the membership it captured, and the last
//! write wins.

use crate::{
    gateway::remote::SocialRemote,
    session::context::{SessionContext, SyncMode},
    store::EntityStore,
};
use sickoscoop_common::{
    local_id::{LocalIdGenerator, LocalSnowflake},
    model::{
        ModelValidationError,
        chat::{ChatMessage, ConversationId},
        post::{Comment, CreateComment, CreatePost, LikeSet, MediaRef, Post, PostId},
        user::{User, UserId},
    },
};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MutationState {
    Idle,
    Applied,
    Confirmed,
    RolledBack,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MutationEvent {
    AppliedLocally,
    /// There is no authority to reconcile against.
    LocalOnly,
    RemoteSucceeded,
    RemoteFailed,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MutationKind {
    Like,
    Comment,
    Post,
}

impl MutationKind {
    #[must_use]
    pub fn transition(self, state: MutationState, event: MutationEvent) -> MutationState {
        use MutationEvent as Event;
        use MutationState as State;

        match (state, event) {
            (State::Idle, Event::AppliedLocally) => State::Applied,
            (State::Applied, Event::LocalOnly | Event::RemoteSucceeded) => State::Confirmed,
            (State::Applied, Event::RemoteFailed) => match self {
                MutationKind::Like => State::RolledBack,
                MutationKind::Comment | MutationKind::Post => State::Applied,
            },
            (state, _) => state,
        }
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Post with id {0} was not found")]
    PostNotFound(PostId),
    #[error("Conversation with id {0} was not found")]
    ConversationNotFound(ConversationId),
    #[error("You need to be logged in to do that")]
    NotLoggedIn,
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LikeMutation {
    pub post_id: PostId,
    pub user_id: UserId,
    pub liked_before: bool,
    pub state: MutationState,
}

impl LikeMutation {
    #[must_use]
    pub fn liked_after(&self) -> bool {
        !self.liked_before
    }

    #[must_use]
    fn advance(mut self, event: MutationEvent) -> Self {
        self.state = MutationKind::Like.transition(self.state, event);
        self
    }
}

#[derive(Debug)]
pub struct CommentReceipt {
    pub comment: Comment,
    pub state: MutationState,
    /// The best-effort remote create, if one was started.
    pub sync: Option<JoinHandle<MutationState>>,
}

impl CommentReceipt {
    pub async fn settled(self) -> MutationState {
        match self.sync {
            Some(handle) => handle.await.unwrap_or(self.state),
            None => self.state,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct PostSubmission {
    /// The locally built post, which stays the displayed entity.
    pub post: Post,
    pub state: MutationState,
    pub server_post: Option<Post>,
}

pub struct MutationEngine {
    store: Arc<EntityStore>,
    session: Arc<SessionContext>,
    remote: Arc<dyn SocialRemote>,
    local_ids: Mutex<LocalIdGenerator>,
}

impl MutationEngine {
    #[must_use]
    pub fn new(
        store: Arc<EntityStore>,
        session: Arc<SessionContext>,
        remote: Arc<dyn SocialRemote>,
    ) -> Self {
        Self {
            store,
            session,
            remote,
            local_ids: Mutex::new(LocalIdGenerator::new()),
        }
    }

    fn current_user(&self) -> Result<User, MutationError> {
        self.session.user().ok_or(MutationError::NotLoggedIn)
    }

    /// Placeholder posts are unknown to the backend, so nothing about them is
    /// sent there.
    fn sync_mode_for(&self, post_id: &PostId) -> SyncMode {
        if post_id.is_local() {
            SyncMode::LocalOnly
        } else {
            self.session.sync_mode()
        }
    }

    fn next_local_id(&self) -> LocalSnowflake {
        self.local_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    /// Flips the current user's like on the post in the store, before any
    /// network traffic.
    pub fn apply_like(&self, post_id: &PostId) -> Result<LikeMutation, MutationError> {
        let user_id = self.current_user()?.id;

        let liked_before = self
            .store
            .update_post(post_id, |post| {
                let liked_before = post.likes.contains(&user_id);
                post.likes.set(user_id.clone(), !liked_before);
                liked_before
            })
            .ok_or_else(|| MutationError::PostNotFound(post_id.clone()))?;

        let mutation = LikeMutation {
            post_id: post_id.clone(),
            user_id,
            liked_before,
            state: MutationState::Idle,
        }
        .advance(MutationEvent::AppliedLocally);

        debug!(%post_id, liked = mutation.liked_after(), "Applied like locally");

        Ok(match self.sync_mode_for(post_id) {
            SyncMode::Remote => mutation,
            SyncMode::LocalOnly => mutation.advance(MutationEvent::LocalOnly),
        })
    }

    /// Confirms an applied like with the backend, restoring the captured
    /// membership if the backend call fails.
    pub async fn reconcile_like(&self, mutation: LikeMutation) -> LikeMutation {
        if mutation.state != MutationState::Applied {
            return mutation;
        }

        match self.remote.like_post(&mutation.post_id).await {
            Ok(_) => {
                debug!(post_id = %mutation.post_id, "Like confirmed");
                mutation.advance(MutationEvent::RemoteSucceeded)
            }
            Err(err) => {
                warn!(error = %err, post_id = %mutation.post_id, "Like failed, rolling back");
                self.store.update_post(&mutation.post_id, |post| {
                    post.likes
                        .set(mutation.user_id.clone(), mutation.liked_before);
                });
                mutation.advance(MutationEvent::RemoteFailed)
            }
        }
    }

    pub async fn toggle_like(&self, post_id: &PostId) -> Result<LikeMutation, MutationError> {
        let mutation = self.apply_like(post_id)?;
        Ok(self.reconcile_like(mutation).await)
    }

    /// Appends a comment locally and sends it in the background. Blank text
    /// is ignored.
    ///
    /// Must be called within a tokio runtime.
    pub fn add_comment(
        &self,
        post_id: &PostId,
        text: &str,
    ) -> Result<Option<CommentReceipt>, MutationError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let user = self.current_user()?;
        let comment = Comment {
            author: user.summary(),
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };

        self.store
            .update_post(post_id, |post| post.comments.push(comment.clone()))
            .ok_or_else(|| MutationError::PostNotFound(post_id.clone()))?;

        let kind = MutationKind::Comment;
        let state = kind.transition(MutationState::Idle, MutationEvent::AppliedLocally);

        if self.sync_mode_for(post_id) == SyncMode::LocalOnly {
            debug!(%post_id, "Comment kept locally");
            return Ok(Some(CommentReceipt {
                comment,
                state: kind.transition(state, MutationEvent::LocalOnly),
                sync: None,
            }));
        }

        let remote = Arc::clone(&self.remote);
        let post_id = post_id.clone();
        let request = CreateComment {
            content: comment.content.clone(),
        };
        let sync = tokio::spawn(async move {
            match remote.comment_post(&post_id, &request).await {
                Ok(()) => {
                    debug!(%post_id, "Comment confirmed");
                    kind.transition(state, MutationEvent::RemoteSucceeded)
                }
                Err(err) => {
                    warn!(error = %err, %post_id, "Comment was not saved remotely, keeping it locally");
                    kind.transition(state, MutationEvent::RemoteFailed)
                }
            }
        });

        Ok(Some(CommentReceipt {
            comment,
            state,
            sync: Some(sync),
        }))
    }

    /// Prepends a placeholder post with a local id, then creates it remotely.
    /// The placeholder stays in the store whatever the backend answers.
    pub async fn submit_post(
        &self,
        content: &str,
        media_files: Vec<MediaRef>,
    ) -> Result<PostSubmission, MutationError> {
        let content = content.trim();
        if content.is_empty() && media_files.is_empty() {
            return Err(ModelValidationError::EmptyPost.into());
        }

        let user = self.current_user()?;
        let post = Post {
            id: PostId::local(self.next_local_id()),
            author: user.summary(),
            content: content.to_owned(),
            media_files,
            likes: LikeSet::new(),
            comments: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.store.prepend_post(post.clone());

        let kind = MutationKind::Post;
        let state = kind.transition(MutationState::Idle, MutationEvent::AppliedLocally);

        if self.session.sync_mode() == SyncMode::LocalOnly {
            debug!(post_id = %post.id, "Post kept locally");
            return Ok(PostSubmission {
                post,
                state: kind.transition(state, MutationEvent::LocalOnly),
                server_post: None,
            });
        }

        let request = CreatePost {
            content: post.content.clone(),
            media_files: post.media_files.clone(),
        };

        match self.remote.create_post(&request).await {
            Ok(server_post) => {
                info!(local_id = %post.id, server_id = %server_post.id, "Post created");
                Ok(PostSubmission {
                    post,
                    state: kind.transition(state, MutationEvent::RemoteSucceeded),
                    server_post: Some(server_post),
                })
            }
            Err(err) => {
                warn!(error = %err, post_id = %post.id, "Post was not saved remotely, keeping it locally");
                Ok(PostSubmission {
                    post,
                    state: kind.transition(state, MutationEvent::RemoteFailed),
                    server_post: None,
                })
            }
        }
    }

    /// Appends a chat message to the conversation on this device only.
    pub fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<Option<ChatMessage>, MutationError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let user = self.current_user()?;
        let message = ChatMessage {
            sender_id: user.id,
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };

        self.store
            .update_chat(conversation_id, |conversation| {
                conversation.push_message(message.clone());
            })
            .ok_or_else(|| MutationError::ConversationNotFound(conversation_id.clone()))?;

        Ok(Some(message))
    }
}
