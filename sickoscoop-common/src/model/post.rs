use crate::model::{
    Id, MissingWireField, first_present,
    user::{UserId, UserSummary},
};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

pub type PostId = Id<PostMarker>;

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WirePost")]
pub struct Post {
    pub id: PostId,
    pub author: UserSummary,
    pub content: String,
    pub media_files: Vec<MediaRef>,
    pub likes: LikeSet,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WireComment")]
pub struct Comment {
    pub author: UserSummary,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePost {
    id: Option<PostId>,
    #[serde(rename = "_id")]
    object_id: Option<PostId>,
    author: Option<UserSummary>,
    author_ref: Option<UserSummary>,
    user: Option<UserSummary>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    media_files: Vec<MediaRef>,
    #[serde(default)]
    likes: LikeSet,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl TryFrom<WirePost> for Post {
    type Error = MissingWireField;

    fn try_from(wire: WirePost) -> Result<Self, Self::Error> {
        Ok(Self {
            id: first_present("id", [wire.id, wire.object_id])?,
            author: first_present("author", [wire.author, wire.author_ref, wire.user])?,
            content: wire.content,
            media_files: wire.media_files,
            likes: wire.likes,
            comments: wire.comments,
            created_at: wire.created_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireComment {
    author: Option<UserSummary>,
    author_ref: Option<UserSummary>,
    user: Option<UserSummary>,
    content: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl TryFrom<WireComment> for Comment {
    type Error = MissingWireField;

    fn try_from(wire: WireComment) -> Result<Self, Self::Error> {
        Ok(Self {
            author: first_present("author", [wire.author, wire.author_ref, wire.user])?,
            content: wire.content,
            created_at: wire.created_at,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub content: String,
    pub media_files: Vec<MediaRef>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct CreateComment {
    pub content: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub liked: Option<bool>,
}

/// User ids that liked a post, in the order they were added.
///
/// Each user id appears at most once, no matter how the set was built.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct LikeSet(Vec<UserId>);

impl LikeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.0.contains(user_id)
    }

    /// Returns whether the set changed.
    pub fn insert(&mut self, user_id: UserId) -> bool {
        if self.contains(&user_id) {
            false
        } else {
            self.0.push(user_id);
            true
        }
    }

    /// Returns whether the set changed.
    pub fn remove(&mut self, user_id: &UserId) -> bool {
        let len_before = self.0.len();
        self.0.retain(|id| id != user_id);
        self.0.len() != len_before
    }

    /// Forces the membership of `user_id` to `present`.
    pub fn set(&mut self, user_id: UserId, present: bool) -> bool {
        if present {
            self.insert(user_id)
        } else {
            self.remove(&user_id)
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

impl FromIterator<UserId> for LikeSet {
    fn from_iter<T: IntoIterator<Item = UserId>>(iter: T) -> Self {
        let mut set = Self::new();
        for user_id in iter {
            set.insert(user_id);
        }
        set
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLikes {
    Ids(Vec<UserId>),
    Count(u64),
}

impl<'de> Deserialize<'de> for LikeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older payloads only carried a like count, which says nothing about who liked.
        Ok(match WireLikes::deserialize(deserializer)? {
            WireLikes::Ids(ids) => ids.into_iter().collect(),
            WireLikes::Count(_) => Self::new(),
        })
    }
}

impl Post {
    #[must_use]
    pub fn is_liked_by(&self, user_id: &UserId) -> bool {
        self.likes.contains(user_id)
    }
}
