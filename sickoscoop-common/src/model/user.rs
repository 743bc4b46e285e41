use crate::model::{Id, MissingWireField, first_present};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

pub type UserId = Id<UserMarker>;

#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WireUser")]
pub struct User {
    pub id: UserId,
    pub username: UserHandle,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub follower_ids: Vec<UserId>,
    pub following_ids: Vec<UserId>,
}

/// The slice of a user embedded into posts, comments and conversations.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "WireUser")]
pub struct UserSummary {
    pub id: UserId,
    pub username: UserHandle,
    pub verified: bool,
}

/// Every spelling of a user record the backend is known to send.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: Option<UserId>,
    #[serde(rename = "_id")]
    object_id: Option<UserId>,
    username: Option<UserHandle>,
    name: Option<UserHandle>,
    #[serde(default)]
    verified: bool,
    transparency_score: Option<f32>,
    bio: Option<String>,
    follower_ids: Option<Vec<UserId>>,
    followers: Option<Vec<UserId>>,
    following_ids: Option<Vec<UserId>>,
    following: Option<Vec<UserId>>,
}

impl TryFrom<WireUser> for User {
    type Error = MissingWireField;

    fn try_from(wire: WireUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: first_present("id", [wire.id, wire.object_id])?,
            username: first_present("username", [wire.username, wire.name])?,
            verified: wire.verified,
            transparency_score: wire.transparency_score,
            bio: wire.bio,
            follower_ids: wire.follower_ids.or(wire.followers).unwrap_or_default(),
            following_ids: wire.following_ids.or(wire.following).unwrap_or_default(),
        })
    }
}

impl TryFrom<WireUser> for UserSummary {
    type Error = MissingWireField;

    fn try_from(wire: WireUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: first_present("id", [wire.id, wire.object_id])?,
            username: first_present("username", [wire.username, wire.name])?,
            verified: wire.verified,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0}")]
pub struct InvalidUserHandleError(String);

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        if handle.chars().count() <= USER_HANDLE_MAX_LEN {
            Ok(UserHandle(handle))
        } else {
            Err(InvalidUserHandleError(handle))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for UserHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserHandle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserHandle"))
    }
}

impl User {
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            verified: user.verified,
        }
    }
}
