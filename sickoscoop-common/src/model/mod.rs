pub mod auth;
pub mod chat;
pub mod post;
pub mod user;

use crate::{local_id::LocalSnowflake, model::user::InvalidUserHandleError};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {min_len} characters")]
    PasswordTooShort { min_len: usize },
    #[error("A post needs text or at least one media file")]
    EmptyPost,
}

/// A record carried none of the keys a required field may travel under.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("missing field `{0}`")]
pub struct MissingWireField(pub &'static str);

/// The backend spells some keys more than one way (`id` and `_id`, `username`
/// and `name`) and may send several spellings at once. The first one present
/// wins.
pub(crate) fn first_present<T, const N: usize>(
    field: &'static str,
    candidates: [Option<T>; N],
) -> Result<T, MissingWireField> {
    candidates
        .into_iter()
        .flatten()
        .next()
        .ok_or(MissingWireField(field))
}

/// Opaque entity id as handed out by the backend, typed by a marker.
///
/// Ids assigned on this device before the backend has seen the entity carry
/// the [`LOCAL_ID_PREFIX`].
#[derive_where(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(String, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into(), PhantomData)
    }

    #[must_use]
    pub fn local(snowflake: LocalSnowflake) -> Self {
        Self::new(format!("{LOCAL_ID_PREFIX}{snowflake}"))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<String> for Id<Marker> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<&str> for Id<Marker> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for String {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}
