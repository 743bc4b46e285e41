use crate::model::{ModelValidationError, user::User};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

pub const PASSWORD_MIN_LEN: usize = 6;

/// Bearer token issued by the backend at login or registration.
#[derive(Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct Registration {
    #[serde(rename = "name")]
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct AuthResponse {
    pub token: AuthToken,
    pub user: User,
}

impl Credentials {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_owned(),
            password: password.to_owned(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.email.is_empty() {
            return Err(ModelValidationError::MissingField("Email"));
        }
        if self.password.is_empty() {
            return Err(ModelValidationError::MissingField("Password"));
        }
        validate_email(&self.email)
    }
}

impl Registration {
    #[must_use]
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.trim().to_owned(),
            email: email.trim().to_owned(),
            password: password.to_owned(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.username.is_empty() {
            return Err(ModelValidationError::MissingField("Username"));
        }
        crate::model::user::UserHandle::new(self.username.clone())?;
        Credentials::new(&self.email, &self.password).validate()?;
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(ModelValidationError::PasswordTooShort {
                min_len: PASSWORD_MIN_LEN,
            });
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), ModelValidationError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or(ModelValidationError::InvalidEmail)?;

    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ModelValidationError::InvalidEmail);
    }
    Ok(())
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Debug for Registration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}
