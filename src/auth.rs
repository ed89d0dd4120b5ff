use std::fmt::{Display, Formatter};

use crate::domain::UserId;

/// Context object carried by everything that acts on a signed-in user.
/// Created on sign-in, dropped on sign-out; nothing reads ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: UserId,
    pub email: String,
}

impl UserSession {
    pub fn new(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    UserNotFound,
    EmailInUse,
    InvalidEmail,
    WeakPassword,
    Network(String),
    Provider(String),
}

impl AuthError {
    /// Transient failures are worth retrying as-is; the rest need the user to
    /// correct their input.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => {
                "Invalid email or password. Please check your credentials.".to_string()
            }
            AuthError::UserNotFound => {
                "User not found. Please check your email or sign up.".to_string()
            }
            AuthError::EmailInUse => {
                "Email already in use. Please try signing in instead.".to_string()
            }
            AuthError::InvalidEmail => {
                "Invalid email format. Please enter a valid email address.".to_string()
            }
            AuthError::WeakPassword => {
                "Password is too weak. Please use at least 6 characters.".to_string()
            }
            AuthError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            AuthError::Provider(detail) => format!("Sign-in failed: {detail}"),
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::UserNotFound => write!(f, "user not found"),
            AuthError::EmailInUse => write!(f, "email already in use"),
            AuthError::InvalidEmail => write!(f, "invalid email"),
            AuthError::WeakPassword => write!(f, "password too weak"),
            AuthError::Network(detail) => write!(f, "network failure: {detail}"),
            AuthError::Provider(detail) => write!(f, "auth provider failure: {detail}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Contract for the external authentication service. Session changes flow
/// through the return values; callers attach store subscriptions after a
/// successful sign-in and tear them down on sign-out.
pub trait AuthProvider {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserSession, AuthError>;
    fn sign_up(&mut self, email: &str, password: &str) -> Result<UserSession, AuthError>;
    fn sign_out(&mut self);
    fn current_user(&self) -> Option<&UserSession>;
}
