//! Client error model and the mapping from error kind to presentation.
//! Every session and gateway failure surfaces as one `ClientError`; the UI layer
//! decides how to show it through [`ClientError::presentation`] instead of
//! matching on messages.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The login exchange failed (rejected credentials, transport or malformed reply).
    #[error("{message}")]
    Authentication { message: String },
    /// An authorized call was attempted without a credential; nothing was sent.
    #[error("User not authenticated")]
    AuthenticationRequired,
    /// The service answered 401; the session has already been cleared.
    #[error("Session expired. Please login again.")]
    SessionExpired,
    /// Any other non-success status, transport failure or unparseable body.
    #[error("{message}")]
    Request { status: Option<u16>, message: String },
    /// A view or action gated on a locally held role.
    #[error("{message}")]
    Forbidden { message: String },
    #[error("{message}")]
    Validation { message: String },
    #[error("session storage: {message}")]
    Storage { message: String },
}

/// How the UI layer should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Render next to the login form.
    Inline,
    /// Transient notification.
    Notification,
    /// Notification plus a return to the unauthenticated view.
    ForceLogin,
}

impl ClientError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self { ClientError::Authentication { message: msg.into() } }
    pub fn request<S: Into<String>>(status: Option<u16>, msg: S) -> Self { ClientError::Request { status, message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { ClientError::Forbidden { message: msg.into() } }
    pub fn validation<S: Into<String>>(msg: S) -> Self { ClientError::Validation { message: msg.into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { ClientError::Storage { message: msg.into() } }

    /// Stable snake_case code for logs.
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Authentication { .. } => "authentication_failed",
            ClientError::AuthenticationRequired => "authentication_required",
            ClientError::SessionExpired => "session_expired",
            ClientError::Request { .. } => "request_failed",
            ClientError::Forbidden { .. } => "forbidden",
            ClientError::Validation { .. } => "validation_failed",
            ClientError::Storage { .. } => "storage_error",
        }
    }

    /// HTTP status carried by a request failure, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => *status,
            ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            ClientError::Authentication { .. } => Presentation::Inline,
            ClientError::SessionExpired => Presentation::ForceLogin,
            ClientError::AuthenticationRequired
            | ClientError::Request { .. }
            | ClientError::Forbidden { .. }
            | ClientError::Validation { .. }
            | ClientError::Storage { .. } => Presentation::Notification,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage { message: err.to_string() }
    }
}
