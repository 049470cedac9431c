use thiserror::Error;

/// Failure taxonomy for the auth flows.
///
/// `Validation` is raised client-side before any network call,
/// `Remote` carries a server-supplied rejection, `Network` covers
/// transport failures (the request itself threw). All three are caught
/// at the form-submission boundary and turned into a user-visible
/// notification; none propagate further.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Remote { message: String },
    #[error("network failure: {0}")]
    Network(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
