use thiserror::Error;

/// Everything that can go wrong in Grippy
///
/// Each variant maps to how the failure is shown: validation and auth messages
/// go to the user as-is, storage failures become a generic notice, provider
/// failures are logged and treated as "no results".
#[derive(Error, Debug)]
pub enum Error {
    /// Local form check, never reaches the network
    #[error("{0}")]
    Validation(String),

    /// Backend-reported credential/account failure, message passed through
    #[error("{0}")]
    Auth(String),

    #[error("Search provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// Favorites access without an active session
    #[error("You need to be logged in to do that")]
    Denied,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Text suitable for a status line or alert
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::Auth(msg) => msg.clone(),
            Error::Denied => "You need to be logged in to save favorites.".to_string(),
            Error::Storage(_) => "Something went wrong, please try again.".to_string(),
            Error::Provider(_) => "Search is unavailable right now.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Why a search produced nothing
///
/// A provider-reported status and a response we could not make sense of look
/// the same to the user, but they are logged differently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_messages_pass_through() {
        let err = Error::Auth("EMAIL_EXISTS".into());
        assert_eq!(err.user_message(), "EMAIL_EXISTS");
    }

    #[test]
    fn test_storage_message_is_generic() {
        let err = Error::Storage("disk I/O error".into());
        assert_eq!(err.user_message(), "Something went wrong, please try again.");
    }
}
