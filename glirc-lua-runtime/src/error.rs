//! Boundary errors - host failure codes and out-of-contract script input
//!
//! Every variant renders exactly its documented message with no prefix so
//! that scripts can match on the text they receive.

use thiserror::Error;

/// Raised when a request carries more parameters than the protocol allows
pub const TOO_MANY_PARAMETERS: &str = "too many parameters";
/// Host reported failure with no absent-value interpretation
pub const CLIENT_FAILURE: &str = "client failure";
/// `list_channels` on a network the client does not know
pub const NO_SUCH_NETWORK: &str = "no such network";
/// `list_channel_users` on a channel the client has not joined
pub const NO_SUCH_CHANNEL: &str = "no such channel";
/// Registration attempted after the registry was shut down
pub const REGISTRY_CLOSED: &str = "registry closed";

pub type Result<T> = std::result::Result<T, BindingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Wrong argument count or type supplied by the script
    #[error("{0}")]
    Argument(String),
    /// Host call failed
    #[error("{0}")]
    HostFailure(&'static str),
    /// Host lookup failed where absence is not a valid answer
    #[error("{0}")]
    NotFound(&'static str),
    /// A script closure invoked by the callback registry failed.
    /// Reported through the host print channel, never raised into the host.
    #[error("{0}")]
    Callback(String),
}

impl BindingError {
    pub fn too_many_parameters() -> Self {
        Self::Argument(TOO_MANY_PARAMETERS.to_string())
    }

    /// Argument error worded like the Lua auxiliary library
    /// (`bad argument #2 to 'print' (no value expected, got string)`)
    pub fn bad_argument(position: usize, function: &str, detail: impl AsRef<str>) -> Self {
        Self::Argument(format!(
            "bad argument #{} to '{}' ({})",
            position,
            function,
            detail.as_ref()
        ))
    }

    pub fn client_failure() -> Self {
        Self::HostFailure(CLIENT_FAILURE)
    }

    /// Short category name, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Argument(_) => "argument",
            Self::HostFailure(_) => "host_failure",
            Self::NotFound(_) => "not_found",
            Self::Callback(_) => "callback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_have_no_prefix() {
        assert_eq!(BindingError::too_many_parameters().to_string(), "too many parameters");
        assert_eq!(BindingError::client_failure().to_string(), "client failure");
        assert_eq!(BindingError::NotFound(NO_SUCH_NETWORK).to_string(), "no such network");
    }

    #[test]
    fn test_bad_argument_wording() {
        let err = BindingError::bad_argument(2, "print", "no value expected, got string");
        assert_eq!(err.to_string(), "bad argument #2 to 'print' (no value expected, got string)");
        assert_eq!(err.kind(), "argument");
    }
}
