//! Error types shared by the hook chain and the frontends.
use std::panic::Location;

use thiserror::Error;

/// An error caused by the client's request.
///
/// The `Display` form of these variants is sent back to the client verbatim
/// (as a bencoded `failure reason` or a UDP error packet), so the messages
/// must not carry internal detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("info hash not approved")]
    TorrentNotApproved,

    #[error("client not approved")]
    ClientNotApproved,

    #[error("ip not approved")]
    IpNotApproved,

    #[error("approval required but jwt missing")]
    MissingJwtParameter,

    #[error("invalid jwt")]
    InvalidJwt,
}

/// An error raised while processing a request.
///
/// Pre-hook errors abort the chain and reach the client through the
/// transport's error form. The `Internal` variant displays a fixed message so
/// internal details never leak; the details are kept for logging.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("internal error occurred")]
    Internal {
        location: &'static Location<'static>,
        message: String,
    },
}

impl Error {
    /// Builds an internal error, capturing the caller location for the logs.
    #[track_caller]
    #[must_use]
    pub fn internal(message: String) -> Self {
        Self::Internal {
            location: Location::caller(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {

    mod error_display {
        use crate::error::{ClientError, Error};

        #[test]
        fn client_errors_should_display_their_client_visible_reason() {
            let error = Error::from(ClientError::TorrentNotApproved);

            assert_eq!(error.to_string(), "info hash not approved");
        }

        #[test]
        fn internal_errors_should_not_leak_their_message() {
            let error = Error::internal("the database caught fire".to_owned());

            assert_eq!(error.to_string(), "internal error occurred");
        }
    }
}
