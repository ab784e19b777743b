use crate::clients::{HttpStatusCode, StatusCode};
use snafu::Snafu;
use std::path::PathBuf;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Invalid assisted service url '{}': {}", url, source))]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[snafu(display("Unable to build the HTTP client: {}", source))]
    Initialization { source: reqwest::Error },

    #[snafu(display("Unable to {} {}: {}", method, url, source))]
    Request {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    #[snafu(display("{} {} returned {}: {}", method, url, status, body))]
    Status {
        method: String,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[snafu(display("Unable to read {} from response: {}", what, source))]
    Decode {
        what: String,
        source: reqwest::Error,
    },

    #[snafu(display("Unable to write '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// An error for a call the service answered with a non-success `status`. Mock clients use this
    /// to simulate service-side failures.
    pub fn new_with_status<S1, S2, S3>(method: S1, url: S2, status: StatusCode, body: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Error(InnerError::Status {
            method: method.into(),
            url: url.into(),
            status,
            body: body.into(),
        })
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::Request { source, .. } | InnerError::Decode { source, .. } => {
                source.status_code()
            }
            InnerError::Status { status, .. } => Some(*status),
            InnerError::Url { .. } | InnerError::Initialization { .. } | InnerError::Write { .. } => {
                None
            }
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}
