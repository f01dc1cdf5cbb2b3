// Error taxonomy shared by the session and the resource client. Every
// operation returns `crate::Result`, the binary wraps these in `anyhow`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad credentials, or the service kept rejecting the session after a
    /// fresh login.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Low-level failure: connection refused, TLS, broken body stream.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered with a non-success status that is not an
    /// authentication signal.
    #[error("{path} returned status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    /// The service reported a failure on an operation that is silent on
    /// success.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error("export failed with status {status}: {body}")]
    Export { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// True for failures of the transport class: the request never got a
    /// usable answer from the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}
