use crate::storage::StorageError;

/// Failures surfaced by the session store and the task client.
#[derive(Debug)]
pub enum ClientError {
    /// The server answered 401.
    Unauthorized,
    /// Any other non-success status.
    RequestFailed { status: u16, message: String },
    /// The request never produced a response.
    ConnectivityFailure(reqwest::Error),
    /// A task operation was attempted without a token.
    NotAuthenticated,
    /// A success response carried a body we could not read.
    Decode(String),
    Storage(StorageError),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Unauthorized => write!(f, "unauthorized"),
            ClientError::RequestFailed { status, message } => {
                write!(f, "request failed with http {status}: {message}")
            }
            ClientError::ConnectivityFailure(err) => write!(f, "connection failed: {err}"),
            ClientError::NotAuthenticated => write!(f, "not logged in"),
            ClientError::Decode(message) => write!(f, "invalid response body: {message}"),
            ClientError::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::ConnectivityFailure(err) => Some(err),
            ClientError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ClientError {
    fn from(value: StorageError) -> Self {
        ClientError::Storage(value)
    }
}
