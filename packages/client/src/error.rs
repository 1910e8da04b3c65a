//! Error taxonomy for remote data operations.
//!
//! Every outcome of a request is classified into exactly one
//! [`ClientError`] variant so callers can pick a remediation: transport
//! failures may be worth retrying, protocol failures (bad status or shape)
//! usually are not, and semantic failures (version mismatch, empty
//! forecast) mean there is nothing usable to show.

/// Failure of a parking data operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No response was obtained (connection refused, timeout, DNS, ...).
    #[error("Request failed: {message}")]
    Request {
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with an unexpected status or an unparseable body.
    #[error("Server error: {message}")]
    Server {
        /// Status code or parse failure description.
        message: String,
    },

    /// HTTP 404 from the snapshot or forecast endpoint.
    #[error("Not found: {url}")]
    NotFound {
        /// The URL that was requested.
        url: String,
    },

    /// The server speaks an API version this client does not understand.
    #[error("Incompatible API version '{found}' (supported: '{supported}')")]
    IncompatibleApi {
        /// Version reported by the server.
        found: String,
        /// The single version this client accepts.
        supported: String,
    },

    /// The forecast request succeeded but contained no entries.
    #[error("No forecast data for lot {lot_id}")]
    NoData {
        /// The lot the forecast was requested for.
        lot_id: String,
    },

    /// Anything the other variants do not cover.
    #[error("Unknown error: {message}")]
    Unknown {
        /// Description of what went wrong.
        message: String,
    },
}

impl ClientError {
    /// Only transport failures are worth retrying as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Request { .. })
    }

    /// An incompatible API makes every further data operation pointless
    /// for the rest of the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::IncompatibleApi { .. })
    }
}

/// Errors raised by an [`HttpTransport`](crate::transport::HttpTransport)
/// before a response is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP stack failed to deliver the request or read the response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport is not reachable (used by non-reqwest transports).
    #[error("Transport unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The request could not be built (bad URL, invalid header, ...).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http(e) if e.is_builder() => Self::Unknown {
                message: e.to_string(),
            },
            TransportError::InvalidRequest { message } => Self::Unknown { message },
            TransportError::Http(e) => Self::Request {
                message: e.to_string(),
            },
            TransportError::Unavailable { message } => Self::Request { message },
        }
    }
}
