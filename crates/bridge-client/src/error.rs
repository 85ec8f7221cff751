use std::fmt;

use bridge_config::MappingError;
use serde::Serialize;
use url::Url;

/// Client-specific result type
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Boxed underlying cause of a connection failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the bridge client
///
/// These four kinds are the only failures a caller ever observes; raw
/// transport errors are always wrapped.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The server could not be reached, or the connection broke or timed out
    #[error("failed to connect to LLM bridge server at {url}: {source}")]
    ConnectionFailure {
        /// Endpoint the request was sent to
        url: Url,
        /// Underlying transport fault
        #[source]
        source: BoxError,
    },

    /// The server answered with a non-200 status
    #[error("LLM bridge server at {url} returned status {status}: {body}")]
    ServerError {
        /// Endpoint the request was sent to
        url: Url,
        /// HTTP status code
        status: u16,
        /// Parsed JSON body, or the raw text when it is not JSON
        body: ErrorBody,
    },

    /// Anything that does not fit the other kinds
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The request itself is malformed (no user message, bad configuration)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Error body returned by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// Body parsed as JSON
    Json(serde_json::Value),
    /// Body kept as raw text
    Text(String),
}

impl ErrorBody {
    /// Parse a body as JSON, keeping the raw text if that fails
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Text(raw.to_owned()), Self::Json)
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Discriminant of a `BridgeError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ConnectionFailure,
    ServerError,
    ProtocolError,
    InvalidRequest,
}

/// Serializable summary of an error, for hosts that report failures as data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl BridgeError {
    /// Wrap a transport-level fault for the given endpoint
    pub fn connection(url: &Url, source: impl Into<BoxError>) -> Self {
        Self::ConnectionFailure {
            url: url.clone(),
            source: source.into(),
        }
    }

    /// Classify a `reqwest` error raised while talking to `url`
    ///
    /// Failures to even build the request are protocol errors; everything
    /// else (DNS, refused, reset, timeout, broken body) is a connection
    /// failure.
    pub fn from_transport(url: &Url, error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::ProtocolError(format!("failed to build request for {url}: {error}"))
        } else {
            Self::connection(url, error)
        }
    }

    /// The kind of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::ProtocolError(_) => ErrorKind::ProtocolError,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status code, for server errors
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Endpoint involved, when the failure happened on the wire
    pub const fn url(&self) -> Option<&Url> {
        match self {
            Self::ConnectionFailure { url, .. } | Self::ServerError { url, .. } => Some(url),
            Self::ProtocolError(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Whether the underlying cause was the request timeout expiring
    ///
    /// Timeouts share the `ConnectionFailure` kind; this only helps with
    /// diagnostics.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectionFailure { source, .. } => source
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }

    /// Summarize this error as a record
    pub fn record(&self) -> ErrorRecord {
        ErrorRecord {
            kind: self.kind(),
            message: self.to_string(),
            status: self.status(),
        }
    }
}

impl From<MappingError> for BridgeError {
    fn from(error: MappingError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:3000/chat").unwrap()
    }

    #[test]
    fn json_body_is_parsed() {
        assert_eq!(
            ErrorBody::parse(r#"{"error":"overloaded"}"#),
            ErrorBody::Json(json!({"error": "overloaded"}))
        );
    }

    #[test]
    fn non_json_body_kept_as_text() {
        assert_eq!(
            ErrorBody::parse("Bad Gateway"),
            ErrorBody::Text("Bad Gateway".to_owned())
        );
    }

    #[test]
    fn server_error_message_has_url_status_and_body() {
        let err = BridgeError::ServerError {
            url: url(),
            status: 503,
            body: ErrorBody::parse(r#"{"error":"overloaded"}"#),
        };

        let message = err.to_string();
        assert!(message.contains("http://localhost:3000/chat"));
        assert!(message.contains("503"));
        assert!(message.contains("overloaded"));
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[test]
    fn connection_failure_keeps_cause() {
        let err = BridgeError::connection(&url(), "connection refused");
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
        assert_eq!(err.url(), Some(&url()));
        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_timeout());
    }

    #[test]
    fn record_serializes_kind_and_status() {
        let err = BridgeError::ServerError {
            url: url(),
            status: 500,
            body: ErrorBody::Text("boom".to_owned()),
        };

        let record = serde_json::to_value(err.record()).unwrap();
        assert_eq!(record["kind"], "ServerError");
        assert_eq!(record["status"], 500);

        let record = serde_json::to_value(BridgeError::InvalidRequest("no user message".to_owned()).record()).unwrap();
        assert_eq!(record["kind"], "InvalidRequest");
        assert!(record.get("status").is_none());
    }

    #[test]
    fn mapping_errors_are_invalid_requests() {
        let err: BridgeError = MappingError::Incompatible.into();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
