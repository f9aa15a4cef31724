//! Error taxonomy for secret operations

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed underlying error carried as the `source()` of an [`Error`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why an operation failed, grouped by cause rather than by remote type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed identifier, name or payload
    Validation,
    /// The referenced secret does not exist
    NotFound,
    /// The caller lacks permission or presented bad credentials
    AccessDenied,
    /// The request clashes with the secret's current state
    Conflict,
    /// The call could not complete
    Transient,
    /// The service could not encrypt or decrypt the payload
    Decryption,
    Cancelled,
    TimedOut,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::AccessDenied => "access-denied",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
            Self::Decryption => "decryption",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed-out",
            Self::Other => "other",
        }
    }

    /// Classify a Secrets Manager error code
    pub fn from_service_code(code: &str) -> Self {
        match code {
            "InvalidParameterException"
            | "ValidationException"
            | "MalformedPolicyDocumentException"
            | "LimitExceededException" => Self::Validation,
            "ResourceNotFoundException" => Self::NotFound,
            "AccessDeniedException"
            | "AccessDenied"
            | "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "ExpiredTokenException" => Self::AccessDenied,
            "ResourceExistsException"
            | "InvalidRequestException"
            | "PreconditionNotMetException" => Self::Conflict,
            "InternalServiceError"
            | "InternalFailure"
            | "ThrottlingException"
            | "ServiceUnavailable" => Self::Transient,
            "DecryptionFailure" | "EncryptionFailure" => Self::Decryption,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single secret operation
///
/// The remote error, when there is one, stays reachable through
/// [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct Error {
    pub kind: ErrorKind,
    /// Remote operation name, e.g. `CreateSecret`
    pub operation: &'static str,
    /// Remote error code, when the service returned one
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    pub fn new(kind: ErrorKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            code: None,
            message: message.into(),
            request_id: None,
            source: None,
        }
    }

    /// Error reported by the service under `code`
    pub fn service(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let mut error = Self::new(ErrorKind::from_service_code(&code), operation, message);
        error.code = Some(code);
        error
    }

    pub fn cancelled(operation: &'static str) -> Self {
        Self::new(ErrorKind::Cancelled, operation, "request was cancelled")
    }

    pub fn timed_out(operation: &'static str, limit: Duration) -> Self {
        Self::new(
            ErrorKind::TimedOut,
            operation,
            format!("no response within {}ms", limit.as_millis()),
        )
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Whether a caller could reasonably try again; nothing here acts on it
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient | ErrorKind::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_service_code_classification() {
        let cases = [
            ("ResourceNotFoundException", ErrorKind::NotFound),
            ("ResourceExistsException", ErrorKind::Conflict),
            ("InvalidRequestException", ErrorKind::Conflict),
            ("InvalidParameterException", ErrorKind::Validation),
            ("AccessDeniedException", ErrorKind::AccessDenied),
            ("ThrottlingException", ErrorKind::Transient),
            ("DecryptionFailure", ErrorKind::Decryption),
            ("SomethingNew", ErrorKind::Other),
        ];

        for (code, kind) in cases {
            assert_eq!(ErrorKind::from_service_code(code), kind, "{code}");
        }
    }

    #[test]
    fn test_service_error_keeps_code_and_message() {
        let error = Error::service(
            "GetSecretValue",
            "ResourceNotFoundException",
            "Secrets Manager can't find the specified secret.",
        )
        .with_request_id("req-1");

        assert!(error.is_not_found());
        assert_eq!(error.code(), Some("ResourceNotFoundException"));
        assert_eq!(error.request_id.as_deref(), Some("req-1"));
        assert_eq!(
            error.to_string(),
            "GetSecretValue failed (not-found): Secrets Manager can't find the specified secret."
        );
    }

    #[test]
    fn test_source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let error = Error::new(ErrorKind::Transient, "ListSecrets", "dispatch failure").with_source(io);

        assert!(error.is_retryable());
        let source = error.source().unwrap();
        assert_eq!(source.to_string(), "reset");
    }

    #[test]
    fn test_timed_out_message() {
        let error = Error::timed_out("DeleteSecret", Duration::from_millis(250));
        assert_eq!(error.kind(), ErrorKind::TimedOut);
        assert!(error.message.contains("250ms"));
    }
}
