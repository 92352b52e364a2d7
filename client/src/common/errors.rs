use crate::model::{ErrorDetail, OperationStatus};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the paging adapter, the long-running-operation poller
/// and the HTTP strategies that feed them.
///
/// None of these are retried internally. Callers decide whether to call
/// `poll` again, restart a listing, or give up.
///
/// # Error Categories
///
/// ## Wire failures
/// - [`Transport`] - connection level failure (DNS, TCP, TLS, request timeout)
/// - [`Service`] - non-2xx response with the service's error code and message
/// - [`InvalidContinuationToken`] - a continuation token the service rejected
///
/// ## Operation outcomes
/// - [`OperationFailed`] - the remote operation reported `Failed`
/// - [`OperationTimeout`] - the local wait loop ran out of time
/// - [`OperationCancelled`] - the caller stopped or cancelled the operation
/// - [`CancellationUnsupported`] - the protocol has no cancel endpoint
/// - [`OperationIncomplete`] - a result was requested before a terminal state
///
/// ## Local failures
/// - [`Deserialization`], [`Configuration`]
///
/// # Examples
///
/// ```no_run
/// use client::common::ClientError;
///
/// fn describe(error: &ClientError) -> &'static str {
///     if error.is_not_found() {
///         "missing"
///     } else if error.is_throttled() {
///         "slow down"
///     } else {
///         "failed"
///     }
/// }
/// ```
///
/// [`Transport`]: ClientError::Transport
/// [`Service`]: ClientError::Service
/// [`InvalidContinuationToken`]: ClientError::InvalidContinuationToken
/// [`OperationFailed`]: ClientError::OperationFailed
/// [`OperationTimeout`]: ClientError::OperationTimeout
/// [`OperationCancelled`]: ClientError::OperationCancelled
/// [`CancellationUnsupported`]: ClientError::CancellationUnsupported
/// [`OperationIncomplete`]: ClientError::OperationIncomplete
/// [`Deserialization`]: ClientError::Deserialization
/// [`Configuration`]: ClientError::Configuration
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Transport error during {operation}: {reason}")]
    Transport { operation: String, reason: String },

    /// The service answered with a non-success status code.
    #[error(
        "Service error during {operation}: {error_code} (HTTP {status_code}) - {message}{}",
        request_id_suffix(.request_id)
    )]
    Service {
        operation: String,
        status_code: u16,
        error_code: String,
        message: String,
        request_id: Option<String>,
    },

    /// The service rejected a continuation token, or returned the same token twice.
    #[error("Invalid continuation token '{token}': {message}")]
    InvalidContinuationToken {
        token: String,
        status_code: Option<u16>,
        message: String,
    },

    /// The remote operation reached the `Failed` state.
    #[error("Operation {} failed: {error_detail}", display_id(.operation_id))]
    OperationFailed {
        operation_id: Option<String>,
        error_detail: ErrorDetail,
    },

    /// The caller's wait deadline passed before a terminal state.
    #[error("Operation {} did not complete within {timeout:?} (last status: {last_status})", display_id(.operation_id))]
    OperationTimeout {
        operation_id: Option<String>,
        timeout: Duration,
        last_status: OperationStatus,
    },

    #[error("Operation {} was cancelled", display_id(.operation_id))]
    OperationCancelled { operation_id: Option<String> },

    /// Cancel was requested but the protocol offers no cancel affordance.
    /// The remote operation may still be running.
    #[error("Operation {} does not support cancellation; the remote operation may continue running", display_id(.operation_id))]
    CancellationUnsupported { operation_id: Option<String> },

    #[error("Operation {} has no result yet (status: {status})", display_id(.operation_id))]
    OperationIncomplete {
        operation_id: Option<String>,
        status: OperationStatus,
    },

    #[error("Failed to deserialize response: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn request_id_suffix(request_id: &Option<String>) -> String {
    match request_id {
        Some(id) => format!(" [Request ID: {id}]"),
        None => String::new(),
    }
}

fn display_id(operation_id: &Option<String>) -> String {
    match operation_id {
        Some(id) => format!("'{id}'"),
        None => "<unnamed>".to_string(),
    }
}

impl ClientError {
    pub fn transport(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn service(
        operation: impl Into<String>,
        status_code: u16,
        error_code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation: operation.into(),
            status_code,
            error_code: error_code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Builds a [`ClientError::Service`] from a non-success response body.
    ///
    /// Understands the Azure error envelope (`{"error": {"code", "message"}}`)
    /// and falls back to `HTTP_<status>` with the raw body for anything else.
    pub fn from_service_response(
        operation: impl Into<String>,
        status_code: u16,
        request_id: Option<String>,
        body: &str,
    ) -> Self {
        let operation = operation.into();
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| ErrorDetail::from_json(&value));

        match detail {
            Some(detail) => Self::Service {
                operation,
                status_code,
                error_code: if detail.code.is_empty() {
                    format!("HTTP_{status_code}")
                } else {
                    detail.code
                },
                message: detail.message,
                request_id,
            },
            None => Self::Service {
                operation,
                status_code,
                error_code: format!("HTTP_{status_code}"),
                message: if body.trim().is_empty() {
                    format!("HTTP {status_code} error")
                } else {
                    body.to_string()
                },
                request_id,
            },
        }
    }

    pub fn is_service_error(&self) -> bool {
        matches!(self, ClientError::Service { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Service { status_code, .. } => Some(*status_code),
            ClientError::InvalidContinuationToken { status_code, .. } => *status_code,
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Service { error_code, .. } => Some(error_code),
            ClientError::OperationFailed { error_detail, .. } => Some(&error_detail.code),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientError::Service { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_throttled(&self) -> bool {
        self.status_code() == Some(429)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Deserialization(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_from_azure_envelope() {
        let body = r#"{"error":{"code":"SubscriptionNotFound","message":"The subscription was not found"}}"#;
        let error =
            ClientError::from_service_response("list_vaults", 404, Some("req-1".into()), body);

        match &error {
            ClientError::Service {
                error_code,
                status_code,
                message,
                request_id,
                operation,
            } => {
                assert_eq!(error_code, "SubscriptionNotFound");
                assert_eq!(*status_code, 404);
                assert_eq!(message, "The subscription was not found");
                assert_eq!(request_id.as_deref(), Some("req-1"));
                assert_eq!(operation, "list_vaults");
            }
            other => panic!("Expected Service variant, got {other:?}"),
        }
        assert!(error.is_not_found());
        assert!(error.to_string().contains("[Request ID: req-1]"));
    }

    #[test]
    fn test_service_error_from_plain_body() {
        let error = ClientError::from_service_response("get", 502, None, "Bad Gateway");
        assert_eq!(error.error_code(), Some("HTTP_502"));
        assert!(error.to_string().contains("Bad Gateway"));
        assert!(!error.to_string().contains("Request ID"));

        let empty = ClientError::from_service_response("get", 503, None, "");
        assert!(empty.to_string().contains("HTTP 503 error"));
    }

    #[test]
    fn test_throttling_classification() {
        let throttled = ClientError::service("list", 429, "TooManyRequests", "slow down");
        assert!(throttled.is_throttled());
        assert!(!ClientError::transport("list", "connection reset").is_throttled());
    }

    #[test]
    fn test_operation_failed_display() {
        let error = ClientError::OperationFailed {
            operation_id: Some("op-42".into()),
            error_detail: ErrorDetail::new("QuotaExceeded", "No cores left"),
        };
        assert_eq!(
            error.to_string(),
            "Operation 'op-42' failed: QuotaExceeded: No cores left"
        );
        assert_eq!(error.error_code(), Some("QuotaExceeded"));
    }
}
