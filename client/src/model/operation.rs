use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a long-running operation.
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal: once reached, the
/// operation never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationStatus {
    #[default]
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Normalizes a server status string.
    ///
    /// Matching is case-insensitive and accepts the spellings used across
    /// Azure services (`Running`, `Accepted`, `Creating`, `Canceled`, ...).
    /// Anything unrecognized is reported as [`OperationStatus::InProgress`]
    /// so newer server statuses never break polling.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "notstarted" | "queued" => OperationStatus::NotStarted,
            "inprogress" | "running" | "accepted" | "started" | "creating" | "updating"
            | "deleting" | "provisioning" | "canceling" | "cancelling" => {
                OperationStatus::InProgress
            }
            "succeeded" | "success" | "completed" => OperationStatus::Succeeded,
            "failed" | "failure" => OperationStatus::Failed,
            "canceled" | "cancelled" => OperationStatus::Cancelled,
            _ => {
                log::warn!("Unrecognized operation status '{raw}', treating it as in progress");
                OperationStatus::InProgress
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::NotStarted => "NotStarted",
            OperationStatus::InProgress => "InProgress",
            OperationStatus::Succeeded => "Succeeded",
            OperationStatus::Failed => "Failed",
            OperationStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

impl From<&str> for OperationStatus {
    fn from(raw: &str) -> Self {
        OperationStatus::parse(raw)
    }
}

/// Structured error reported by a service, in the shape of the Azure error envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    /// Extracts an error from either `{"error": {...}}` or a bare `{"code", "message"}` object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let candidate = match value.get("error") {
            Some(inner) if inner.is_object() => inner,
            Some(Value::String(message)) => {
                return Some(Self::new("Error", message.clone()));
            }
            _ => value,
        };

        if candidate.get("code").is_none() && candidate.get("message").is_none() {
            return None;
        }

        serde_json::from_value(candidate.clone()).ok()
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(target) = &self.target {
            write!(f, " (target: {target})")?;
        }
        Ok(())
    }
}

/// Poll-time representation of a long-running operation as parsed from one response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusEnvelope {
    /// Opaque operation identifier, when the service reports one
    pub operation_id: Option<String>,
    pub status: OperationStatus,
    pub error: Option<ErrorDetail>,
    /// Progress payload while running; the final value once succeeded
    pub partial_result: Option<Value>,
    /// Server-suggested delay before the next poll
    pub retry_after: Option<Duration>,
    /// Where the next status check should be sent
    pub poll_url: Option<String>,
    /// Where the finished resource can be fetched
    pub resource_location: Option<String>,
}

impl StatusEnvelope {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.partial_result = Some(result);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_poll_url(mut self, poll_url: impl Into<String>) -> Self {
        self.poll_url = Some(poll_url.into());
        self
    }

    pub fn with_resource_location(mut self, location: impl Into<String>) -> Self {
        self.resource_location = Some(location.into());
        self
    }
}

/// Mutable state threaded between poll attempts of one operation.
///
/// Owned by a single [`Poller`](crate::lro::Poller) and only mutated by it.
#[derive(Debug, Clone)]
pub struct PollContext {
    pub operation_id: Option<String>,
    pub poll_url: Option<String>,
    pub resource_location: Option<String>,
    pub last_envelope: Option<StatusEnvelope>,
    /// Interval used when the server does not suggest one
    pub poll_interval: Duration,
    /// Local polling has been stopped by the caller
    pub cancelled: bool,
    /// Number of status requests issued after the initiating call
    pub poll_count: u32,
}

impl PollContext {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            operation_id: None,
            poll_url: None,
            resource_location: None,
            last_envelope: None,
            poll_interval,
            cancelled: false,
            poll_count: 0,
        }
    }

    /// Records a freshly parsed envelope, keeping previously known locations
    /// when the new response omits them.
    pub fn absorb(&mut self, envelope: StatusEnvelope) {
        if let Some(id) = &envelope.operation_id {
            self.operation_id = Some(id.clone());
        }
        if let Some(url) = &envelope.poll_url {
            self.poll_url = Some(url.clone());
        }
        if let Some(location) = &envelope.resource_location {
            self.resource_location = Some(location.clone());
        }
        self.last_envelope = Some(envelope);
    }

    /// Delay before the next poll: the server suggestion wins over the local interval.
    ///
    /// A zero suggestion (`Retry-After: 0` or a date already past) is ignored.
    pub fn next_delay(&self, fallback: Duration) -> Duration {
        self.last_envelope
            .as_ref()
            .and_then(|envelope| envelope.retry_after)
            .filter(|delay| !delay.is_zero())
            .unwrap_or(fallback)
    }

    pub fn last_error(&self) -> Option<&ErrorDetail> {
        self.last_envelope
            .as_ref()
            .and_then(|envelope| envelope.error.as_ref())
    }

    pub fn last_payload(&self) -> Option<&Value> {
        self.last_envelope
            .as_ref()
            .and_then(|envelope| envelope.partial_result.as_ref())
    }
}

/// Result of a single poll attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse<T> {
    pub status: OperationStatus,
    pub partial_result: Option<T>,
}
