use crate::common::{ClientError, ClientResult};
use crate::model::{PollContext, StatusEnvelope};
use async_trait::async_trait;
use serde_json::Value;

/// Service-specific description of a fire-and-poll operation.
///
/// Each method issues at most one request and never retries.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use client::common::ClientResult;
/// use client::lro::OperationProtocol;
/// use client::model::{OperationStatus, PollContext, StatusEnvelope};
///
/// struct AlreadyDone;
///
/// #[async_trait]
/// impl OperationProtocol for AlreadyDone {
///     async fn initiate(&self) -> ClientResult<StatusEnvelope> {
///         Ok(StatusEnvelope::new(OperationStatus::Succeeded)
///             .with_result(serde_json::json!({"id": "42"})))
///     }
///
///     async fn poll_status(&self, _context: &PollContext) -> ClientResult<StatusEnvelope> {
///         unreachable!("terminal on start")
///     }
/// }
/// ```
#[async_trait]
pub trait OperationProtocol: Send + Sync {
    /// Sends the request that starts the operation.
    async fn initiate(&self) -> ClientResult<StatusEnvelope>;

    /// Sends one status check using the locations captured so far.
    async fn poll_status(&self, context: &PollContext) -> ClientResult<StatusEnvelope>;

    /// Produces the terminal value once the operation succeeded.
    ///
    /// The default reuses the payload of the last status response.
    async fn fetch_result(&self, context: &PollContext) -> ClientResult<Value> {
        Ok(context.last_payload().cloned().unwrap_or(Value::Null))
    }

    /// Whether [`cancel`](OperationProtocol::cancel) reaches the service.
    fn supports_cancel(&self) -> bool {
        false
    }

    /// Asks the service to cancel the operation.
    async fn cancel(&self, context: &PollContext) -> ClientResult<()> {
        Err(ClientError::CancellationUnsupported {
            operation_id: context.operation_id.clone(),
        })
    }
}
