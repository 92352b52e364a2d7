use super::OperationProtocol;
use crate::common::{ClientError, ClientResult};
use crate::model::{ErrorDetail, OperationStatus, PollContext, PollResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Tuning for a single [`Poller`].
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Interval between polls when the service does not send `Retry-After`
    pub poll_interval: Duration,
    /// When cancel is unsupported by the protocol, still stop local polling
    pub stop_local_on_unsupported_cancel: bool,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            stop_local_on_unsupported_cancel: true,
        }
    }
}

/// Handle to one long-running operation.
///
/// Every method that talks to the service takes `&mut self`, so polls against
/// one handle are strictly sequential.
///
/// # Examples
///
/// ```no_run
/// use client::lro::{OperationProtocol, Poller, PollerOptions};
/// use std::time::Duration;
///
/// # async fn run(protocol: impl OperationProtocol + 'static) -> client::common::ClientResult<()> {
/// let mut poller = Poller::<serde_json::Value>::start(protocol, PollerOptions::default()).await?;
/// let created = poller
///     .wait_for_completion(Duration::from_secs(2), Duration::from_secs(300))
///     .await?;
/// println!("{created}");
/// # Ok(())
/// # }
/// ```
pub struct Poller<T> {
    protocol: Box<dyn OperationProtocol>,
    context: PollContext,
    status: OperationStatus,
    options: PollerOptions,
    terminal_value: Option<Value>,
    cancel_token: CancellationToken,
    _result: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("status", &self.status)
            .field("operation_id", &self.context.operation_id)
            .field("poll_count", &self.context.poll_count)
            .finish()
    }
}

impl<T: DeserializeOwned> Poller<T> {
    /// Sends the initiating request and returns without polling.
    ///
    /// If the service already reports a terminal state, the handle starts in
    /// that state and no status request is ever issued.
    pub async fn start<P>(protocol: P, options: PollerOptions) -> ClientResult<Self>
    where
        P: OperationProtocol + 'static,
    {
        let envelope = protocol.initiate().await?;
        // an accepted request is running even if the service says NotStarted
        let status = if envelope.status.is_terminal() {
            envelope.status
        } else {
            OperationStatus::InProgress
        };

        let mut context = PollContext::new(options.poll_interval);
        context.absorb(envelope);

        if status.is_terminal() {
            log::info!(
                "Operation {:?} completed on start with status {status}",
                context.operation_id
            );
        } else {
            log::debug!(
                "Operation {:?} started ({status}), polling {:?}",
                context.operation_id,
                context.poll_url
            );
        }

        Ok(Self {
            protocol: Box::new(protocol),
            context,
            status,
            options,
            terminal_value: None,
            cancel_token: CancellationToken::new(),
            _result: PhantomData,
        })
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn context(&self) -> &PollContext {
        &self.context
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.context.operation_id.as_deref()
    }

    pub fn poll_count(&self) -> u32 {
        self.context.poll_count
    }

    pub fn supports_cancel(&self) -> bool {
        self.protocol.supports_cancel()
    }

    /// Token that stops [`wait_for_completion`](Self::wait_for_completion) at its
    /// next sleep. Local only: the remote operation keeps running.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Issues exactly one status request.
    ///
    /// On a terminal handle this returns the terminal status without a request.
    /// After local polling was stopped it fails with
    /// [`ClientError::OperationCancelled`]. A failed request leaves the state untouched.
    pub async fn poll(&mut self) -> ClientResult<PollResponse<T>> {
        if self.status.is_terminal() {
            return Ok(self.snapshot());
        }
        if self.cancel_token.is_cancelled() {
            self.context.cancelled = true;
        }
        if self.context.cancelled {
            return Err(self.cancelled_error());
        }

        let envelope = self.protocol.poll_status(&self.context).await?;
        self.context.poll_count += 1;

        let reported = envelope.status;
        self.context.absorb(envelope);
        self.transition(reported);

        Ok(self.snapshot())
    }

    /// Polls until a terminal state or until `timeout` elapses.
    ///
    /// A `Retry-After` suggested by the service takes precedence over
    /// `poll_interval`. Errors from individual polls are returned as-is.
    pub async fn wait_for_completion(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
    ) -> ClientResult<T> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.status {
                OperationStatus::Succeeded => return self.result().await,
                OperationStatus::Failed => return Err(self.failure()),
                OperationStatus::Cancelled => return Err(self.cancelled_error()),
                OperationStatus::NotStarted | OperationStatus::InProgress => {}
            }

            if self.context.cancelled || self.cancel_token.is_cancelled() {
                self.context.cancelled = true;
                return Err(self.cancelled_error());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error(timeout));
            }

            let delay = self.context.next_delay(poll_interval);
            if delay > remaining {
                // the next poll would land past the deadline
                self.sleep_or_cancel(remaining).await?;
                return Err(self.timeout_error(timeout));
            }

            self.sleep_or_cancel(delay).await?;
            self.poll().await?;
        }
    }

    /// Terminal value of a succeeded operation.
    ///
    /// The final fetch is issued at most once per handle.
    pub async fn result(&mut self) -> ClientResult<T> {
        match self.status {
            OperationStatus::Succeeded => {}
            OperationStatus::Failed => return Err(self.failure()),
            OperationStatus::Cancelled => return Err(self.cancelled_error()),
            status => {
                return Err(ClientError::OperationIncomplete {
                    operation_id: self.context.operation_id.clone(),
                    status,
                });
            }
        }

        let value = match &self.terminal_value {
            Some(value) => value.clone(),
            None => {
                let value = self.protocol.fetch_result(&self.context).await?;
                self.terminal_value = Some(value.clone());
                value
            }
        };

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Cancels the operation.
    ///
    /// With a cancel endpoint the service is asked to stop and the handle moves
    /// to `Cancelled`. Without one this returns
    /// [`ClientError::CancellationUnsupported`]; local polling is stopped (per
    /// [`PollerOptions::stop_local_on_unsupported_cancel`]) but the remote
    /// operation may continue running. Cancelling a terminal operation is a no-op.
    pub async fn cancel(&mut self) -> ClientResult<()> {
        if self.status.is_terminal() {
            log::debug!(
                "Ignoring cancel for operation {:?} already in {}",
                self.context.operation_id,
                self.status
            );
            return Ok(());
        }

        if !self.protocol.supports_cancel() {
            if self.options.stop_local_on_unsupported_cancel {
                self.context.cancelled = true;
                self.cancel_token.cancel();
            }
            log::warn!(
                "Operation {:?} has no cancel endpoint; the remote operation may continue running",
                self.context.operation_id
            );
            return Err(ClientError::CancellationUnsupported {
                operation_id: self.context.operation_id.clone(),
            });
        }

        self.protocol.cancel(&self.context).await?;
        self.context.cancelled = true;
        self.status = OperationStatus::Cancelled;
        self.cancel_token.cancel();
        log::info!("Operation {:?} cancelled", self.context.operation_id);
        Ok(())
    }

    fn transition(&mut self, reported: OperationStatus) {
        if self.status.is_terminal() {
            return;
        }

        let next = match reported {
            OperationStatus::NotStarted => OperationStatus::InProgress,
            other => other,
        };

        if next == self.status {
            return;
        }

        if next.is_terminal() {
            log::info!(
                "Operation {:?} reached {next} after {} polls",
                self.context.operation_id,
                self.context.poll_count
            );
        } else {
            log::debug!(
                "Operation {:?} moved from {} to {next}",
                self.context.operation_id,
                self.status
            );
        }
        self.status = next;
    }

    fn snapshot(&self) -> PollResponse<T> {
        // progress payloads often do not match the final type
        let partial_result = self
            .context
            .last_payload()
            .and_then(|value| serde_json::from_value(value.clone()).ok());

        PollResponse {
            status: self.status,
            partial_result,
        }
    }

    async fn sleep_or_cancel(&mut self, delay: Duration) -> ClientResult<()> {
        let token = self.cancel_token.clone();
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = token.cancelled() => {
                self.context.cancelled = true;
                log::info!(
                    "Stopped waiting for operation {:?}; the remote operation may continue running",
                    self.context.operation_id
                );
                Err(self.cancelled_error())
            }
        }
    }

    fn failure(&self) -> ClientError {
        let error_detail = self.context.last_error().cloned().unwrap_or_else(|| {
            ErrorDetail::new("OperationFailed", "The service reported failure without details")
        });

        ClientError::OperationFailed {
            operation_id: self.context.operation_id.clone(),
            error_detail,
        }
    }

    fn cancelled_error(&self) -> ClientError {
        ClientError::OperationCancelled {
            operation_id: self.context.operation_id.clone(),
        }
    }

    fn timeout_error(&self, timeout: Duration) -> ClientError {
        ClientError::OperationTimeout {
            operation_id: self.context.operation_id.clone(),
            timeout,
            last_status: self.status,
        }
    }
}
