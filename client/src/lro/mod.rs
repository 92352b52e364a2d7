//! Long-running-operation poller.
//!
//! An [`OperationProtocol`] describes how a service starts an operation, reports
//! its status and (optionally) cancels it. A [`Poller`] drives that protocol
//! through the state machine
//!
//! ```text
//! NotStarted -> InProgress -> { Succeeded | Failed | Cancelled }
//! ```
//!
//! The poller never retries. A failed poll request surfaces to the caller and
//! leaves the operation state untouched; only a server-reported `Failed`
//! status moves the operation to `Failed`.

pub mod poller;
pub mod protocol;

pub use poller::{Poller, PollerOptions};
pub use protocol::OperationProtocol;
