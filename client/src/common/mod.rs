pub mod errors;
pub mod rate_limiter;

pub use errors::{ClientError, ClientResult};
pub use rate_limiter::{RateLimitError, RateLimiter};
