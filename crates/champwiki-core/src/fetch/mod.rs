//! Network acquisition: rate limiting, retries, and cache-aware fetching.
//!
//! ## Request path
//!
//! ```text
//! PageFetcher::fetch
//!   ├─ CacheStore::get ── fresh hit ──▶ return (no network)
//!   └─ RetryPolicy::run
//!        └─ per attempt: RateLimiter::acquire(host) → HttpTransport::get → status check
//!   └─ CacheStore::put
//! ```

mod fetcher;
mod rate_limit;
mod retry;
mod transport;

pub use fetcher::{FetchedPage, PageFetcher};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, check_status};
