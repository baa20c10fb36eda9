//! Remote user store: the four `/users` operations behind one async trait.
//!
//! Components receive a store as `Arc<dyn UserStore>` instead of reaching
//! for a global client, so tests and `--offline` can swap in
//! [`MemoryUserStore`].

mod http;
mod memory;
mod model;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreResult;

pub use http::HttpUserStore;
pub use memory::{Failure, MemoryUserStore, Operation};
pub use model::{Address, Draft, Field, UserId, UserRecord};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
/// Fixed per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch every user.
    async fn list(&self) -> StoreResult<Vec<UserRecord>>;

    /// Submit a draft; the server assigns the id.
    async fn create(&self, draft: &Draft) -> StoreResult<UserRecord>;

    /// Update `id` and return the server's canonical version.
    async fn update(&self, id: UserId, record: &UserRecord) -> StoreResult<UserRecord>;

    /// Delete `id` and return the HTTP status. A non-2xx status is not an
    /// error here; the caller decides whether to roll back.
    async fn delete(&self, id: UserId) -> StoreResult<u16>;
}

/// Connection settings for [`HttpUserStore`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// True when `status` is in the 2xx range.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
