//! # API client contract.
//!
//! The dispatcher only needs one capability from the API: listing the
//! workloads currently tracked. Transport and serialization live elsewhere;
//! anything implementing [`ApiClient`] can be bound to the dispatcher.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use workvisor::{ApiClient, ApiError, Info};
//!
//! struct Fixed(Vec<Info>);
//!
//! #[async_trait]
//! impl ApiClient for Fixed {
//!     async fn list(&self, ids: &[String]) -> Result<Vec<Info>, ApiError> {
//!         Ok(self
//!             .0
//!             .iter()
//!             .filter(|info| ids.is_empty() || ids.contains(&info.id()))
//!             .cloned()
//!             .collect())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::workload::Info;

/// Shared handle to an API client.
pub type ApiClientRef = Arc<dyn ApiClient>;

/// Workload API as seen by the dispatcher and its handlers.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// Lists tracked workloads.
    ///
    /// An empty `ids` slice means "every workload".
    async fn list(&self, ids: &[String]) -> Result<Vec<Info>, ApiError>;
}
