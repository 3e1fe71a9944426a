//! HTTP request handlers.

pub mod artifacts;
pub mod error;
pub mod health;
pub mod index;
pub mod runs;

pub use error::ApiError;

use tiling::TilerError;

/// Run filesystem-bound pipeline work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> tiling::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TilerError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}
