pub mod debounce;
pub mod http;

pub use debounce::{DebounceSender, PersistDebouncer};
pub use http::HttpPersistence;

use crate::error::PersistenceError;

/// External collaborator owning the durable Transcription Record.
///
/// Both operations are fire-and-forget from the core's perspective: failures
/// are logged and the next debounce cycle retries with current state.
#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    /// Create an empty record, returning its id.
    async fn create_record(&self, token: &str) -> Result<i64, PersistenceError>;

    /// Replace the record's text with the current transcript.
    async fn update_record(
        &self,
        token: &str,
        record_id: i64,
        text: &str,
    ) -> Result<(), PersistenceError>;
}
