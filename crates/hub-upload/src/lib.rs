//! Resumable chunked upload (C2 chunk ledger, C3 upload coordinator).

mod broker;
mod coordinator;
mod error;
mod filetype;
mod ledger;

pub use broker::{InMemoryBroker, PostMergeTask, TaskConsumer, TaskQueue};
pub use coordinator::{chunk_size, UploadCoordinator};
pub use error::UploadError;
pub use filetype::{validate_extension, DENY_LISTED_EXTENSIONS, SUPPORTED_EXTENSIONS};
pub use ledger::{expected_chunk_count, ChunkLedger, CHUNK_SIZE};
