//! Asynchronous parse/embed pipeline: ingestion worker (C4) and embedder &
//! indexer (C5).

pub mod embedder;
mod error;
pub mod memory;
pub mod parser;
pub mod source;
pub mod splitter;
pub mod worker;

pub use embedder::Embedder;
pub use error::IngestError;
pub use memory::{MemoryGuard, MemoryMonitor, ProcSelfStatmMonitor};
pub use source::{DocumentSource, HttpDocumentSource, ObjectStoreSource};
pub use worker::IngestionWorker;
