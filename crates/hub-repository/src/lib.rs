//! Repository traits over the relational store described in spec.md §6:
//! `users`, `organization_tags`, `file_upload`, `chunk_info`,
//! `document_vectors` (the latter lives in `hub-search`, not here).
//!
//! Every trait is `async_trait` and `Send + Sync` so a real SQL backend can
//! be dropped in without touching call sites; the in-memory implementation
//! in `memory` backs unit tests across the workspace.

mod error;
pub mod memory;
mod repositories;

pub use error::RepositoryError;
pub use repositories::{ChunkRepository, FileRepository, PassageRepository, TagRepository, UserRepository};
