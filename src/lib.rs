//! Incremental resource indexing library.
//!
//! This crate provides the core resource catalogue functionality:
//! - In-memory document model with fine-grained edit events
//! - Folder name and qualifier configuration parsing
//! - Live kind/name index with incremental patching
//! - Deferred full-rescan scheduling with a sync barrier
//! - Data-binding descriptor derivation for layout documents

pub mod document;
pub mod error;
pub mod model;
pub mod qualifier;
pub mod repository;

// Re-export main types
pub use document::{Document, DocumentId, EditEvent, NodeId, SharedDocument};
pub use error::{IndexError, Result};
pub use model::{DataBindingDescriptor, ResourceItem, ResourceKind};
pub use qualifier::{Configuration, FolderKind};
pub use repository::{ResourceFolderRegistry, ResourceFolderRepository};
