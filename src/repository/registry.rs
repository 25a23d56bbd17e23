//! Process-wide registry of repositories, one per resource root.

use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use crate::document::SharedDocument;

use super::ResourceFolderRepository;

/// Hands out the shared [`ResourceFolderRepository`] for a resource root,
/// creating it on first request. Roots are identified by an opaque key
/// the host chooses (typically the root's path).
#[derive(Default)]
pub struct ResourceFolderRegistry {
    repositories: Mutex<FnvHashMap<String, Arc<ResourceFolderRepository>>>,
}

impl ResourceFolderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The repository for `root`, created when it does not exist yet by
    /// scanning `documents` under `module_package`. Concurrent callers
    /// observe the same instance; `documents` is only consumed on
    /// creation.
    pub fn get_or_create(
        &self,
        root: impl Into<String>,
        module_package: &str,
        documents: impl IntoIterator<Item = SharedDocument>,
    ) -> Arc<ResourceFolderRepository> {
        self.repositories
            .lock()
            .entry(root.into())
            .or_insert_with(|| {
                let repository = ResourceFolderRepository::new(module_package);
                for document in documents {
                    repository.add_document(&document);
                }
                Arc::new(repository)
            })
            .clone()
    }

    pub fn get(&self, root: &str) -> Option<Arc<ResourceFolderRepository>> {
        self.repositories.lock().get(root).cloned()
    }

    /// Forgets a root. Existing handles stay usable; the next
    /// [`Self::get_or_create`] builds a fresh repository.
    pub fn remove(&self, root: &str) -> Option<Arc<ResourceFolderRepository>> {
        self.repositories.lock().remove(root)
    }

    pub fn len(&self) -> usize {
        self.repositories.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.lock().is_empty()
    }
}
