//! Index Core data structures.
//!
//! Two maps kept in lockstep: the kind/name multimap used by lookups and
//! the per-document [`ResourceFile`] contribution records. Every item
//! reachable from one must be reachable from the other; helpers here keep
//! that invariant across single mutations, while multi-step patches hold
//! the repository's write lock for their whole duration.

use std::sync::Arc;

use fnv::FnvHashMap;

use crate::document::DocumentId;
use crate::model::{ResourceFile, ResourceItem, ResourceKind};

/// The kind/name multimap plus the document contribution map.
///
/// Per-name item lists preserve insertion order: later-declared same-name
/// items are what override resolution (an external consumer's concern)
/// keys off.
#[derive(Debug, Default)]
pub struct ResourceTable {
    items: FnvHashMap<ResourceKind, FnvHashMap<String, Vec<Arc<ResourceItem>>>>,
    files: FnvHashMap<DocumentId, ResourceFile>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only lookup; returns an empty slice for unknown names.
    pub fn get(&self, kind: ResourceKind, name: &str) -> &[Arc<ResourceItem>] {
        self.items
            .get(&kind)
            .and_then(|names| names.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Appends an item to its kind/name slot.
    pub fn put(&mut self, item: Arc<ResourceItem>) {
        self.items
            .entry(item.kind())
            .or_default()
            .entry(item.name().to_string())
            .or_default()
            .push(item);
    }

    /// Removes one exact item (by pointer identity) from its slot.
    pub fn remove_exact(&mut self, item: &Arc<ResourceItem>) -> bool {
        let Some(names) = self.items.get_mut(&item.kind()) else {
            return false;
        };
        let Some(slot) = names.get_mut(item.name()) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|existing| !Arc::ptr_eq(existing, item));
        let removed = slot.len() != before;
        if slot.is_empty() {
            names.remove(item.name());
        }
        removed
    }

    /// Removes every item of `(kind, name)` contributed by `document`.
    ///
    /// The per-name slot can hold same-name duplicates from several
    /// documents; only this document's are dropped.
    pub fn remove_from_document(
        &mut self,
        kind: ResourceKind,
        name: &str,
        document: DocumentId,
    ) -> bool {
        let Some(names) = self.items.get_mut(&kind) else {
            return false;
        };
        let Some(slot) = names.get_mut(name) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|existing| existing.document() != document);
        let removed = slot.len() != before;
        if slot.is_empty() {
            names.remove(name);
        }
        removed
    }

    pub fn file(&self, document: DocumentId) -> Option<&ResourceFile> {
        self.files.get(&document)
    }

    pub fn file_mut(&mut self, document: DocumentId) -> Option<&mut ResourceFile> {
        self.files.get_mut(&document)
    }

    pub fn files(&self) -> impl Iterator<Item = &ResourceFile> {
        self.files.values()
    }

    pub fn is_tracked(&self, document: DocumentId) -> bool {
        self.files.contains_key(&document)
    }

    /// Installs a freshly scanned contribution record, inserting all of
    /// its items into the multimap.
    pub fn install_file(&mut self, file: ResourceFile) {
        for item in file.items() {
            self.put(item.clone());
        }
        self.files.insert(file.document_id(), file);
    }

    /// Tears down a document's whole contribution: removes its record and
    /// every one of its items from the multimap.
    pub fn remove_file_contribution(&mut self, document: DocumentId) -> Option<ResourceFile> {
        let file = self.files.remove(&document)?;
        for item in file.items() {
            self.remove_exact(item);
        }
        Some(file)
    }

    /// All names currently defined for a kind, in arbitrary order.
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.items
            .get(&kind)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Verifies the bidirectional no-orphan invariant (test support).
    #[cfg(test)]
    pub fn check_consistency(&self) -> bool {
        // Every multimap item belongs to exactly one file's item list.
        for names in self.items.values() {
            for slot in names.values() {
                for item in slot {
                    let Some(file) = self.files.get(&item.document()) else {
                        return false;
                    };
                    let owned = file
                        .items()
                        .iter()
                        .filter(|owned| Arc::ptr_eq(owned, item))
                        .count();
                    if owned != 1 {
                        return false;
                    }
                }
            }
        }
        // Every file item is reachable from the multimap.
        for file in self.files.values() {
            for item in file.items() {
                let reachable = self
                    .get(item.kind(), item.name())
                    .iter()
                    .any(|existing| Arc::ptr_eq(existing, item));
                if !reachable {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::qualifier::{Configuration, FolderKind};

    fn file_with_items(names: &[&str]) -> (ResourceFile, DocumentId) {
        let doc = Document::new("values", "strings.xml", "resources").shared();
        let id = doc.read().id();
        let mut file = ResourceFile::new(doc, FolderKind::Values, "", Configuration::default());
        for name in names {
            file.add_item(ResourceItem::for_file(*name, ResourceKind::String, id));
        }
        (file, id)
    }

    #[test]
    fn install_and_lookup() {
        let mut table = ResourceTable::new();
        let (file, id) = file_with_items(&["a", "b"]);
        table.install_file(file);

        assert_eq!(table.get(ResourceKind::String, "a").len(), 1);
        assert_eq!(table.get(ResourceKind::String, "missing").len(), 0);
        assert!(table.is_tracked(id));
        assert!(table.check_consistency());
    }

    #[test]
    fn remove_contribution_clears_multimap() {
        let mut table = ResourceTable::new();
        let (file, id) = file_with_items(&["a"]);
        table.install_file(file);

        let removed = table.remove_file_contribution(id).unwrap();
        assert_eq!(removed.items().len(), 1);
        assert!(table.get(ResourceKind::String, "a").is_empty());
        assert!(!table.is_tracked(id));
        assert!(table.check_consistency());
    }

    #[test]
    fn same_name_items_from_two_documents() {
        let mut table = ResourceTable::new();
        let (first, first_id) = file_with_items(&["shared"]);
        let (second, _) = file_with_items(&["shared"]);
        table.install_file(first);
        table.install_file(second);

        assert_eq!(table.get(ResourceKind::String, "shared").len(), 2);

        assert!(table.remove_from_document(ResourceKind::String, "shared", first_id));
        let remaining = table.get(ResourceKind::String, "shared");
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].document(), first_id);
    }

    #[test]
    fn insertion_order_preserved_per_name() {
        let mut table = ResourceTable::new();
        let (first, first_id) = file_with_items(&["dup"]);
        let (second, second_id) = file_with_items(&["dup"]);
        table.install_file(first);
        table.install_file(second);

        let slot = table.get(ResourceKind::String, "dup");
        assert_eq!(slot[0].document(), first_id);
        assert_eq!(slot[1].document(), second_id);
    }
}
