//! The live resource index.
//!
//! [`ResourceFolderRepository`] catalogues every resource declared under
//! one resource root and keeps the catalogue consistent while the host
//! edits documents in place:
//!
//! - fine-grained edits flow through the incremental updater, which
//!   patches the index without re-reading the document
//! - edits too structural to patch schedule a deferred full rescan of
//!   just that document
//! - [`ResourceFolderRepository::sync`] is the barrier that flushes every
//!   scheduled rescan before the caller reads
//!
//! A generation counter advances once per observable batch of changes;
//! consumers key their own caches off it, so it must never advance for a
//! change nobody could have observed (whitespace edits, invalidation of
//! a value that was never computed).

mod incremental;
mod registry;
mod scan;
mod table;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::{Mutex, RwLock};

use crate::document::{DocumentId, EditEvent, SharedDocument};
use crate::model::{DataBindingDescriptor, ResourceFile, ResourceItem, ResourceKind};
use crate::qualifier::{parse_folder_name, FolderKind};

use incremental::Outcome;
use table::ResourceTable;

pub use registry::ResourceFolderRegistry;

type BindingMap = FnvHashMap<String, DataBindingDescriptor>;

/// The resource index for one resource root.
pub struct ResourceFolderRepository {
    module_package: String,
    data: RwLock<ResourceTable>,
    /// Documents awaiting a full rescan. Insertion is idempotent; the set
    /// drains atomically in [`Self::sync`].
    pending: Mutex<FnvHashSet<DocumentId>>,
    generation: AtomicU64,
    full_rescans: AtomicU64,
    binding_cache: Mutex<Option<(u64, Arc<BindingMap>)>>,
}

impl ResourceFolderRepository {
    /// An empty repository at generation zero.
    pub fn new(module_package: impl Into<String>) -> Self {
        Self {
            module_package: module_package.into(),
            data: RwLock::new(ResourceTable::new()),
            pending: Mutex::new(FnvHashSet::default()),
            generation: AtomicU64::new(0),
            full_rescans: AtomicU64::new(0),
            binding_cache: Mutex::new(None),
        }
    }

    pub fn module_package(&self) -> &str {
        &self.module_package
    }

    /// The current generation. Strictly monotonic; advances exactly once
    /// per observable batch of changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// How many full document rescans have run, as a diagnostic for how
    /// often the incremental rules fell back.
    pub fn full_rescan_count(&self) -> u64 {
        self.full_rescans.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Every item currently defining `(kind, name)`, in declaration
    /// order across documents.
    pub fn get(&self, kind: ResourceKind, name: &str) -> Vec<Arc<ResourceItem>> {
        self.data.read().get(kind, name).to_vec()
    }

    /// All names defined for a kind, sorted.
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        let mut names = self.data.read().names(kind);
        names.sort_unstable();
        names
    }

    /// Resolves the value of the first item defining `(kind, name)`.
    pub fn value_of(&self, kind: ResourceKind, name: &str) -> Option<String> {
        let data = self.data.read();
        let item = data.get(kind, name).first()?.clone();
        let file = data.file(item.document())?;
        let doc = file.document().read();
        item.value(&doc)
    }

    pub fn is_tracked(&self, document_id: DocumentId) -> bool {
        self.data.read().is_tracked(document_id)
    }

    // -------------------------------------------------------------------
    // Document lifecycle
    // -------------------------------------------------------------------

    /// Registers (or re-registers) a document, scanning it immediately.
    ///
    /// Documents in unrecognized folders are skipped; later edits to them
    /// are ignored too, since nothing tracks them.
    pub fn add_document(&self, document: &SharedDocument) {
        let Some(file) = scan::scan_document(document, &self.module_package) else {
            return;
        };
        let document_id = file.document_id();
        let mut data = self.data.write();
        data.remove_file_contribution(document_id);
        data.install_file(file);
        drop(data);
        self.pending.lock().remove(&document_id);
        self.bump();
    }

    /// Drops a document's whole contribution.
    pub fn remove_document(&self, document_id: DocumentId) {
        let removed = self.data.write().remove_file_contribution(document_id);
        self.pending.lock().remove(&document_id);
        if removed.is_some() {
            self.bump();
        }
    }

    /// Relocates a document to another folder.
    ///
    /// A move within the same folder kind keeps every item's identity and
    /// only refreshes qualifiers and cached values. A move across kinds
    /// (or out of the resource folders entirely) tears the contribution
    /// down and scans fresh.
    pub fn move_document(&self, document_id: DocumentId, new_folder_name: &str) {
        let mut data = self.data.write();
        let Some(file) = data.file(document_id) else {
            return;
        };
        let old_kind = file.folder_kind();
        let document = file.document().clone();

        match parse_folder_name(new_folder_name) {
            Some((kind, qualifiers, config)) if kind == old_kind => {
                document.write().set_folder_name(new_folder_name);
                if let Some(file) = data.file_mut(document_id) {
                    file.set_qualifiers(qualifiers, config);
                    // File-type item values embed the folder path.
                    for item in file.items() {
                        item.invalidate_value();
                    }
                }
                drop(data);
                self.bump();
            }
            _ => {
                data.remove_file_contribution(document_id);
                document.write().set_folder_name(new_folder_name);
                if let Some(new_file) = scan::scan_document(&document, &self.module_package) {
                    data.install_file(new_file);
                }
                self.pending.lock().remove(&document_id);
                drop(data);
                self.bump();
            }
        }
    }

    // -------------------------------------------------------------------
    // Incremental updates
    // -------------------------------------------------------------------

    /// Feeds one edit event into the index.
    ///
    /// Events for documents that already await a rescan are dropped: the
    /// rescan will re-read the final state anyway, and patching on top of
    /// a known-stale contribution could only drift.
    pub fn apply_edit(&self, document_id: DocumentId, event: &EditEvent) {
        if self.pending.lock().contains(&document_id) {
            return;
        }
        let mut data = self.data.write();
        if !data.is_tracked(document_id) {
            return;
        }
        match incremental::apply(&mut data, document_id, event) {
            Outcome::Handled { bumped } => {
                drop(data);
                if bumped {
                    self.bump();
                }
            }
            Outcome::Ignored => {}
            Outcome::Rescan => {
                drop(data);
                log::debug!("deferring full rescan of document {}", document_id.get());
                self.rescan(document_id);
            }
        }
    }

    /// Schedules a full rescan of one document. Idempotent.
    pub fn rescan(&self, document_id: DocumentId) {
        self.pending.lock().insert(document_id);
    }

    pub fn is_scan_pending(&self, document_id: DocumentId) -> bool {
        self.pending.lock().contains(&document_id)
    }

    /// The read barrier: flushes every scheduled rescan, then returns.
    ///
    /// The generation advances at most once per call, however many
    /// documents were rescanned.
    pub fn sync(&self) {
        let scheduled: Vec<DocumentId> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        if scheduled.is_empty() {
            return;
        }
        let mut data = self.data.write();
        let mut changed = false;
        for document_id in scheduled {
            changed |= self.rescan_document(&mut data, document_id);
        }
        drop(data);
        if changed {
            self.bump();
        }
    }

    /// Replaces one document's contribution with a fresh scan. Returns
    /// whether anything observable changed: a different item list, a
    /// different binding descriptor, or the loss of a computed value.
    fn rescan_document(&self, data: &mut ResourceTable, document_id: DocumentId) -> bool {
        let Some(old) = data.remove_file_contribution(document_id) else {
            return false;
        };
        self.full_rescans.fetch_add(1, Ordering::Relaxed);
        let document = old.document().clone();
        let Some(new_file) = scan::scan_document(&document, &self.module_package) else {
            return !old.items().is_empty();
        };
        let same = same_contribution(&old, &new_file);
        let observed = old.items().iter().any(|item| item.invalidate_value());
        data.install_file(new_file);
        !same || observed
    }

    // -------------------------------------------------------------------
    // Data binding
    // -------------------------------------------------------------------

    /// Every binding descriptor, keyed by qualified class name.
    ///
    /// The map is cached and keyed to the generation, so repeated calls
    /// between changes return the same allocation.
    pub fn data_binding_descriptors(&self) -> Arc<BindingMap> {
        let generation = self.generation();
        let mut cache = self.binding_cache.lock();
        if let Some((cached_generation, descriptors)) = cache.as_ref() {
            if *cached_generation == generation {
                return descriptors.clone();
            }
        }
        let data = self.data.read();
        let mut descriptors = BindingMap::default();
        for file in data.files() {
            if let Some(descriptor) = file.data_binding() {
                descriptors.insert(descriptor.qualified_name(), descriptor.clone());
            }
        }
        drop(data);
        let descriptors = Arc::new(descriptors);
        *cache = Some((generation, descriptors.clone()));
        descriptors
    }

    /// The binding descriptor of a layout document, looked up by file
    /// stem.
    pub fn data_binding_for_layout(&self, layout_name: &str) -> Option<DataBindingDescriptor> {
        let data = self.data.read();
        for file in data.files() {
            if file.folder_kind() != FolderKind::Layout {
                continue;
            }
            let is_match = file.document().read().file_stem() == layout_name;
            if is_match {
                return file.data_binding().cloned();
            }
        }
        None
    }

    // -------------------------------------------------------------------
    // Test support
    // -------------------------------------------------------------------

    /// One document's `(kind, name)` contribution in declaration order.
    #[cfg(test)]
    fn contribution(&self, document_id: DocumentId) -> Vec<(ResourceKind, String)> {
        self.data
            .read()
            .file(document_id)
            .map(|file| {
                file.items()
                    .iter()
                    .map(|item| (item.kind(), item.name().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert!(self.data.read().check_consistency());
    }
}

fn same_contribution(old: &ResourceFile, new: &ResourceFile) -> bool {
    old.items().len() == new.items().len()
        && old
            .items()
            .iter()
            .zip(new.items())
            .all(|(a, b)| a.kind() == b.kind() && a.name() == b.name())
        && old.data_binding() == new.data_binding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};

    fn strings_doc(folder: &str) -> (SharedDocument, NodeId, NodeId) {
        let mut doc = Document::new(folder, "strings.xml", "resources");
        let root = doc.root();
        let string = doc.create_element("string");
        doc.set_attribute(string, "name", "app_name").unwrap();
        let text = doc.create_text("Foo");
        doc.append_child(string, text).unwrap();
        doc.append_child(root, string).unwrap();
        (doc.shared(), string, text)
    }

    #[test]
    fn edit_then_rename_lifecycle() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, string, text) = strings_doc("values");
        repository.add_document(&document);
        let document_id = document.read().id();

        assert_eq!(
            repository.value_of(ResourceKind::String, "app_name").as_deref(),
            Some("Foo")
        );
        let original = repository.get(ResourceKind::String, "app_name")[0].clone();
        let generation = repository.generation();

        // Text edit: same item identity, new value, one bump.
        let event = document.write().set_text(text, "Bar").unwrap();
        repository.apply_edit(document_id, &event);
        assert_eq!(repository.generation(), generation + 1);
        let edited = repository.get(ResourceKind::String, "app_name")[0].clone();
        assert!(Arc::ptr_eq(&original, &edited));
        assert_eq!(
            repository.value_of(ResourceKind::String, "app_name").as_deref(),
            Some("Bar")
        );

        // Rename: new item identity under the new name.
        let event = document
            .write()
            .set_attribute(string, "name", "app_title")
            .unwrap();
        repository.apply_edit(document_id, &event);
        assert!(repository.get(ResourceKind::String, "app_name").is_empty());
        let renamed = repository.get(ResourceKind::String, "app_title");
        assert_eq!(renamed.len(), 1);
        assert!(!Arc::ptr_eq(&renamed[0], &original));
        assert_eq!(
            repository.value_of(ResourceKind::String, "app_title").as_deref(),
            Some("Bar")
        );
        repository.assert_consistent();
    }

    #[test]
    fn unobserved_edits_do_not_advance_the_generation() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, text) = strings_doc("values");
        repository.add_document(&document);
        let document_id = document.read().id();
        let generation = repository.generation();

        // Nobody computed the value, so discarding it is unobservable.
        let event = document.write().set_text(text, "Bar").unwrap();
        repository.apply_edit(document_id, &event);
        assert_eq!(repository.generation(), generation);

        // Whitespace under the root never matters.
        let event = {
            let mut doc = document.write();
            let root = doc.root();
            let blank = doc.create_text("\n");
            doc.append_child(root, blank).unwrap()
        };
        repository.apply_edit(document_id, &event);
        assert_eq!(repository.generation(), generation);
    }

    #[test]
    fn scheduled_rescan_supersedes_later_edits_until_sync() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, text) = strings_doc("values");
        repository.add_document(&document);
        let document_id = document.read().id();

        repository.rescan(document_id);
        repository.rescan(document_id);
        assert!(repository.is_scan_pending(document_id));

        // This edit is dropped; the rescan will pick it up.
        let event = document.write().set_text(text, "Bar").unwrap();
        repository.apply_edit(document_id, &event);

        repository.sync();
        assert!(!repository.is_scan_pending(document_id));
        // Idempotent scheduling: one rescan, not two.
        assert_eq!(repository.full_rescan_count(), 1);
        assert_eq!(
            repository.value_of(ResourceKind::String, "app_name").as_deref(),
            Some("Bar")
        );
        repository.assert_consistent();
    }

    #[test]
    fn sync_without_pending_work_is_free() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, _) = strings_doc("values");
        repository.add_document(&document);
        let generation = repository.generation();
        repository.sync();
        assert_eq!(repository.generation(), generation);
        assert_eq!(repository.full_rescan_count(), 0);
    }

    #[test]
    fn structural_fallback_roundtrips_through_sync() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, _) = strings_doc("values");
        repository.add_document(&document);
        let document_id = document.read().id();

        // declare-styleable additions are out of the fast paths' reach.
        let event = {
            let mut doc = document.write();
            let root = doc.root();
            let styleable = doc.create_element("declare-styleable");
            doc.set_attribute(styleable, "name", "PieChart").unwrap();
            let attr = doc.create_element("attr");
            doc.set_attribute(attr, "name", "sliceColor").unwrap();
            doc.set_attribute(attr, "format", "color").unwrap();
            doc.append_child(styleable, attr).unwrap();
            doc.append_child(root, styleable).unwrap()
        };
        repository.apply_edit(document_id, &event);
        assert!(repository.is_scan_pending(document_id));
        assert!(repository
            .get(ResourceKind::DeclareStyleable, "PieChart")
            .is_empty());

        repository.sync();
        assert_eq!(
            repository.get(ResourceKind::DeclareStyleable, "PieChart").len(),
            1
        );
        assert_eq!(repository.get(ResourceKind::Attr, "sliceColor").len(), 1);
        repository.assert_consistent();
    }

    #[test]
    fn duplicate_explicit_ids_survive_rescan() {
        let repository = ResourceFolderRepository::new("com.example");
        let mut doc = Document::new("layout", "main.xml", "LinearLayout");
        let root = doc.root();
        let ok = doc.create_element("Button");
        doc.set_attribute(ok, "android:id", "@+id/ok").unwrap();
        doc.append_child(root, ok).unwrap();
        let document = doc.shared();
        repository.add_document(&document);
        let document_id = document.read().id();
        assert_eq!(repository.get(ResourceKind::Id, "ok").len(), 1);

        // A second element claims the same explicit id.
        let event = {
            let mut doc = document.write();
            let root = doc.root();
            let twin = doc.create_element("Button");
            doc.set_attribute(twin, "android:id", "@+id/ok").unwrap();
            doc.append_child(root, twin).unwrap()
        };
        repository.apply_edit(document_id, &event);
        assert!(repository.is_scan_pending(document_id));
        repository.sync();

        // One item per definition, same as a from-scratch scan.
        assert_eq!(repository.get(ResourceKind::Id, "ok").len(), 2);
        repository.assert_consistent();
    }

    #[test]
    fn move_within_kind_preserves_item_identity() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, _) = strings_doc("values-en");
        repository.add_document(&document);
        let document_id = document.read().id();
        let item = repository.get(ResourceKind::String, "app_name")[0].clone();
        let generation = repository.generation();

        repository.move_document(document_id, "values-en-rUS");

        assert_eq!(repository.generation(), generation + 1);
        let after = repository.get(ResourceKind::String, "app_name");
        assert_eq!(after.len(), 1);
        assert!(Arc::ptr_eq(&after[0], &item));
        assert_eq!(document.read().folder_name(), "values-en-rUS");
        repository.assert_consistent();
    }

    #[test]
    fn move_across_kinds_rebuilds_the_contribution() {
        let repository = ResourceFolderRepository::new("com.example");
        let document = Document::new("drawable", "splash.xml", "shape").shared();
        repository.add_document(&document);
        let document_id = document.read().id();
        assert_eq!(repository.get(ResourceKind::Drawable, "splash").len(), 1);

        repository.move_document(document_id, "raw");
        assert!(repository.get(ResourceKind::Drawable, "splash").is_empty());
        assert_eq!(repository.get(ResourceKind::Raw, "splash").len(), 1);
        assert_eq!(
            repository.value_of(ResourceKind::Raw, "splash").as_deref(),
            Some("raw/splash.xml")
        );
        repository.assert_consistent();
    }

    #[test]
    fn move_out_of_resource_folders_drops_the_contribution() {
        let repository = ResourceFolderRepository::new("com.example");
        let document = Document::new("drawable", "splash.xml", "shape").shared();
        repository.add_document(&document);
        let document_id = document.read().id();

        repository.move_document(document_id, "backup");
        assert!(repository.get(ResourceKind::Drawable, "splash").is_empty());
        assert!(!repository.is_tracked(document_id));
    }

    #[test]
    fn remove_document_drops_everything() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, _) = strings_doc("values");
        repository.add_document(&document);
        let document_id = document.read().id();
        let generation = repository.generation();

        repository.remove_document(document_id);
        assert!(repository.get(ResourceKind::String, "app_name").is_empty());
        assert_eq!(repository.generation(), generation + 1);

        // Double removal is a no-op, generation included.
        repository.remove_document(document_id);
        assert_eq!(repository.generation(), generation + 1);
    }

    #[test]
    fn edits_to_untracked_documents_are_ignored() {
        let repository = ResourceFolderRepository::new("com.example");
        let (document, _, text) = strings_doc("values");
        // Never added.
        let document_id = document.read().id();
        let event = document.write().set_text(text, "Bar").unwrap();
        repository.apply_edit(document_id, &event);
        assert_eq!(repository.generation(), 0);
    }

    #[test]
    fn names_are_sorted_and_deduplicated() {
        let repository = ResourceFolderRepository::new("com.example");
        let (first, _, _) = strings_doc("values");
        let (second, _, _) = strings_doc("values-de");
        repository.add_document(&first);
        repository.add_document(&second);

        assert_eq!(
            repository.names(ResourceKind::String),
            vec!["app_name".to_string()]
        );
        assert_eq!(repository.get(ResourceKind::String, "app_name").len(), 2);
    }

    #[test]
    fn binding_descriptors_cached_per_generation() {
        let repository = ResourceFolderRepository::new("com.example");
        let mut doc = Document::new("layout", "main_activity.xml", "layout");
        let data = doc.create_element("data");
        doc.append_child(doc.root(), data).unwrap();
        let document = doc.shared();
        repository.add_document(&document);
        let document_id = document.read().id();

        let first = repository.data_binding_descriptors();
        assert!(first.contains_key("com.example.databinding.MainActivityBinding"));
        let second = repository.data_binding_descriptors();
        assert!(Arc::ptr_eq(&first, &second));

        // A variable declaration changes the descriptor set.
        let event = {
            let mut doc = document.write();
            let variable = doc.create_element("variable");
            doc.set_attribute(variable, "name", "user").unwrap();
            doc.set_attribute(variable, "type", "com.example.User").unwrap();
            doc.append_child(data, variable).unwrap()
        };
        repository.apply_edit(document_id, &event);
        repository.sync();

        let third = repository.data_binding_descriptors();
        assert!(!Arc::ptr_eq(&second, &third));
        let descriptor = &third["com.example.databinding.MainActivityBinding"];
        assert_eq!(descriptor.variables.len(), 1);

        assert_eq!(
            repository
                .data_binding_for_layout("main_activity")
                .unwrap()
                .variables[0]
                .name,
            "user"
        );
    }

    /// `(kind, name)` multiset of one contribution, sorted. Completing
    /// a nameless element via a later rename appends its item, so
    /// comparisons are order-insensitive.
    fn sorted_contribution(
        items: impl IntoIterator<Item = (ResourceKind, String)>,
    ) -> Vec<(&'static str, String)> {
        let mut out: Vec<(&'static str, String)> = items
            .into_iter()
            .map(|(kind, name)| (kind.as_str(), name))
            .collect();
        out.sort();
        out
    }

    mod equivalence {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add { name: u8, value: u8, named: bool },
            Remove { slot: u8 },
            SetText { slot: u8, value: u8 },
            Rename { slot: u8, name: u8 },
            Observe { slot: u8 },
            Sync,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (any::<u8>(), any::<u8>(), any::<bool>())
                    .prop_map(|(name, value, named)| Op::Add { name, value, named }),
                any::<u8>().prop_map(|slot| Op::Remove { slot }),
                (any::<u8>(), any::<u8>())
                    .prop_map(|(slot, value)| Op::SetText { slot, value }),
                (any::<u8>(), any::<u8>()).prop_map(|(slot, name)| Op::Rename { slot, name }),
                any::<u8>().prop_map(|slot| Op::Observe { slot }),
                Just(Op::Sync),
            ]
        }

        // Small pools force name collisions and same-name renames.
        fn name_for(index: u8) -> String {
            format!("name_{}", index % 6)
        }

        fn value_for(index: u8) -> String {
            format!("value {}", index % 4)
        }

        proptest! {
            /// After any edit sequence plus a sync, the incremental index
            /// matches a from-scratch scan of the final document, and the
            /// generation never ran backwards.
            #[test]
            fn incremental_updates_match_full_scan(
                ops in proptest::collection::vec(op_strategy(), 1..32)
            ) {
                let repository = ResourceFolderRepository::new("com.example");
                let document = Document::new("values", "strings.xml", "resources").shared();
                repository.add_document(&document);
                let document_id = document.read().id();

                // Live top-level elements with their text children.
                let mut slots: Vec<(NodeId, NodeId)> = Vec::new();
                let mut last_generation = repository.generation();

                for op in ops {
                    let event = match op {
                        Op::Add { name, value, named } => {
                            let mut doc = document.write();
                            let root = doc.root();
                            let element = doc.create_element("string");
                            if named {
                                doc.set_attribute(element, "name", name_for(name)).unwrap();
                            }
                            let text = doc.create_text(value_for(value));
                            doc.append_child(element, text).unwrap();
                            let event = doc.append_child(root, element).unwrap();
                            drop(doc);
                            slots.push((element, text));
                            Some(event)
                        }
                        Op::Remove { slot } => {
                            if slots.is_empty() {
                                None
                            } else {
                                let (element, _) =
                                    slots.remove(slot as usize % slots.len());
                                Some(document.write().remove_node(element).unwrap())
                            }
                        }
                        Op::SetText { slot, value } => slots
                            .get(slot as usize % slots.len().max(1))
                            .map(|&(_, text)| {
                                document.write().set_text(text, value_for(value)).unwrap()
                            }),
                        Op::Rename { slot, name } => slots
                            .get(slot as usize % slots.len().max(1))
                            .map(|&(element, _)| {
                                document
                                    .write()
                                    .set_attribute(element, "name", name_for(name))
                                    .unwrap()
                            }),
                        Op::Observe { slot } => {
                            // Populate a value cache so invalidation paths
                            // are exercised.
                            let names = repository.names(ResourceKind::String);
                            if let Some(name) = names.get(slot as usize % names.len().max(1)) {
                                repository.value_of(ResourceKind::String, name);
                            }
                            None
                        }
                        Op::Sync => {
                            // Intermediate barrier: the index must already
                            // match a from-scratch scan here.
                            repository.sync();
                            let fresh = scan::scan_document(&document, "com.example").unwrap();
                            let expected = sorted_contribution(
                                fresh
                                    .items()
                                    .iter()
                                    .map(|item| (item.kind(), item.name().to_string())),
                            );
                            prop_assert_eq!(
                                sorted_contribution(repository.contribution(document_id)),
                                expected
                            );
                            None
                        }
                    };
                    if let Some(event) = event {
                        repository.apply_edit(document_id, &event);
                    }
                    let generation = repository.generation();
                    prop_assert!(generation >= last_generation);
                    last_generation = generation;
                }

                repository.sync();
                repository.assert_consistent();

                let fresh = scan::scan_document(&document, "com.example").unwrap();
                let expected = sorted_contribution(
                    fresh
                        .items()
                        .iter()
                        .map(|item| (item.kind(), item.name().to_string())),
                );
                prop_assert_eq!(
                    sorted_contribution(repository.contribution(document_id)),
                    expected
                );

                // Every surviving name resolves to the document's text.
                for (element, _) in &slots {
                    let doc = document.read();
                    let Some(name) = doc.attribute(*element, "name") else {
                        continue;
                    };
                    let name = name.to_string();
                    let expected = doc.text_content(*element);
                    drop(doc);
                    let values: Vec<String> = repository
                        .get(ResourceKind::String, &name)
                        .iter()
                        .filter_map(|item| {
                            item.node().filter(|&node| node == *element).map(|_| {
                                item.value(&document.read()).unwrap_or_default()
                            })
                        })
                        .collect();
                    prop_assert_eq!(values, vec![expected]);
                }
            }
        }
    }

    mod layout_equivalence {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            AddView { parent: u8, id: Option<u8>, reference: Option<u8> },
            RemoveView { slot: u8 },
            SetId { slot: u8, id: u8, declares: bool },
            ClearId { slot: u8 },
            SetReference { slot: u8, id: u8 },
            Sync,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (
                    any::<u8>(),
                    proptest::option::of(any::<u8>()),
                    proptest::option::of(any::<u8>()),
                )
                    .prop_map(|(parent, id, reference)| Op::AddView { parent, id, reference }),
                any::<u8>().prop_map(|slot| Op::RemoveView { slot }),
                (any::<u8>(), any::<u8>(), any::<bool>())
                    .prop_map(|(slot, id, declares)| Op::SetId { slot, id, declares }),
                any::<u8>().prop_map(|slot| Op::ClearId { slot }),
                (any::<u8>(), any::<u8>()).prop_map(|(slot, id)| Op::SetReference { slot, id }),
                Just(Op::Sync),
            ]
        }

        // Four names force duplicate definitions and reference overlap.
        fn id_for(index: u8) -> String {
            format!("id_{}", index % 4)
        }

        proptest! {
            /// Same property as the values suite, over the id fast paths:
            /// subtree adds and removals, definitions appearing, renaming
            /// and disappearing, plain and forward references.
            #[test]
            fn layout_id_patches_match_full_scan(
                ops in proptest::collection::vec(op_strategy(), 1..32)
            ) {
                let repository = ResourceFolderRepository::new("com.example");
                let document = Document::new("layout", "main.xml", "LinearLayout").shared();
                repository.add_document(&document);
                let document_id = document.read().id();

                // Live element nodes, top-level or nested.
                let mut slots: Vec<NodeId> = Vec::new();
                let mut last_generation = repository.generation();

                for op in ops {
                    let event = match op {
                        Op::AddView { parent, id, reference } => {
                            let mut doc = document.write();
                            let index = parent as usize % (slots.len() + 1);
                            let parent = if index == slots.len() {
                                doc.root()
                            } else {
                                slots[index]
                            };
                            let element = doc.create_element("View");
                            if let Some(id) = id {
                                doc.set_attribute(
                                    element,
                                    "android:id",
                                    format!("@+id/{}", id_for(id)),
                                )
                                .unwrap();
                            }
                            if let Some(reference) = reference {
                                doc.set_attribute(
                                    element,
                                    "android:layout_below",
                                    format!("@+id/{}", id_for(reference)),
                                )
                                .unwrap();
                            }
                            let event = doc.append_child(parent, element).unwrap();
                            drop(doc);
                            slots.push(element);
                            Some(event)
                        }
                        Op::RemoveView { slot } => {
                            if slots.is_empty() {
                                None
                            } else {
                                let element = slots[slot as usize % slots.len()];
                                let event = document.write().remove_node(element).unwrap();
                                let doc = document.read();
                                slots.retain(|&node| doc.contains(node));
                                Some(event)
                            }
                        }
                        Op::SetId { slot, id, declares } => slots
                            .get(slot as usize % slots.len().max(1))
                            .map(|&element| {
                                let prefix = if declares { "@+id/" } else { "@id/" };
                                document
                                    .write()
                                    .set_attribute(
                                        element,
                                        "android:id",
                                        format!("{prefix}{}", id_for(id)),
                                    )
                                    .unwrap()
                            }),
                        Op::ClearId { slot } => slots
                            .get(slot as usize % slots.len().max(1))
                            .map(|&element| {
                                document
                                    .write()
                                    .set_attribute(element, "android:id", "none")
                                    .unwrap()
                            }),
                        Op::SetReference { slot, id } => slots
                            .get(slot as usize % slots.len().max(1))
                            .map(|&element| {
                                document
                                    .write()
                                    .set_attribute(
                                        element,
                                        "android:layout_below",
                                        format!("@+id/{}", id_for(id)),
                                    )
                                    .unwrap()
                            }),
                        Op::Sync => {
                            // Intermediate barrier: the index must already
                            // match a from-scratch scan here.
                            repository.sync();
                            let fresh = scan::scan_document(&document, "com.example").unwrap();
                            let expected = sorted_contribution(
                                fresh
                                    .items()
                                    .iter()
                                    .map(|item| (item.kind(), item.name().to_string())),
                            );
                            prop_assert_eq!(
                                sorted_contribution(repository.contribution(document_id)),
                                expected
                            );
                            None
                        }
                    };
                    if let Some(event) = event {
                        repository.apply_edit(document_id, &event);
                    }
                    let generation = repository.generation();
                    prop_assert!(generation >= last_generation);
                    last_generation = generation;
                }

                repository.sync();
                repository.assert_consistent();

                let fresh = scan::scan_document(&document, "com.example").unwrap();
                let expected = sorted_contribution(
                    fresh
                        .items()
                        .iter()
                        .map(|item| (item.kind(), item.name().to_string())),
                );
                prop_assert_eq!(
                    sorted_contribution(repository.contribution(document_id)),
                    expected
                );
            }
        }
    }
}
