//! Incremental Updater: patches the index in place for fine-grained edits.
//!
//! Each edit event is classified against the document's folder kind,
//! first match wins. Anything a rule cannot patch exactly falls back to
//! [`Outcome::Rescan`], which the repository turns into a deferred full
//! rescan of that one document. Falling back is always correct; the rules
//! here exist to keep the common editing loops cheap.

use std::sync::Arc;

use crate::document::{local_name, Document, DocumentId, EditEvent, NodeId};
use crate::model::{ResourceItem, ResourceKind};
use crate::qualifier::FolderKind;

use super::scan::{
    collect_ids, is_item_element, DATA_BINDING_ATTRS, DATA_BINDING_TAGS, ID_PREFIX,
    NEW_ID_PREFIX,
};
use super::table::ResourceTable;

/// What classification decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The index was patched in place. `bumped` reports whether anything
    /// observable changed; unobserved cache drops do not count.
    Handled { bumped: bool },
    /// The edit cannot affect the index.
    Ignored,
    /// Too structural to patch; schedule a full rescan of the document.
    Rescan,
}

/// Classifies one edit and patches the table where a rule applies.
///
/// The caller holds the repository write lock and has checked that the
/// document is tracked.
pub(crate) fn apply(
    table: &mut ResourceTable,
    document_id: DocumentId,
    event: &EditEvent,
) -> Outcome {
    let Some(file) = table.file(document_id) else {
        return Outcome::Rescan;
    };
    let folder_kind = file.folder_kind();
    let document = file.document().clone();
    let doc = document.read();

    match folder_kind {
        FolderKind::Values => classify_values(table, document_id, &doc, event),
        kind if kind.is_id_generating() => {
            classify_id_generating(table, document_id, &doc, folder_kind, event)
        }
        _ => classify_plain_file(table, document_id),
    }
}

// ---------------------------------------------------------------------
// Values documents
// ---------------------------------------------------------------------

fn classify_values(
    table: &mut ResourceTable,
    document_id: DocumentId,
    doc: &Document,
    event: &EditEvent,
) -> Outcome {
    match event {
        EditEvent::NodeAdded { parent, child } => {
            if !doc.contains(*child) {
                return Outcome::Rescan;
            }
            if *parent == doc.root() {
                if !is_item_element(doc, *child) {
                    return Outcome::Ignored;
                }
                let Some(kind) = ResourceKind::of_element(doc, *child) else {
                    // An <item> without a type attribute declares nothing
                    // yet; indexing waits for the attribute edit.
                    return Outcome::Ignored;
                };
                if kind == ResourceKind::DeclareStyleable {
                    return Outcome::Rescan;
                }
                let Some(name) = doc.attribute(*child, "name") else {
                    return Outcome::Ignored;
                };
                let item = ResourceItem::for_node(name, kind, document_id, *child);
                table.put(item.clone());
                let Some(file) = table.file_mut(document_id) else {
                    return Outcome::Rescan;
                };
                file.add_item(item);
                Outcome::Handled { bumped: true }
            } else {
                invalidate_enclosing_item(table, document_id, doc, *child)
            }
        }
        EditEvent::NodeRemoved { parent, child } => {
            let Some(item) = table
                .file(document_id)
                .and_then(|file| file.item_for_node(*child))
                .cloned()
            else {
                // Whitespace, an unnamed element, or a node this file never
                // contributed an item for.
                return if *parent == doc.root() {
                    Outcome::Ignored
                } else if doc.contains(*parent) {
                    invalidate_enclosing_item(table, document_id, doc, *parent)
                } else {
                    Outcome::Rescan
                };
            };
            if *parent != doc.root() || item.kind() == ResourceKind::DeclareStyleable {
                // Attr items inside declare-styleable, or the styleable
                // itself: nested teardown is the scanner's job.
                return Outcome::Rescan;
            }
            table.remove_exact(&item);
            let Some(file) = table.file_mut(document_id) else {
                return Outcome::Rescan;
            };
            file.remove_items(|candidate| Arc::ptr_eq(candidate, &item));
            Outcome::Handled { bumped: true }
        }
        EditEvent::AttributeChanged {
            element,
            name,
            old_value,
            new_value,
        } => {
            if !doc.contains(*element) {
                return Outcome::Rescan;
            }
            if doc.parent(*element) != Some(doc.root()) {
                // Renaming a nested item (an attr inside declare-styleable)
                // changes its table key; leave that to the scanner.
                if local_name(name) == "name"
                    && table
                        .file(document_id)
                        .and_then(|file| file.item_for_node(*element))
                        .is_some()
                {
                    return Outcome::Rescan;
                }
                return invalidate_enclosing_item(table, document_id, doc, *element);
            }
            match local_name(name) {
                "name" => rename_value_item(table, document_id, doc, *element, old_value, new_value),
                // Retyping an <item> changes which kind slot it lives in.
                "type" if doc.tag(*element) == Some("item") => Outcome::Rescan,
                _ => match table
                    .file(document_id)
                    .and_then(|file| file.item_for_node(*element))
                {
                    Some(item) => Outcome::Handled {
                        bumped: item.invalidate_value(),
                    },
                    None => Outcome::Ignored,
                },
            }
        }
        EditEvent::TextEdited { node } => {
            if !doc.contains(*node) {
                return Outcome::Rescan;
            }
            invalidate_enclosing_item(table, document_id, doc, *node)
        }
    }
}

/// A `name` attribute edit on a top-level value element.
///
/// The replacement item is spliced into the old one's list position, so
/// holders of the superseded item see a coherent snapshot while fresh
/// lookups resolve the new name.
fn rename_value_item(
    table: &mut ResourceTable,
    document_id: DocumentId,
    doc: &Document,
    element: NodeId,
    old_value: &Option<String>,
    new_value: &str,
) -> Outcome {
    if old_value.as_deref() == Some(new_value) {
        return Outcome::Ignored;
    }
    let Some(kind) = ResourceKind::of_element(doc, element) else {
        return Outcome::Ignored;
    };
    if kind == ResourceKind::DeclareStyleable {
        return Outcome::Rescan;
    }
    let old_item = table
        .file(document_id)
        .and_then(|file| file.item_for_node(element))
        .cloned();
    let new_item = ResourceItem::for_node(new_value, kind, document_id, element);
    table.put(new_item.clone());
    let Some(file) = table.file_mut(document_id) else {
        return Outcome::Rescan;
    };
    match old_item {
        Some(old_item) => {
            file.replace_item(&old_item, new_item);
            table.remove_exact(&old_item);
        }
        // The element was nameless before; this edit completes it.
        None => file.add_item(new_item),
    }
    Outcome::Handled { bumped: true }
}

/// Walks up from `start` to the nearest node this file contributed an
/// item for and drops that item's cached value. An attr item also drags
/// its enclosing declare-styleable's value along, since the styleable's
/// value spans its attrs.
fn invalidate_enclosing_item(
    table: &ResourceTable,
    document_id: DocumentId,
    doc: &Document,
    start: NodeId,
) -> Outcome {
    let Some(file) = table.file(document_id) else {
        return Outcome::Rescan;
    };
    let mut current = Some(start);
    while let Some(node) = current {
        if !doc.contains(node) {
            return Outcome::Rescan;
        }
        if let Some(item) = file.item_for_node(node) {
            if item.kind() == ResourceKind::DeclareStyleable {
                // Structure directly under a styleable defines attr items;
                // let the scanner recompute them.
                return Outcome::Rescan;
            }
            let mut bumped = item.invalidate_value();
            if item.kind() == ResourceKind::Attr {
                if let Some(styleable) = enclosing_styleable(file, doc, node) {
                    bumped |= styleable.invalidate_value();
                }
            }
            return Outcome::Handled { bumped };
        }
        if node == doc.root() {
            return Outcome::Ignored;
        }
        current = doc.parent(node);
    }
    Outcome::Rescan
}

fn enclosing_styleable<'a>(
    file: &'a crate::model::ResourceFile,
    doc: &Document,
    mut node: NodeId,
) -> Option<&'a Arc<ResourceItem>> {
    while let Some(parent) = doc.parent(node) {
        if let Some(item) = file.item_for_node(parent) {
            if item.kind() == ResourceKind::DeclareStyleable {
                return Some(item);
            }
        }
        node = parent;
    }
    None
}

// ---------------------------------------------------------------------
// Id-generating documents (layout, menu)
// ---------------------------------------------------------------------

fn classify_id_generating(
    table: &mut ResourceTable,
    document_id: DocumentId,
    doc: &Document,
    folder_kind: FolderKind,
    event: &EditEvent,
) -> Outcome {
    match event {
        EditEvent::NodeAdded { parent: _, child } => {
            if !doc.contains(*child) {
                return Outcome::Rescan;
            }
            if doc.tag(*child).is_none() {
                return Outcome::Ignored;
            }
            if folder_kind == FolderKind::Layout && touches_data_binding(doc, *child) {
                return Outcome::Rescan;
            }
            let new_ids = {
                let Some(file) = table.file(document_id) else {
                    return Outcome::Rescan;
                };
                let ids = collect_ids(doc, *child, |name| has_id_item(file.items(), name));
                // An explicit definition repeating a live name may be
                // taking over a pending-derived item; only a full pass
                // can tell which.
                if ids
                    .iter()
                    .any(|item| has_id_item(file.items(), item.name()))
                {
                    return Outcome::Rescan;
                }
                ids
            };
            if new_ids.is_empty() {
                return Outcome::Ignored;
            }
            for item in &new_ids {
                table.put(item.clone());
            }
            let Some(file) = table.file_mut(document_id) else {
                return Outcome::Rescan;
            };
            file.add_items(new_ids);
            Outcome::Handled { bumped: true }
        }
        // The subtree is gone; whatever ids (or pending references) it
        // carried cannot be enumerated after the fact.
        EditEvent::NodeRemoved { .. } => Outcome::Rescan,
        EditEvent::AttributeChanged {
            element,
            name,
            old_value,
            new_value,
        } => {
            if !doc.contains(*element) {
                return Outcome::Rescan;
            }
            let local = local_name(name);
            if folder_kind == FolderKind::Layout
                && DATA_BINDING_ATTRS.contains(&local)
                && touches_data_binding(doc, *element)
            {
                return Outcome::Rescan;
            }
            if local == "id" {
                return patch_id_attribute(table, doc, document_id, *element, old_value, new_value);
            }
            // A non-id attribute can still forward-declare an id.
            if let Some(old) = old_value.as_deref() {
                if old.starts_with(NEW_ID_PREFIX) && old != new_value {
                    // The old reference may have been the sole definition
                    // of a pending-derived id.
                    return Outcome::Rescan;
                }
            }
            if let Some(name) = new_value.strip_prefix(NEW_ID_PREFIX) {
                return add_id_item(table, document_id, *element, name);
            }
            Outcome::Ignored
        }
        // Character data carries no resource meaning in these documents.
        EditEvent::TextEdited { .. } => Outcome::Ignored,
    }
}

/// An `id` attribute edit: splice on an unambiguous rename, rescan for
/// everything else. A definition appearing or disappearing can consume
/// or resurrect a pending forward reference, which only the scanner's
/// whole-document pass can settle.
fn patch_id_attribute(
    table: &mut ResourceTable,
    doc: &Document,
    document_id: DocumentId,
    element: NodeId,
    old_value: &Option<String>,
    new_value: &str,
) -> Outcome {
    if old_value.as_deref() == Some(new_value) {
        return Outcome::Ignored;
    }
    // Plain @id/ values define an id only while a forward reference is
    // pending, which cannot be judged locally.
    if new_value.starts_with(ID_PREFIX)
        || old_value
            .as_deref()
            .is_some_and(|value| value.starts_with(ID_PREFIX))
    {
        return Outcome::Rescan;
    }
    let old_name = old_value
        .as_deref()
        .and_then(|value| value.strip_prefix(NEW_ID_PREFIX));
    let new_name = new_value.strip_prefix(NEW_ID_PREFIX);

    match (old_name, new_name) {
        (Some(old), Some(new)) => {
            let old_item = table.file(document_id).and_then(|file| {
                file.items()
                    .iter()
                    .find(|item| {
                        item.kind() == ResourceKind::Id
                            && item.node() == Some(element)
                            && item.name() == old
                    })
                    .cloned()
            });
            let Some(old_item) = old_item else {
                // The old name was defined by some other node; splice
                // blindly and the index would drift.
                return Outcome::Rescan;
            };
            let collides = table
                .file(document_id)
                .is_some_and(|file| has_id_item(file.items(), new));
            if collides || forward_referenced(doc, old) {
                // The new name is already live, or a forward reference
                // keeps the old one alive once this definition moves.
                return Outcome::Rescan;
            }
            let new_item = ResourceItem::for_node(new, ResourceKind::Id, document_id, element);
            table.put(new_item.clone());
            let Some(file) = table.file_mut(document_id) else {
                return Outcome::Rescan;
            };
            file.replace_item(&old_item, new_item);
            table.remove_exact(&old_item);
            Outcome::Handled { bumped: true }
        }
        // A fresh definition may duplicate an existing explicit id or
        // take over a pending-derived item.
        (None, Some(_)) => Outcome::Rescan,
        (Some(_), None) => Outcome::Rescan,
        (None, None) => Outcome::Ignored,
    }
}

/// Whether any non-id attribute in the document carries `@+id/name`.
/// Such a reference becomes the name's definition the moment the
/// explicit one goes away.
fn forward_referenced(doc: &Document, name: &str) -> bool {
    doc.descendant_elements(doc.root()).iter().any(|&element| {
        doc.attributes(element).iter().any(|attribute| {
            attribute.local_name() != "id"
                && attribute.value.strip_prefix(NEW_ID_PREFIX) == Some(name)
        })
    })
}

fn add_id_item(
    table: &mut ResourceTable,
    document_id: DocumentId,
    element: NodeId,
    name: &str,
) -> Outcome {
    {
        let Some(file) = table.file(document_id) else {
            return Outcome::Rescan;
        };
        if has_id_item(file.items(), name) {
            return Outcome::Ignored;
        }
    }
    let item = ResourceItem::for_node(name, ResourceKind::Id, document_id, element);
    table.put(item.clone());
    let Some(file) = table.file_mut(document_id) else {
        return Outcome::Rescan;
    };
    file.add_item(item);
    Outcome::Handled { bumped: true }
}

fn has_id_item(items: &[Arc<ResourceItem>], name: &str) -> bool {
    items
        .iter()
        .any(|item| item.kind() == ResourceKind::Id && item.name() == name)
}

/// Whether a node sits inside (or contains) the data-binding section.
fn touches_data_binding(doc: &Document, node: NodeId) -> bool {
    let inside = doc
        .ancestor_or_self(node, |doc, candidate| {
            DATA_BINDING_TAGS.contains(&doc.tag(candidate).unwrap_or(""))
        })
        .is_some();
    inside
        || doc
            .descendant_elements(node)
            .iter()
            .any(|&element| DATA_BINDING_TAGS.contains(&doc.tag(element).unwrap_or("")))
}

// ---------------------------------------------------------------------
// Plain file documents (drawable, color, xml, ...)
// ---------------------------------------------------------------------

/// The document contributes exactly one file-type item; any content edit
/// invalidates it. Its name and kind come from the path alone, so no
/// structural patching is ever needed.
fn classify_plain_file(table: &mut ResourceTable, document_id: DocumentId) -> Outcome {
    let Some(file) = table.file(document_id) else {
        return Outcome::Rescan;
    };
    let mut bumped = false;
    for item in file.items() {
        bumped |= item.invalidate_value();
    }
    Outcome::Handled { bumped }
}
