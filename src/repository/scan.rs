//! Full Scanner: rebuilds one document's contribution from scratch.
//!
//! This is the ground truth the incremental fast paths must stay
//! equivalent to. A malformed document (root tag not matching its folder
//! kind's schema) contributes zero items and logs a diagnostic; it never
//! aborts the surrounding scan or corrupts other documents' entries.

use std::sync::Arc;

use crate::document::{local_name, Document, NodeId, SharedDocument};
use crate::model::{
    DataBindingDescriptor, DataBindingImport, DataBindingVariable, ResourceFile, ResourceItem,
    ResourceKind,
};
use crate::qualifier::{parse_folder_name, FolderKind};

/// `@+id/name` declares (or forward-declares) an id resource.
pub(crate) const NEW_ID_PREFIX: &str = "@+id/";
/// `@id/name` references an id; it only defines one when a forward
/// reference is pending.
pub(crate) const ID_PREFIX: &str = "@id/";

/// The root tag of a values document.
pub(crate) const TAG_RESOURCES: &str = "resources";
/// The root tag of a data-binding layout document.
pub(crate) const TAG_LAYOUT: &str = "layout";
pub(crate) const TAG_DATA: &str = "data";

/// Attribute local names whose edits inside `<data>` sections force a
/// full rescan instead of an incremental patch.
pub(crate) const DATA_BINDING_ATTRS: &[&str] = &["class", "name", "type", "alias"];
pub(crate) const DATA_BINDING_TAGS: &[&str] = &[TAG_DATA, "variable", "import"];

/// Scans a whole document, producing its fresh contribution record.
///
/// Returns `None` when the document's folder is not a resource folder
/// (unknown kind prefix or unparsable qualifiers) — the silent-skip
/// policy, since unrecognized directories are common.
pub(crate) fn scan_document(
    document: &SharedDocument,
    module_package: &str,
) -> Option<ResourceFile> {
    let doc = document.read();
    let Some((folder_kind, qualifiers, config)) = parse_folder_name(doc.folder_name()) else {
        log::debug!(
            "skipping {}/{}: not a resource folder",
            doc.folder_name(),
            doc.file_name()
        );
        return None;
    };
    let mut file = ResourceFile::new(document.clone(), folder_kind, qualifiers, config);

    if folder_kind == FolderKind::Values {
        scan_values(&doc, &mut file);
    } else {
        scan_file_document(&doc, folder_kind, &mut file);
        if folder_kind == FolderKind::Layout {
            file.set_data_binding(scan_data_binding(&doc, module_package));
        }
    }
    drop(doc);
    Some(file)
}

/// Populates items for a values document: one item per top-level
/// item-shaped element, plus nested attr items under declare-styleable.
fn scan_values(doc: &Document, file: &mut ResourceFile) {
    let root = doc.root();
    if doc.tag(root) != Some(TAG_RESOURCES) {
        log::warn!(
            "{}/{}: root tag {:?} is not <resources>, contributing no items",
            doc.folder_name(),
            doc.file_name(),
            doc.tag(root)
        );
        return;
    }
    for element in doc.child_elements(root) {
        let Some(name) = doc.attribute(element, "name") else {
            continue;
        };
        let Some(kind) = ResourceKind::of_element(doc, element) else {
            continue;
        };
        file.add_item(ResourceItem::for_node(name, kind, doc.id(), element));

        if kind == ResourceKind::DeclareStyleable {
            for child in doc.child_elements(element) {
                if doc.tag(child) != Some("attr") {
                    continue;
                }
                let Some(attr_name) = doc.attribute(child, "name") else {
                    continue;
                };
                // An attr without a format and without flag/enum children
                // is just a reference to an attr declared elsewhere.
                if attr_name.starts_with("android:") {
                    continue;
                }
                let declares = doc.attribute(child, "format").is_some()
                    || doc.child_elements(child).next().is_some();
                if declares {
                    file.add_item(ResourceItem::for_node(
                        attr_name,
                        ResourceKind::Attr,
                        doc.id(),
                        child,
                    ));
                }
            }
        }
    }
}

/// Populates items for a non-values document: the file-type item named
/// after the file stem, plus implicit id items for id-generating kinds.
///
/// Id de-duplication is per document; the same id declared in two layout
/// files contributes one item from each.
fn scan_file_document(doc: &Document, folder_kind: FolderKind, file: &mut ResourceFile) {
    file.add_item(ResourceItem::for_file(
        doc.file_stem(),
        folder_kind.file_kind(),
        doc.id(),
    ));
    if folder_kind.is_id_generating() {
        let ids = collect_ids(doc, doc.root(), |name| {
            file.items()
                .iter()
                .any(|item| item.kind() == ResourceKind::Id && item.name() == name)
        });
        file.add_items(ids);
    }
}

/// The pending-id pass over one subtree.
///
/// A `@+id/foo` value on a non-id attribute forward-declares `foo` before
/// any node carries it as its own id. One pass collects those pending
/// names, consumes them where an explicit id attribute defines them, and
/// finally materializes items for whatever is left, attached to the first
/// referencing node.
pub(crate) fn collect_ids(
    doc: &Document,
    scope: NodeId,
    already_defined: impl Fn(&str) -> bool,
) -> Vec<Arc<ResourceItem>> {
    let mut items: Vec<Arc<ResourceItem>> = Vec::new();
    // Insertion-ordered so remainder items come out deterministically.
    let mut pending: Vec<(String, NodeId)> = Vec::new();

    for element in doc.descendant_elements(scope) {
        for attribute in doc.attributes(element) {
            if attribute.local_name() == "id" {
                continue;
            }
            let Some(name) = attribute.value.strip_prefix(NEW_ID_PREFIX) else {
                continue;
            };
            let defined = already_defined(name)
                || items.iter().any(|item| item.name() == name)
                || pending.iter().any(|(pending_name, _)| pending_name == name);
            if !defined {
                pending.push((name.to_string(), element));
            }
        }

        let Some(id_value) = doc.attribute(element, "id") else {
            continue;
        };
        let name = if let Some(name) = id_value.strip_prefix(NEW_ID_PREFIX) {
            name
        } else if let Some(name) = id_value.strip_prefix(ID_PREFIX) {
            // A plain reference still counts as the definition when a
            // preceding attribute forward-declared it with `@+id/`.
            if !pending.iter().any(|(pending_name, _)| pending_name == name) {
                continue;
            }
            name
        } else {
            continue;
        };
        pending.retain(|(pending_name, _)| pending_name != name);
        items.push(ResourceItem::for_node(
            name,
            ResourceKind::Id,
            doc.id(),
            element,
        ));
    }

    for (name, node) in pending {
        items.push(ResourceItem::for_node(
            name,
            ResourceKind::Id,
            doc.id(),
            node,
        ));
    }
    items
}

/// Derives the data-binding descriptor for a layout document, or `None`
/// when the root is not a `<layout>` wrapper.
pub(crate) fn scan_data_binding(
    doc: &Document,
    module_package: &str,
) -> Option<DataBindingDescriptor> {
    let root = doc.root();
    if doc.tag(root) != Some(TAG_LAYOUT) {
        return None;
    }
    let data_tag = doc.find_child_element(root, TAG_DATA);
    let class_attr = data_tag
        .and_then(|tag| doc.attribute(tag, "class"))
        .filter(|value| !value.is_empty());

    let (package, class_name) = match class_attr {
        None => (
            format!("{module_package}.databinding"),
            format!("{}Binding", to_class_name(doc.file_stem())),
        ),
        Some(value) => match value.find('.') {
            None => (format!("{module_package}.databinding"), value.to_string()),
            Some(first_dot) => {
                let last_dot = value.rfind('.').unwrap_or(first_dot);
                if first_dot == 0 {
                    (
                        format!("{module_package}{}", &value[..last_dot]),
                        value[last_dot + 1..].to_string(),
                    )
                } else {
                    (
                        value[..last_dot].to_string(),
                        value[last_dot + 1..].to_string(),
                    )
                }
            }
        },
    };

    let mut variables = Vec::new();
    let mut imports = Vec::new();
    if let Some(data_tag) = data_tag {
        for child in doc.child_elements(data_tag) {
            match doc.tag(child) {
                Some("variable") => {
                    let Some(name) = doc.attribute(child, "name").filter(|n| !n.is_empty()) else {
                        continue;
                    };
                    if variables
                        .iter()
                        .any(|existing: &DataBindingVariable| existing.name == name)
                    {
                        continue;
                    }
                    variables.push(DataBindingVariable {
                        name: name.to_string(),
                        type_name: doc.attribute(child, "type").unwrap_or_default().to_string(),
                    });
                }
                Some("import") => {
                    let Some(type_name) =
                        doc.attribute(child, "type").filter(|t| !t.is_empty())
                    else {
                        continue;
                    };
                    let alias = doc
                        .attribute(child, "alias")
                        .map(str::to_string)
                        .or_else(|| {
                            type_name
                                .rfind('.')
                                .map(|dot| type_name[dot + 1..].to_string())
                        })
                        .unwrap_or_else(|| type_name.to_string());
                    if alias.is_empty()
                        || imports
                            .iter()
                            .any(|existing: &DataBindingImport| existing.type_name == type_name)
                    {
                        continue;
                    }
                    imports.push(DataBindingImport {
                        type_name: type_name.to_string(),
                        alias,
                    });
                }
                _ => {}
            }
        }
    }

    Some(DataBindingDescriptor {
        class_name,
        package,
        variables,
        imports,
    })
}

/// `main_activity` -> `MainActivity`.
fn to_class_name(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut upper_next = true;
    for ch in stem.chars() {
        if ch == '_' || ch == '-' || ch == '.' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether a values-document element declares an item: anything under the
/// root other than `<resources>` itself whose tag (or `<item type>`
/// attribute) names a resource kind, plus bare `<item>` elements.
pub(crate) fn is_item_element(doc: &Document, element: NodeId) -> bool {
    match doc.tag(element) {
        Some(TAG_RESOURCES) | None => false,
        Some("item") => true,
        Some(tag) => ResourceKind::from_tag(local_name(tag)).is_some(),
    }
}
