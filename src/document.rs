//! In-memory document model the index operates on.
//!
//! The host's parser builds one [`Document`] per resource file and mutates
//! it in place as the user edits. Every mutation returns the [`EditEvent`]
//! describing it, which the host forwards to the repository's incremental
//! updater.
//!
//! Node handles ([`NodeId`]) index into an append-only arena; removing a
//! subtree vacates its slots permanently, so a stale handle is detected by
//! a failed lookup rather than silently reading a different node.

mod arena;
mod node;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thin_vec::ThinVec;

use crate::error::{IndexError, Result};

pub use arena::{NodeArena, NodeId};
pub use node::{local_name, Attribute, Node, NodeData};

/// Process-unique identity of a document, stable across edits and moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A document shared between the host (writer) and the repository, which
/// re-reads it when flushing deferred rescans.
pub type SharedDocument = Arc<RwLock<Document>>;

/// A fine-grained edit notification scoped to one document.
///
/// Whole-document lifecycle (add/remove/move) is expressed through the
/// repository's `add_document` / `remove_document` / `move_document`
/// operations instead.
#[derive(Debug, Clone)]
pub enum EditEvent {
    /// A child node was inserted under `parent`.
    NodeAdded { parent: NodeId, child: NodeId },
    /// A child node (and its subtree) was deleted. The child's slots are
    /// already vacated when this event is observed.
    NodeRemoved { parent: NodeId, child: NodeId },
    /// An attribute value was swapped on an element.
    AttributeChanged {
        element: NodeId,
        name: String,
        old_value: Option<String>,
        new_value: String,
    },
    /// Character content inside a text node changed.
    TextEdited { node: NodeId },
}

/// One resource file, parsed into a node tree.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    folder_name: String,
    file_name: String,
    arena: NodeArena<Node>,
    root: NodeId,
}

impl Document {
    /// Creates a document whose root element has the given tag.
    pub fn new(
        folder_name: impl Into<String>,
        file_name: impl Into<String>,
        root_tag: impl Into<String>,
    ) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(Node::element(root_tag));
        Self {
            id: DocumentId::next(),
            folder_name: folder_name.into(),
            file_name: file_name.into(),
            arena,
            root,
        }
    }

    /// Convenience wrapper producing the shared form.
    pub fn shared(self) -> SharedDocument {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file name without its extension, used to name file-type items.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(index) if index > 0 => &self.file_name[..index],
            _ => &self.file_name,
        }
    }

    pub(crate) fn set_folder_name(&mut self, folder_name: impl Into<String>) {
        self.folder_name = folder_name.into();
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // -------------------------------------------------------------------
    // Node construction (detached until appended)
    // -------------------------------------------------------------------

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.arena.insert(Node::element(tag))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.arena.insert(Node::text(content))
    }

    // -------------------------------------------------------------------
    // Mutation — each returns the event describing the change
    // -------------------------------------------------------------------

    /// Appends a previously created node under `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<EditEvent> {
        if self.arena.get(child).is_none() {
            return Err(IndexError::NodeNotFound(child));
        }
        match self.arena.get_mut(parent) {
            Some(Node {
                data: NodeData::Element { children, .. },
                ..
            }) => children.push(child),
            Some(_) => return Err(IndexError::NotAnElement(parent)),
            None => return Err(IndexError::NodeNotFound(parent)),
        }
        self.arena[child].parent = Some(parent);
        Ok(EditEvent::NodeAdded { parent, child })
    }

    /// Removes a node and its whole subtree, vacating their slots.
    pub fn remove_node(&mut self, node: NodeId) -> Result<EditEvent> {
        if node == self.root {
            return Err(IndexError::RootRemoval);
        }
        let parent = match self.arena.get(node) {
            Some(found) => found.parent.ok_or(IndexError::DetachedNode(node))?,
            None => return Err(IndexError::NodeNotFound(node)),
        };
        if let Some(Node {
            data: NodeData::Element { children, .. },
            ..
        }) = self.arena.get_mut(parent)
        {
            children.retain(|&id| id != node);
        }
        self.vacate_subtree(node);
        Ok(EditEvent::NodeRemoved {
            parent,
            child: node,
        })
    }

    fn vacate_subtree(&mut self, node: NodeId) {
        let children: ThinVec<NodeId> = match self.arena.vacate(node) {
            Some(Node {
                data: NodeData::Element { children, .. },
                ..
            }) => children,
            _ => return,
        };
        for child in children {
            self.vacate_subtree(child);
        }
    }

    /// Sets (or replaces) an attribute value, returning the swap event.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<EditEvent> {
        let name = name.into();
        let value = value.into();
        match self.arena.get_mut(element) {
            Some(Node {
                data: NodeData::Element { attributes, .. },
                ..
            }) => {
                let old_value = match attributes.iter_mut().find(|attr| attr.name == name) {
                    Some(existing) => {
                        Some(std::mem::replace(&mut existing.value, value.clone()))
                    }
                    None => {
                        attributes.push(Attribute {
                            name: name.clone(),
                            value: value.clone(),
                        });
                        None
                    }
                };
                Ok(EditEvent::AttributeChanged {
                    element,
                    name,
                    old_value,
                    new_value: value,
                })
            }
            Some(_) => Err(IndexError::NotAnElement(element)),
            None => Err(IndexError::NodeNotFound(element)),
        }
    }

    /// Replaces the content of a text node.
    pub fn set_text(&mut self, node: NodeId, content: impl Into<String>) -> Result<EditEvent> {
        match self.arena.get_mut(node) {
            Some(Node {
                data: NodeData::Text(existing),
                ..
            }) => {
                *existing = content.into();
                Ok(EditEvent::TextEdited { node })
            }
            Some(_) => Err(IndexError::NotAText(node)),
            None => Err(IndexError::NodeNotFound(node)),
        }
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Whether the handle still points at a live node.
    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.get(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent
    }

    /// The tag name if `node` is a live element.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.arena.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        self.arena.get(node).is_some_and(Node::is_text)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.arena.get(node)?.data {
            NodeData::Text(content) => Some(content),
            NodeData::Element { .. } => None,
        }
    }

    /// Looks up an attribute by local name (prefix-insensitive).
    pub fn attribute(&self, element: NodeId, local: &str) -> Option<&str> {
        match &self.arena.get(element)?.data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|attr| attr.local_name() == local)
                .map(|attr| attr.value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn attributes(&self, element: NodeId) -> &[Attribute] {
        match self.arena.get(element).map(|node| &node.data) {
            Some(NodeData::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn children(&self, element: NodeId) -> &[NodeId] {
        match self.arena.get(element).map(|node| &node.data) {
            Some(NodeData::Element { children, .. }) => children,
            _ => &[],
        }
    }

    /// Child nodes that are elements, in document order.
    pub fn child_elements(&self, element: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(element)
            .iter()
            .copied()
            .filter(|&child| self.tag(child).is_some())
    }

    /// First child element with the given tag.
    pub fn find_child_element(&self, element: NodeId, tag: &str) -> Option<NodeId> {
        self.child_elements(element)
            .find(|&child| self.tag(child) == Some(tag))
    }

    /// All element nodes in the subtree rooted at `node`, in document
    /// order, including `node` itself if it is an element.
    pub fn descendant_elements(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(node, &mut out);
        out
    }

    fn collect_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if self.tag(node).is_some() {
            out.push(node);
        }
        for &child in self.children(node) {
            self.collect_elements(child, out);
        }
    }

    /// Concatenated text content of the subtree, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.arena.get(node).map(|found| &found.data) {
            Some(NodeData::Text(content)) => out.push_str(content),
            Some(NodeData::Element { children, .. }) => {
                for &child in children.iter() {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Walks up from `node` until `predicate` matches a live element.
    pub fn ancestor_or_self(
        &self,
        node: NodeId,
        mut predicate: impl FnMut(&Document, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.tag(id).is_some() && predicate(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new("values", "strings.xml", "resources");
        let root = doc.root();
        let string = doc.create_element("string");
        doc.set_attribute(string, "name", "app_name").unwrap();
        let text = doc.create_text("Foo");
        doc.append_child(string, text).unwrap();
        doc.append_child(root, string).unwrap();
        (doc, string, text)
    }

    #[test]
    fn append_child_links_parent() {
        let (doc, string, text) = string_doc();
        assert_eq!(doc.parent(string), Some(doc.root()));
        assert_eq!(doc.parent(text), Some(string));
        assert_eq!(doc.children(doc.root()), &[string]);
    }

    #[test]
    fn remove_node_vacates_subtree() {
        let (mut doc, string, text) = string_doc();
        let event = doc.remove_node(string).unwrap();
        assert!(matches!(event, EditEvent::NodeRemoved { child, .. } if child == string));
        assert!(!doc.contains(string));
        assert!(!doc.contains(text));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn set_attribute_reports_old_value() {
        let (mut doc, string, _) = string_doc();
        let event = doc.set_attribute(string, "name", "app_title").unwrap();
        match event {
            EditEvent::AttributeChanged {
                old_value,
                new_value,
                ..
            } => {
                assert_eq!(old_value.as_deref(), Some("app_name"));
                assert_eq!(new_value, "app_title");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(doc.attribute(string, "name"), Some("app_title"));
    }

    #[test]
    fn text_content_flattens_nested_markup() {
        let mut doc = Document::new("values", "strings.xml", "resources");
        let string = doc.create_element("string");
        let bold = doc.create_element("b");
        let head = doc.create_text("Hello ");
        let emphasized = doc.create_text("world");
        doc.append_child(string, head).unwrap();
        doc.append_child(bold, emphasized).unwrap();
        doc.append_child(string, bold).unwrap();
        doc.append_child(doc.root(), string).unwrap();
        assert_eq!(doc.text_content(string), "Hello world");
    }

    #[test]
    fn attribute_matches_local_name() {
        let mut doc = Document::new("layout", "main.xml", "LinearLayout");
        doc.set_attribute(doc.root(), "android:id", "@+id/container")
            .unwrap();
        assert_eq!(doc.attribute(doc.root(), "id"), Some("@+id/container"));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut doc = Document::new("values", "strings.xml", "resources");
        assert!(matches!(
            doc.remove_node(doc.root()),
            Err(IndexError::RootRemoval)
        ));
    }

    #[test]
    fn file_stem_strips_extension() {
        let doc = Document::new("drawable", "icon.png", "_binary");
        assert_eq!(doc.file_stem(), "icon");
    }
}
