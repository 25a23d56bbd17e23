//! Node payloads for the document model.

use thin_vec::ThinVec;

use super::arena::NodeId;

/// A named attribute on an element.
///
/// Attribute names may carry a namespace-like prefix (`android:id`);
/// matching is done on the local name after the colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// The name with any `prefix:` stripped.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }
}

/// Strips a namespace-like prefix from an attribute or tag name.
pub fn local_name(name: &str) -> &str {
    match name.find(':') {
        Some(index) => &name[index + 1..],
        None => name,
    }
}

/// The payload of a single document node.
#[derive(Debug)]
pub enum NodeData {
    Element {
        tag: String,
        attributes: ThinVec<Attribute>,
        children: ThinVec<NodeId>,
    },
    Text(String),
}

/// A node: its payload plus a link to its parent element.
///
/// The root element has `parent == None`; any other node with no parent
/// has been detached from the tree.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            parent: None,
            data: NodeData::Element {
                tag: tag.into(),
                attributes: ThinVec::new(),
                children: ThinVec::new(),
            },
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            parent: None,
            data: NodeData::Text(content.into()),
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }
}
