//! Resource entities: kinds, items, per-document contribution records.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentId, NodeId, SharedDocument};
use crate::qualifier::{Configuration, FolderKind};

/// The closed set of resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Anim,
    Animator,
    Array,
    Attr,
    Bool,
    Color,
    DeclareStyleable,
    Dimen,
    Drawable,
    Font,
    Fraction,
    Id,
    Integer,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Navigation,
    Plurals,
    Raw,
    String,
    Style,
    Transition,
    Xml,
}

impl ResourceKind {
    /// Maps a value-document tag name to a kind. `<item>` elements carry
    /// their kind in a `type` attribute and resolve through
    /// [`ResourceKind::from_type_attr`] instead.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "array" | "string-array" | "integer-array" => Self::Array,
            "attr" => Self::Attr,
            "bool" => Self::Bool,
            "color" => Self::Color,
            "declare-styleable" => Self::DeclareStyleable,
            "dimen" => Self::Dimen,
            "drawable" => Self::Drawable,
            "fraction" => Self::Fraction,
            "id" => Self::Id,
            "integer" => Self::Integer,
            "plurals" => Self::Plurals,
            "string" => Self::String,
            "style" => Self::Style,
            _ => return None,
        })
    }

    /// Maps an `<item type="...">` attribute value to a kind.
    pub fn from_type_attr(value: &str) -> Option<Self> {
        Self::from_tag(value).or_else(|| {
            Some(match value {
                "anim" => Self::Anim,
                "animator" => Self::Animator,
                "font" => Self::Font,
                "interpolator" => Self::Interpolator,
                "layout" => Self::Layout,
                "menu" => Self::Menu,
                "mipmap" => Self::Mipmap,
                "navigation" => Self::Navigation,
                "raw" => Self::Raw,
                "transition" => Self::Transition,
                "xml" => Self::Xml,
                _ => return None,
            })
        })
    }

    /// Resolves the kind declared by an element in a values document:
    /// the tag name, or the `type` attribute for `<item>` elements.
    pub fn of_element(doc: &Document, element: NodeId) -> Option<Self> {
        let tag = doc.tag(element)?;
        if tag == "item" {
            ResourceKind::from_type_attr(doc.attribute(element, "type")?)
        } else {
            ResourceKind::from_tag(tag)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anim => "anim",
            Self::Animator => "animator",
            Self::Array => "array",
            Self::Attr => "attr",
            Self::Bool => "bool",
            Self::Color => "color",
            Self::DeclareStyleable => "declare-styleable",
            Self::Dimen => "dimen",
            Self::Drawable => "drawable",
            Self::Font => "font",
            Self::Fraction => "fraction",
            Self::Id => "id",
            Self::Integer => "integer",
            Self::Interpolator => "interpolator",
            Self::Layout => "layout",
            Self::Menu => "menu",
            Self::Mipmap => "mipmap",
            Self::Navigation => "navigation",
            Self::Plurals => "plurals",
            Self::Raw => "raw",
            Self::String => "string",
            Self::Style => "style",
            Self::Transition => "transition",
            Self::Xml => "xml",
        }
    }
}

/// What backs a [`ResourceItem`]: an element inside its document (value
/// and id items) or the document file itself (drawables, layouts, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    Node(NodeId),
    File,
}

/// A single resource definition.
///
/// Items are `Arc`-shared between the kind/name table and their owning
/// [`ResourceFile`]; identity is pointer identity (`Arc::ptr_eq`). A
/// rename produces a new item spliced into the old one's list position,
/// so holders of the old item keep a coherent (if superseded) snapshot.
#[derive(Debug)]
pub struct ResourceItem {
    name: String,
    kind: ResourceKind,
    document: DocumentId,
    source: ItemSource,
    cached_value: Mutex<Option<String>>,
}

impl ResourceItem {
    pub fn for_node(
        name: impl Into<String>,
        kind: ResourceKind,
        document: DocumentId,
        node: NodeId,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            document,
            source: ItemSource::Node(node),
            cached_value: Mutex::new(None),
        })
    }

    pub fn for_file(
        name: impl Into<String>,
        kind: ResourceKind,
        document: DocumentId,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            document,
            source: ItemSource::File,
            cached_value: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn source(&self) -> ItemSource {
        self.source
    }

    /// The backing node for node-sourced items.
    pub fn node(&self) -> Option<NodeId> {
        match self.source {
            ItemSource::Node(node) => Some(node),
            ItemSource::File => None,
        }
    }

    /// Computes (and caches) the item's value from its backing document.
    ///
    /// Value items flatten the backing element's text content; id items
    /// render as a `@+id/` reference; file items render the backing
    /// file's folder-relative path, which is why a document move forces
    /// recomputation.
    pub fn value(&self, doc: &Document) -> Option<String> {
        let mut cached = self.cached_value.lock();
        if let Some(value) = cached.as_ref() {
            return Some(value.clone());
        }
        let computed = match self.source {
            ItemSource::File => format!("{}/{}", doc.folder_name(), doc.file_name()),
            ItemSource::Node(node) => {
                if !doc.contains(node) {
                    return None;
                }
                if self.kind == ResourceKind::Id {
                    format!("@+id/{}", self.name)
                } else {
                    doc.text_content(node)
                }
            }
        };
        *cached = Some(computed.clone());
        Some(computed)
    }

    /// Discards the cached value. Returns true only if a computed value
    /// was actually thrown away — the caller bumps the generation only in
    /// that case, since a never-observed value is not an observable
    /// change.
    pub fn invalidate_value(&self) -> bool {
        self.cached_value.lock().take().is_some()
    }
}

/// A variable declared in a layout's `<data>` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBindingVariable {
    pub name: String,
    pub type_name: String,
}

/// An import declared in a layout's `<data>` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBindingImport {
    pub type_name: String,
    pub alias: String,
}

/// The binding class generated for a data-binding layout document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBindingDescriptor {
    pub class_name: String,
    pub package: String,
    pub variables: Vec<DataBindingVariable>,
    pub imports: Vec<DataBindingImport>,
}

impl DataBindingDescriptor {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.class_name)
    }
}

/// One document's contribution to the index: the items it currently
/// defines, its parsed configuration, and (for layout documents) its
/// data-binding descriptor.
#[derive(Debug)]
pub struct ResourceFile {
    document: SharedDocument,
    document_id: DocumentId,
    folder_kind: FolderKind,
    qualifiers: String,
    configuration: Configuration,
    items: Vec<Arc<ResourceItem>>,
    data_binding: Option<DataBindingDescriptor>,
}

impl ResourceFile {
    pub fn new(
        document: SharedDocument,
        folder_kind: FolderKind,
        qualifiers: impl Into<String>,
        configuration: Configuration,
    ) -> Self {
        let document_id = document.read().id();
        Self {
            document,
            document_id,
            folder_kind,
            qualifiers: qualifiers.into(),
            configuration,
            items: Vec::new(),
            data_binding: None,
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn folder_kind(&self) -> FolderKind {
        self.folder_kind
    }

    pub fn qualifiers(&self) -> &str {
        &self.qualifiers
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn set_qualifiers(&mut self, qualifiers: impl Into<String>, config: Configuration) {
        self.qualifiers = qualifiers.into();
        self.configuration = config;
    }

    pub fn items(&self) -> &[Arc<ResourceItem>] {
        &self.items
    }

    pub(crate) fn add_item(&mut self, item: Arc<ResourceItem>) {
        self.items.push(item);
    }

    pub(crate) fn add_items(&mut self, items: impl IntoIterator<Item = Arc<ResourceItem>>) {
        self.items.extend(items);
    }

    pub(crate) fn remove_items(&mut self, mut doomed: impl FnMut(&Arc<ResourceItem>) -> bool) {
        self.items.retain(|item| !doomed(item));
    }

    /// Splices `new` into `old`'s list position, preserving item order.
    /// Falls back to a push if `old` is not present.
    pub(crate) fn replace_item(&mut self, old: &Arc<ResourceItem>, new: Arc<ResourceItem>) {
        match self.items.iter().position(|item| Arc::ptr_eq(item, old)) {
            Some(position) => self.items[position] = new,
            None => self.items.push(new),
        }
    }

    /// Finds this file's item backed by the given node.
    pub fn item_for_node(&self, node: NodeId) -> Option<&Arc<ResourceItem>> {
        self.items.iter().find(|item| item.node() == Some(node))
    }

    pub fn data_binding(&self) -> Option<&DataBindingDescriptor> {
        self.data_binding.as_ref()
    }

    pub(crate) fn set_data_binding(&mut self, descriptor: Option<DataBindingDescriptor>) {
        self.data_binding = descriptor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn kind_from_tag_and_type_attr() {
        assert_eq!(ResourceKind::from_tag("string"), Some(ResourceKind::String));
        assert_eq!(
            ResourceKind::from_tag("string-array"),
            Some(ResourceKind::Array)
        );
        assert_eq!(
            ResourceKind::from_tag("declare-styleable"),
            Some(ResourceKind::DeclareStyleable)
        );
        assert_eq!(ResourceKind::from_tag("resources"), None);
        assert_eq!(
            ResourceKind::from_type_attr("layout"),
            Some(ResourceKind::Layout)
        );
    }

    #[test]
    fn item_value_caches_until_invalidated() {
        let mut doc = Document::new("values", "strings.xml", "resources");
        let string = doc.create_element("string");
        doc.set_attribute(string, "name", "greeting").unwrap();
        let text = doc.create_text("Hello");
        doc.append_child(string, text).unwrap();
        doc.append_child(doc.root(), string).unwrap();

        let item = ResourceItem::for_node("greeting", ResourceKind::String, doc.id(), string);
        assert_eq!(item.value(&doc).as_deref(), Some("Hello"));

        doc.set_text(text, "Goodbye").unwrap();
        // Still cached.
        assert_eq!(item.value(&doc).as_deref(), Some("Hello"));

        assert!(item.invalidate_value());
        assert_eq!(item.value(&doc).as_deref(), Some("Goodbye"));
        assert!(item.invalidate_value());
        // Nothing cached anymore: no observable change to report.
        assert!(!item.invalidate_value());
    }

    #[test]
    fn file_item_value_embeds_path() {
        let doc = Document::new("drawable-hdpi", "icon.png", "_binary");
        let item = ResourceItem::for_file("icon", ResourceKind::Drawable, doc.id());
        assert_eq!(
            item.value(&doc).as_deref(),
            Some("drawable-hdpi/icon.png")
        );
    }

    #[test]
    fn stale_node_yields_no_value() {
        let mut doc = Document::new("values", "strings.xml", "resources");
        let string = doc.create_element("string");
        doc.append_child(doc.root(), string).unwrap();
        let item = ResourceItem::for_node("x", ResourceKind::String, doc.id(), string);
        doc.remove_node(string).unwrap();
        assert_eq!(item.value(&doc), None);
    }

    #[test]
    fn replace_item_preserves_position() {
        let doc = Document::new("values", "strings.xml", "resources").shared();
        let id = doc.read().id();
        let mut file = ResourceFile::new(
            doc,
            FolderKind::Values,
            "",
            Configuration::default(),
        );
        let first = ResourceItem::for_file("a", ResourceKind::String, id);
        let second = ResourceItem::for_file("b", ResourceKind::String, id);
        let third = ResourceItem::for_file("c", ResourceKind::String, id);
        file.add_items([first.clone(), second.clone(), third.clone()]);

        let renamed = ResourceItem::for_file("b2", ResourceKind::String, id);
        file.replace_item(&second, renamed.clone());

        assert_eq!(file.items().len(), 3);
        assert!(Arc::ptr_eq(&file.items()[1], &renamed));
        assert!(Arc::ptr_eq(&file.items()[0], &first));
        assert!(Arc::ptr_eq(&file.items()[2], &third));
    }
}
