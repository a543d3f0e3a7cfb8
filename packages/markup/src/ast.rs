use crate::style::StyleDeclarations;
use serde::{Deserialize, Serialize};

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is not markup
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

const MEDIA_ELEMENTS: &[&str] = &["audio", "embed", "iframe", "img", "picture", "video"];

/// Class carried by the resizable container around embedded media
pub const MEDIA_FRAME_CLASS: &str = "media-frame";

/// Attribute on an element. Source order is preserved so that
/// serialization reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// `None` for a bare attribute (`<input disabled>`)
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Content node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Element(Element),
    Text { content: String },
    Comment { content: String },
}

/// How an element participates in document structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Paragraphs, headings, lists, tables
    Block,
    /// Runs of styled text
    Inline,
    /// Images, video and the frames wrapping them
    Media,
}

/// Element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// Top-level sequence of nodes: the whole serialized content of a document
/// or a piece of content about to be inserted into one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Node::Comment {
            content: content.into(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for text nodes containing only whitespace
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text { content } if content.trim().is_empty())
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { content } => out.push_str(content),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            Node::Comment { .. } => {}
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(Node::text(content))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = Some(value),
            None => self.attributes.push(Attribute {
                name,
                value: Some(value),
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    pub fn is_raw_text(&self) -> bool {
        RAW_TEXT_ELEMENTS.contains(&self.tag.as_str())
    }

    pub fn is_media_frame(&self) -> bool {
        self.has_class(MEDIA_FRAME_CLASS)
    }

    pub fn kind(&self) -> ElementKind {
        if self.is_media_frame() || MEDIA_ELEMENTS.contains(&self.tag.as_str()) {
            ElementKind::Media
        } else if BLOCK_ELEMENTS.contains(&self.tag.as_str()) {
            ElementKind::Block
        } else {
            ElementKind::Inline
        }
    }

    /// Inline style declarations parsed from the `style` attribute
    pub fn style(&self) -> StyleDeclarations {
        StyleDeclarations::parse(self.attr("style").unwrap_or(""))
    }

    pub fn style_property(&self, property: &str) -> Option<String> {
        self.style().get(property).map(str::to_string)
    }

    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut style = self.style();
        style.set(property, value);
        self.set_attr("style", style.to_string());
    }

    pub fn remove_style_property(&mut self, property: &str) {
        let mut style = self.style();
        style.remove(property);
        if style.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", style.to_string());
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// True when the element renders nothing: no media, no void children,
    /// no visible text.
    pub fn is_blank(&self) -> bool {
        if self.is_void() || self.kind() == ElementKind::Media {
            return false;
        }
        self.children.iter().all(|child| match child {
            Node::Text { content } => content.trim().is_empty(),
            Node::Comment { .. } => true,
            Node::Element(el) => el.is_blank(),
        })
    }
}

impl Fragment {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Parse serialized markup
    pub fn parse(source: &str) -> Self {
        crate::parser::parse(source)
    }

    /// Serialize back to markup
    pub fn to_markup(&self) -> String {
        crate::serializer::serialize(self)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.nodes.push(node.into());
    }

    pub fn append(&mut self, other: Fragment) {
        self.nodes.extend(other.nodes);
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.collect_text(&mut out);
        }
        out
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        find_in(&self.nodes, id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        find_in_mut(&mut self.nodes, id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Visit every element depth-first, parents before children
    pub fn for_each_element<F: FnMut(&Element)>(&self, mut f: F) {
        fn walk<F: FnMut(&Element)>(nodes: &[Node], f: &mut F) {
            for node in nodes {
                if let Node::Element(el) = node {
                    f(el);
                    walk(&el.children, f);
                }
            }
        }
        walk(&self.nodes, &mut f);
    }

    pub fn for_each_element_mut<F: FnMut(&mut Element)>(&mut self, mut f: F) {
        fn walk<F: FnMut(&mut Element)>(nodes: &mut [Node], f: &mut F) {
            for node in nodes {
                if let Node::Element(el) = node {
                    f(el);
                    walk(&mut el.children, f);
                }
            }
        }
        walk(&mut self.nodes, &mut f);
    }

    /// Ids of every element carrying one, in document order
    pub fn element_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.for_each_element(|el| {
            if let Some(id) = el.id() {
                ids.push(id.to_string());
            }
        });
        ids
    }

    /// Index of the last top-level element that is not media
    pub fn last_block_index(&self) -> Option<usize> {
        self.nodes.iter().rposition(|node| {
            node.as_element()
                .map(|el| el.kind() != ElementKind::Media)
                .unwrap_or(false)
        })
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_nodes(nodes)
    }
}

fn find_in<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.id() == Some(id) {
                return Some(el);
            }
            if let Some(found) = find_in(&el.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_mut<'a>(nodes: &'a mut [Node], id: &str) -> Option<&'a mut Element> {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            if el.id() == Some(id) {
                return Some(el);
            }
            if let Some(found) = find_in_mut(&mut el.children, id) {
                return Some(found);
            }
        }
    }
    None
}
