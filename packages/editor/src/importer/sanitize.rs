//! Cleanup of pasted rich content.
//!
//! Works on the parsed tree. Word and Google Docs clipboard markup arrives
//! with comments, `<style>` blocks, `o:p` wrappers, `Mso*` classes and inline
//! styles; none of it survives.

use folio_markup::{Element, ElementKind, Fragment, Node};

/// Dropped with their whole subtree
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "meta", "link", "title", "head", "xml"];

/// Unwrapped when left without attributes
const PLAIN_WRAPPERS: &[&str] = &["span", "font"];

/// Structural elements kept even when empty
const KEEP_WHEN_EMPTY: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "td", "th"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction"];

#[derive(Debug, Default, Clone, Copy)]
pub struct Sanitizer;

impl Sanitizer {
    pub fn new() -> Self {
        Self
    }

    pub fn sanitize(&self, fragment: Fragment) -> Fragment {
        Fragment::from_nodes(self.clean_nodes(fragment.nodes, false))
    }

    /// Parse and clean markup in one step
    pub fn sanitize_markup(&self, markup: &str) -> Fragment {
        self.sanitize(Fragment::parse(markup))
    }

    fn clean_nodes(&self, nodes: Vec<Node>, in_media: bool) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Comment { .. } => {}
                Node::Text { .. } => push_merged(&mut out, node),
                Node::Element(element) => self.clean_element(element, in_media, &mut out),
            }
        }
        out
    }

    fn clean_element(&self, mut element: Element, in_media: bool, out: &mut Vec<Node>) {
        if DROPPED_ELEMENTS.contains(&element.tag.as_str()) {
            return;
        }

        // Frames created by this editor keep their sizing when copied
        let in_media = in_media || element.is_media_frame();
        let children = std::mem::take(&mut element.children);
        element.children = self.clean_nodes(children, in_media);

        // Vendor namespaced tags (o:p, w:sdt, ...)
        if element.tag.contains(':') {
            if !element.is_blank() {
                lift_children(element, out);
            }
            return;
        }

        clean_attributes(&mut element, in_media);

        if PLAIN_WRAPPERS.contains(&element.tag.as_str()) && element.attributes.is_empty() {
            lift_children(element, out);
            return;
        }

        if is_removable_when_empty(&element) && element.is_blank() {
            return;
        }

        out.push(Node::Element(element));
    }
}

fn clean_attributes(element: &mut Element, in_media: bool) {
    element.attributes.retain(|attribute| {
        let name = attribute.name.as_str();
        if name == "lang" || is_event_handler(name) || is_vendor_attribute(name) {
            return false;
        }
        if name == "style" && !in_media {
            return false;
        }
        if URL_ATTRIBUTES.contains(&name) {
            let value = attribute.value.as_deref().unwrap_or("");
            return !is_script_url(value);
        }
        true
    });

    if element.has_attr("class") {
        let kept: Vec<&str> = element.classes().filter(|class| !class.starts_with("Mso")).collect();
        if kept.is_empty() {
            element.remove_attr("class");
        } else {
            let kept = kept.join(" ");
            element.set_attr("class", kept);
        }
    }
}

fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.starts_with("on") && name != "open"
}

/// `xmlns:o`, `v:shapes` and friends
fn is_vendor_attribute(name: &str) -> bool {
    name.starts_with("xmlns") || name.contains(':')
}

fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect();
    compact.to_ascii_lowercase().starts_with("javascript:")
}

fn is_removable_when_empty(element: &Element) -> bool {
    !element.is_void()
        && element.kind() != ElementKind::Media
        && !KEEP_WHEN_EMPTY.contains(&element.tag.as_str())
}

fn lift_children(element: Element, out: &mut Vec<Node>) {
    for child in element.children {
        push_merged(out, child);
    }
}

/// Push a node, merging adjacent text so the tree matches what parsing the
/// serialized output would produce
fn push_merged(out: &mut Vec<Node>, node: Node) {
    if let Node::Text { content } = &node {
        if let Some(Node::Text { content: previous }) = out.last_mut() {
            previous.push_str(content);
            return;
        }
    }
    out.push(node);
}
