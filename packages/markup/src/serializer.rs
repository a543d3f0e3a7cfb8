use crate::ast::*;
use crate::entities::{escape_attribute, escape_text};

/// Serializer converts a fragment back to markup.
///
/// Output is canonical: names lowercase, attribute values double-quoted,
/// void elements without a closing tag. Anything this serializer writes
/// parses back to the same tree, so content survives any number of
/// load/save cycles unchanged.
pub struct Serializer {
    /// Write `<br />` instead of `<br>`
    self_close_void: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            self_close_void: false,
        }
    }

    /// XHTML-style void elements, for consumers that expect XML
    pub fn xhtml() -> Self {
        Self {
            self_close_void: true,
        }
    }

    pub fn serialize(&self, fragment: &Fragment) -> String {
        self.serialize_nodes(&fragment.nodes)
    }

    pub fn serialize_nodes(&self, nodes: &[Node]) -> String {
        let mut output = String::new();
        for node in nodes {
            self.write_node(node, false, &mut output);
        }
        output
    }

    pub fn serialize_element(&self, element: &Element) -> String {
        let mut output = String::new();
        self.write_element(element, &mut output);
        output
    }

    fn write_node(&self, node: &Node, raw_text: bool, output: &mut String) {
        match node {
            Node::Element(element) => self.write_element(element, output),
            Node::Text { content } if raw_text => output.push_str(content),
            Node::Text { content } => escape_text(content, output),
            Node::Comment { content } => {
                output.push_str("<!--");
                output.push_str(content);
                output.push_str("-->");
            }
        }
    }

    fn write_element(&self, element: &Element, output: &mut String) {
        output.push('<');
        output.push_str(&element.tag);

        for attribute in &element.attributes {
            output.push(' ');
            output.push_str(&attribute.name);
            if let Some(value) = &attribute.value {
                output.push_str("=\"");
                escape_attribute(value, output);
                output.push('"');
            }
        }

        if element.is_void() {
            output.push_str(if self.self_close_void { " />" } else { ">" });
            return;
        }
        output.push('>');

        let raw_text = element.is_raw_text();
        for child in &element.children {
            self.write_node(child, raw_text, output);
        }

        output.push_str("</");
        output.push_str(&element.tag);
        output.push('>');
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a fragment with the default serializer
pub fn serialize(fragment: &Fragment) -> String {
    Serializer::new().serialize(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_serialize_built_tree() {
        let fragment = Fragment::from_nodes(vec![Element::new("p")
            .with_attr("style", "text-align: center;")
            .with_text("a < b & c")
            .with_child(Element::new("br"))
            .into()]);

        assert_eq!(
            serialize(&fragment),
            r#"<p style="text-align: center;">a &lt; b &amp; c<br></p>"#
        );
    }

    #[test]
    fn test_xhtml_void_elements() {
        let fragment = Fragment::from_nodes(vec![Element::new("hr").into()]);
        assert_eq!(Serializer::xhtml().serialize(&fragment), "<hr />");
    }

    #[test]
    fn test_bare_attributes() {
        let fragment = parse("<input disabled>");
        assert_eq!(serialize(&fragment), "<input disabled>");
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let fragment = Fragment::from_nodes(vec![Element::new("span")
            .with_attr("title", "say \"hi\"")
            .into()]);
        assert_eq!(
            serialize(&fragment),
            r#"<span title="say &quot;hi&quot;"></span>"#
        );
    }

    #[test]
    fn test_roundtrip_canonical_markup() {
        let source = r#"<h1>Title</h1><p>Some <em>styled</em>&nbsp;text</p><!-- keep --><ul><li>one</li></ul>"#;
        assert_eq!(serialize(&parse(source)), source);
    }

    #[test]
    fn test_normalizes_self_closing_input() {
        assert_eq!(serialize(&parse("<p>a<br/>b</p>")), "<p>a<br>b</p>");
    }
}
