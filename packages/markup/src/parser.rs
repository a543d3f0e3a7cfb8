use crate::ast::{Attribute, Element, Fragment, Node, VOID_ELEMENTS};
use crate::entities;
use crate::lexer::{tokenize, RawAttribute, Token};
use std::ops::Range;

/// Tree builder for serialized content.
///
/// Parsing is lenient the way an editable region is: stray end tags are
/// ignored, an end tag closes every element opened after its match, and
/// elements still open at the end of input are closed there.
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    stack: Vec<Element>,
    root: Vec<Node>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            tokens: tokenize(source),
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    pub fn parse_fragment(mut self) -> Fragment {
        let tokens = std::mem::take(&mut self.tokens);

        for (token, _) in tokens {
            match token {
                Token::Text(text) => self.push_text(&entities::decode(text)),
                Token::RawText(text) => self.push_text(text),
                Token::Comment(body) => self.attach(Node::comment(body)),
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let element = Element {
                        tag: name.to_ascii_lowercase(),
                        attributes: attributes.into_iter().map(convert_attribute).collect(),
                        children: Vec::new(),
                    };

                    if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
                        self.attach(Node::Element(element));
                    } else {
                        self.stack.push(element);
                    }
                }
                Token::EndTag(name) => self.close(&name.to_ascii_lowercase()),
            }
        }

        self.close_from(0);
        Fragment::from_nodes(self.root)
    }

    fn close(&mut self, tag: &str) {
        if let Some(index) = self.stack.iter().rposition(|el| el.tag == tag) {
            self.close_from(index);
        }
    }

    /// Close every open element at `index` and above
    fn close_from(&mut self, index: usize) {
        let mut closed = self.stack.split_off(index);
        while let Some(element) = closed.pop() {
            match closed.last_mut() {
                Some(parent) => parent.children.push(Node::Element(element)),
                None => self.attach(Node::Element(element)),
            }
        }
    }

    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Adjacent text merges into a single node
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        match siblings.last_mut() {
            Some(Node::Text { content }) => content.push_str(text),
            _ => siblings.push(Node::text(text)),
        }
    }
}

fn convert_attribute(raw: RawAttribute<'_>) -> Attribute {
    Attribute {
        name: raw.name.to_ascii_lowercase(),
        value: raw.value.map(|v| entities::decode(v).into_owned()),
    }
}

/// Parse serialized content into a fragment
pub fn parse(source: &str) -> Fragment {
    Parser::new(source).parse_fragment()
}
