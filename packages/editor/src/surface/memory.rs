use super::command::FormatCommand;
use crate::importer::Sanitizer;
use super::EditableSurface;
use folio_markup::{Element, Fragment, Node};

/// Top-level elements that formatting commands act on
const TEXT_BLOCKS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "div", "ol", "ul",
];

const LISTS: &[&str] = &["ol", "ul"];

/// Headless surface over the content tree.
///
/// The caret is always at the end of the document: commands act on the last
/// text block (a paragraph is opened when there is none) and insertions are
/// appended.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    fragment: Fragment,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markup(markup: &str) -> Self {
        Self {
            fragment: Fragment::parse(markup),
        }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Simulate typing at the caret
    pub fn type_text(&mut self, text: &str) {
        self.with_current_block(|block| {
            let target = if is_list(block) {
                block
                    .children
                    .iter_mut()
                    .rev()
                    .filter_map(Node::as_element_mut)
                    .find(|item| item.tag == "li")
            } else {
                Some(block)
            };
            if let Some(target) = target {
                append_text(target, text);
            }
        });
    }

    fn apply(&mut self, command: &FormatCommand) {
        match command {
            FormatCommand::Bold => self.wrap_inline("strong", None),
            FormatCommand::Italic => self.wrap_inline("em", None),
            FormatCommand::Underline => self.wrap_inline("u", None),
            FormatCommand::StrikeThrough => self.wrap_inline("s", None),
            FormatCommand::Justify(alignment) => self.with_current_block(|block| {
                block.set_style_property("text-align", alignment.css_value());
            }),
            FormatCommand::InsertOrderedList => self.toggle_list("ol"),
            FormatCommand::InsertUnorderedList => self.toggle_list("ul"),
            FormatCommand::ForeColor(color) => self.wrap_inline("span", Some(format!("color: {};", color))),
            FormatCommand::HiliteColor(color) => {
                self.wrap_inline("span", Some(format!("background-color: {};", color)))
            }
            FormatCommand::FormatBlock(format) => {
                let tag = format.tag();
                self.with_current_block(|block| {
                    if !is_list(block) {
                        block.tag = tag;
                    }
                });
            }
            FormatCommand::InsertHorizontalRule => self.fragment.push(Element::new("hr")),
            FormatCommand::InsertHtml(markup) => self.fragment.append(Sanitizer::new().sanitize_markup(markup)),
            FormatCommand::InsertTable(spec) => self.fragment.push(spec.to_element()),
        }
    }

    fn current_block_index(&mut self) -> usize {
        match self.fragment.last_block_index() {
            Some(index) if self.fragment.nodes[index].as_element().is_some_and(is_text_block) => index,
            _ => {
                self.fragment.push(Element::new("p"));
                self.fragment.nodes.len() - 1
            }
        }
    }

    fn with_current_block(&mut self, f: impl FnOnce(&mut Element)) {
        let index = self.current_block_index();
        if let Some(block) = self.fragment.nodes.get_mut(index).and_then(Node::as_element_mut) {
            f(block);
        }
    }

    /// Wrap the block's runs in `tag`; applying the same wrapper twice
    /// removes it
    fn wrap_inline(&mut self, tag: &str, style: Option<String>) {
        self.with_current_block(|block| {
            for target in text_targets(block) {
                if let [Node::Element(only)] = target.children.as_slice() {
                    if only.tag == tag && only.attr("style") == style.as_deref() {
                        let inner = only.children.clone();
                        target.children = inner;
                        continue;
                    }
                }

                let mut wrapper = Element::new(tag);
                if let Some(style) = &style {
                    wrapper.set_attr("style", style.as_str());
                }
                wrapper.children = std::mem::take(&mut target.children);
                target.children.push(wrapper.into());
            }
        });
    }

    fn toggle_list(&mut self, tag: &str) {
        let index = self.current_block_index();
        let Some(block) = self.fragment.nodes.get_mut(index).and_then(Node::as_element_mut) else {
            return;
        };

        if block.tag == tag {
            // Same list again: back to paragraphs
            let paragraphs: Vec<Node> = std::mem::take(&mut block.children)
                .into_iter()
                .filter_map(|node| match node {
                    Node::Element(item) if item.tag == "li" => Some(Node::Element(Element {
                        tag: "p".to_string(),
                        attributes: Vec::new(),
                        children: item.children,
                    })),
                    _ => None,
                })
                .collect();
            self.fragment.nodes.splice(index..=index, paragraphs);
        } else if is_list(block) {
            block.tag = tag.to_string();
        } else {
            let item = Element {
                tag: "li".to_string(),
                attributes: Vec::new(),
                children: std::mem::take(&mut block.children),
            };
            *block = Element::new(tag).with_child(item);
        }
    }
}

impl EditableSurface for MemorySurface {
    fn content(&self) -> String {
        self.fragment.to_markup()
    }

    fn replace_content(&mut self, content: &str) {
        self.fragment = Fragment::parse(content);
    }

    fn execute(&mut self, command: &FormatCommand) -> bool {
        let before = self.content();
        self.apply(command);
        self.content() != before
    }

    fn insert_fragment(&mut self, fragment: Fragment) {
        self.fragment.append(fragment);
    }
}

fn is_text_block(element: &Element) -> bool {
    TEXT_BLOCKS.contains(&element.tag.as_str())
}

fn is_list(element: &Element) -> bool {
    LISTS.contains(&element.tag.as_str())
}

/// Elements whose runs a formatting command wraps: the list items of a
/// list, otherwise the block itself
fn text_targets(block: &mut Element) -> Vec<&mut Element> {
    if is_list(block) {
        block
            .children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .filter(|item| item.tag == "li")
            .collect()
    } else {
        vec![block]
    }
}

fn append_text(element: &mut Element, text: &str) {
    if let Some(Node::Text { content }) = element.children.last_mut() {
        content.push_str(text);
    } else {
        element.children.push(Node::text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::TableSpec;
    use crate::surface::command::{Alignment, BlockFormat};

    fn run(markup: &str, command: FormatCommand) -> String {
        let mut surface = MemorySurface::from_markup(markup);
        surface.execute(&command);
        surface.content()
    }

    #[test]
    fn test_typing_opens_paragraph() {
        let mut surface = MemorySurface::new();
        surface.type_text("Hello");
        surface.type_text(" world");
        assert_eq!(surface.content(), "<p>Hello world</p>");
    }

    #[test]
    fn test_bold_toggles() {
        let bold = run("<p>Hi</p>", FormatCommand::Bold);
        assert_eq!(bold, "<p><strong>Hi</strong></p>");
        assert_eq!(run(&bold, FormatCommand::Bold), "<p>Hi</p>");
    }

    #[test]
    fn test_commands_act_on_last_block() {
        let content = run("<p>one</p><h2>two</h2>", FormatCommand::Italic);
        assert_eq!(content, "<p>one</p><h2><em>two</em></h2>");
    }

    #[test]
    fn test_justify_sets_alignment() {
        assert_eq!(
            run("<p>x</p>", FormatCommand::Justify(Alignment::Full)),
            r#"<p style="text-align: justify;">x</p>"#
        );
    }

    #[test]
    fn test_colors_wrap_in_span() {
        assert_eq!(
            run("<p>x</p>", FormatCommand::ForeColor("#ff0000".to_string())),
            r#"<p><span style="color: #ff0000;">x</span></p>"#
        );
    }

    #[test]
    fn test_list_toggle_round_trip() {
        let listed = run("<p>item</p>", FormatCommand::InsertUnorderedList);
        assert_eq!(listed, "<ul><li>item</li></ul>");
        assert_eq!(run(&listed, FormatCommand::InsertOrderedList), "<ol><li>item</li></ol>");
        assert_eq!(run(&listed, FormatCommand::InsertUnorderedList), "<p>item</p>");
    }

    #[test]
    fn test_format_block_retags() {
        assert_eq!(
            run("<p>Title</p>", FormatCommand::FormatBlock(BlockFormat::Heading(1))),
            "<h1>Title</h1>"
        );
    }

    #[test]
    fn test_insertions_append() {
        assert_eq!(run("<p>a</p>", FormatCommand::InsertHorizontalRule), "<p>a</p><hr>");
        assert_eq!(
            run("<p>a</p>", FormatCommand::InsertHtml("<em>b</em>".to_string())),
            "<p>a</p><em>b</em>"
        );
        assert_eq!(
            run("<p>a</p>", FormatCommand::InsertHtml("<img src=\"x.png\" onerror=\"steal()\"><script>x()</script>".to_string())),
            "<p>a</p><img src=\"x.png\">"
        );

        let mut surface = MemorySurface::from_markup("<p>a</p>");
        assert!(surface.execute(&FormatCommand::InsertTable(TableSpec::new(1, 1, false))));
        assert!(surface.content().ends_with("<td style=\"border: 1px solid #d1d5db; padding: 8px;\"><br></td></tr></tbody></table>"));
    }

    #[test]
    fn test_formatting_after_table_opens_paragraph() {
        let mut surface = MemorySurface::from_markup("<table><tbody><tr><td>x</td></tr></tbody></table>");
        surface.execute(&FormatCommand::Bold);
        assert!(surface.content().ends_with("</table><p><strong></strong></p>"));
    }
}
