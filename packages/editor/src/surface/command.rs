use crate::importer::{Sanitizer, TableSpec, MAX_TABLE_SIZE};

/// Formatting command understood by an editable surface.
///
/// Names follow the browser `execCommand` vocabulary and are matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    Justify(Alignment),
    InsertOrderedList,
    InsertUnorderedList,
    ForeColor(String),
    HiliteColor(String),
    FormatBlock(BlockFormat),
    InsertHorizontalRule,
    InsertHtml(String),
    InsertTable(TableSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Full,
}

impl Alignment {
    /// Value of the `text-align` property
    pub fn css_value(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Full => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Paragraph,
    Heading(u8),
    Quote,
    Preformatted,
}

impl BlockFormat {
    pub fn parse(value: &str) -> Option<Self> {
        let tag = value.trim().trim_start_matches('<').trim_end_matches('>').to_ascii_lowercase();
        match tag.as_str() {
            "p" => Some(BlockFormat::Paragraph),
            "blockquote" => Some(BlockFormat::Quote),
            "pre" => Some(BlockFormat::Preformatted),
            _ => {
                let level: u8 = tag.strip_prefix('h')?.parse().ok()?;
                (1..=6).contains(&level).then_some(BlockFormat::Heading(level))
            }
        }
    }

    pub fn tag(self) -> String {
        match self {
            BlockFormat::Paragraph => "p".to_string(),
            BlockFormat::Heading(level) => format!("h{}", level),
            BlockFormat::Quote => "blockquote".to_string(),
            BlockFormat::Preformatted => "pre".to_string(),
        }
    }
}

impl FormatCommand {
    /// Resolve a command name and its value. Unknown names and malformed
    /// values yield `None`.
    pub fn parse(name: &str, value: Option<&str>) -> Option<Self> {
        Self::parse_with_table_limit(name, value, MAX_TABLE_SIZE)
    }

    /// Like [`FormatCommand::parse`], with tables bounded by
    /// `max_table_size` rows and columns
    pub fn parse_with_table_limit(name: &str, value: Option<&str>, max_table_size: usize) -> Option<Self> {
        let command = match name.trim().to_ascii_lowercase().as_str() {
            "bold" => FormatCommand::Bold,
            "italic" => FormatCommand::Italic,
            "underline" => FormatCommand::Underline,
            "strikethrough" => FormatCommand::StrikeThrough,
            "justifyleft" => FormatCommand::Justify(Alignment::Left),
            "justifycenter" => FormatCommand::Justify(Alignment::Center),
            "justifyright" => FormatCommand::Justify(Alignment::Right),
            "justifyfull" => FormatCommand::Justify(Alignment::Full),
            "insertorderedlist" => FormatCommand::InsertOrderedList,
            "insertunorderedlist" => FormatCommand::InsertUnorderedList,
            "forecolor" => FormatCommand::ForeColor(parse_color(value?)?),
            "hilitecolor" | "backcolor" => FormatCommand::HiliteColor(parse_color(value?)?),
            "formatblock" => FormatCommand::FormatBlock(BlockFormat::parse(value?)?),
            "inserthorizontalrule" => FormatCommand::InsertHorizontalRule,
            "inserthtml" => {
                let markup = Sanitizer::new().sanitize_markup(value?);
                if markup.is_empty() {
                    return None;
                }
                FormatCommand::InsertHtml(markup.to_markup())
            }
            "inserttable" => {
                let spec = TableSpec::parse(value?)?;
                spec.validate(max_table_size).ok()?;
                FormatCommand::InsertTable(spec)
            }
            _ => return None,
        };
        Some(command)
    }
}

/// Colour values end up inside a `style` attribute; only plain colour
/// syntax (`#hex`, names, `rgb(...)`) gets through.
fn parse_color(value: &str) -> Option<String> {
    let value = value.trim();
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' '));
    (!value.is_empty() && plain).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_case_insensitively() {
        assert_eq!(FormatCommand::parse("bold", None), Some(FormatCommand::Bold));
        assert_eq!(FormatCommand::parse("strikeThrough", None), Some(FormatCommand::StrikeThrough));
        assert_eq!(
            FormatCommand::parse("justifyCenter", None),
            Some(FormatCommand::Justify(Alignment::Center))
        );
    }

    #[test]
    fn test_unknown_or_malformed_is_none() {
        assert_eq!(FormatCommand::parse("explode", None), None);
        assert_eq!(FormatCommand::parse("foreColor", None), None);
        assert_eq!(FormatCommand::parse("foreColor", Some("red; display: none")), None);
        assert_eq!(FormatCommand::parse("formatBlock", Some("h7")), None);
        assert_eq!(FormatCommand::parse("insertTable", Some("0x3")), None);
        assert_eq!(FormatCommand::parse("insertTable", Some("21x3")), None);
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(
            FormatCommand::parse("hiliteColor", Some("#ffee00")),
            Some(FormatCommand::HiliteColor("#ffee00".to_string()))
        );
        assert_eq!(
            FormatCommand::parse("formatBlock", Some("<H2>")),
            Some(FormatCommand::FormatBlock(BlockFormat::Heading(2)))
        );
        assert_eq!(
            FormatCommand::parse("insertTable", Some("2x3:header")),
            Some(FormatCommand::InsertTable(TableSpec::new(2, 3, true)))
        );
    }

    #[test]
    fn test_insert_html_is_sanitized() {
        assert_eq!(
            FormatCommand::parse("insertHTML", Some(r#"<p onclick="steal()">hi</p><script>x()</script>"#)),
            Some(FormatCommand::InsertHtml("<p>hi</p>".to_string()))
        );
        assert_eq!(FormatCommand::parse("insertHTML", Some("<script>x()</script>")), None);
    }

    #[test]
    fn test_table_limit_is_configurable() {
        assert_eq!(FormatCommand::parse_with_table_limit("insertTable", Some("5x2"), 4), None);
        assert_eq!(
            FormatCommand::parse_with_table_limit("insertTable", Some("4x4"), 4),
            Some(FormatCommand::InsertTable(TableSpec::new(4, 4, false)))
        );
    }
}
