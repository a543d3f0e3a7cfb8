//! Lexer for serialized document content using logos
//!
//! Markup is context dependent: text between tags and the inside of a tag
//! follow different rules. Two logos lexers cover the two contexts and the
//! tokenizer morphs between them at `<name` and at `>` / `/>`.

use logos::{Lexer, Logos};
use std::ops::Range;

use crate::ast::RAW_TEXT_ELEMENTS;

/// Tokens between tags
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentToken<'src> {
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    // <!DOCTYPE ...>, <![if !supportLists]> and friends
    #[regex(r"<![^\-][^>]*>")]
    Declaration,

    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    #[regex(r"<[a-zA-Z][a-zA-Z0-9:_\-]*", |lex| &lex.slice()[1..])]
    TagOpen(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_\-]*[ \t\r\n]*>", close_tag_name)]
    TagClose(&'src str),

    /// A `<` that doesn't start a tag
    #[token("<")]
    Lt,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside a start tag
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TagToken<'src> {
    #[regex(r#"[^ \t\r\n\f"'<>/=]+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, strip_quotes)]
    #[regex(r"'[^']*'", strip_quotes)]
    Quoted(&'src str),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,

    #[token("/")]
    Slash,
}

fn lex_comment<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> &'src str {
    let rest = lex.remainder();
    let (body_len, consumed) = match rest.find("-->") {
        Some(i) => (i, i + 3),
        None => (rest.len(), rest.len()),
    };
    lex.bump(consumed);
    &rest[..body_len]
}

fn close_tag_name<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> &'src str {
    let slice = lex.slice();
    slice[2..slice.len() - 1].trim_end()
}

fn strip_quotes<'src>(lex: &mut Lexer<'src, TagToken<'src>>) -> &'src str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

/// Attribute as written in the source, before entity decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute<'src> {
    pub name: &'src str,
    pub value: Option<&'src str>,
}

/// Token stream consumed by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    Text(&'src str),
    /// Body of a `script` / `style` element, not markup
    RawText(&'src str),
    Comment(&'src str),
    StartTag {
        name: &'src str,
        attributes: Vec<RawAttribute<'src>>,
        self_closing: bool,
    },
    EndTag(&'src str),
}

/// Tokenize serialized content. Never fails: bytes that don't form a token
/// come back as text, declarations and processing instructions are dropped.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let mut tokens = Vec::new();
    let mut lex = ContentToken::lexer(source);

    while let Some(result) = lex.next() {
        let span = lex.span();
        let token = match result {
            Ok(ContentToken::Text(text)) => Token::Text(text),
            Ok(ContentToken::Lt) => Token::Text("<"),
            Ok(ContentToken::Comment(body)) => Token::Comment(body),
            Ok(ContentToken::TagClose(name)) => Token::EndTag(name),
            Ok(ContentToken::Declaration) | Ok(ContentToken::ProcessingInstruction) => continue,
            Ok(ContentToken::TagOpen(name)) => {
                let (attributes, self_closing, mut content) = lex_start_tag(lex.morph());
                let end = content.span().end;
                tokens.push((
                    Token::StartTag {
                        name,
                        attributes,
                        self_closing,
                    },
                    span.start..end,
                ));

                if !self_closing && is_raw_text(name) {
                    if let Some(raw) = skip_raw_text(&mut content, name) {
                        tokens.push(raw);
                    }
                }

                lex = content;
                continue;
            }
            Err(()) => Token::Text(&source[span.clone()]),
        };
        tokens.push((token, span));
    }

    tokens
}

fn lex_start_tag<'src>(
    mut lex: Lexer<'src, TagToken<'src>>,
) -> (Vec<RawAttribute<'src>>, bool, Lexer<'src, ContentToken<'src>>) {
    let mut attributes: Vec<RawAttribute<'src>> = Vec::new();
    let mut expecting_value = false;
    let mut self_closing = false;

    while let Some(result) = lex.next() {
        match result {
            Ok(TagToken::Name(value)) | Ok(TagToken::Quoted(value)) if expecting_value => {
                if let Some(last) = attributes.last_mut() {
                    last.value = Some(value);
                }
                expecting_value = false;
            }
            Ok(TagToken::Name(name)) => attributes.push(RawAttribute { name, value: None }),
            Ok(TagToken::Equals) => expecting_value = !attributes.is_empty(),
            Ok(TagToken::End) => break,
            Ok(TagToken::SelfClose) => {
                self_closing = true;
                break;
            }
            // Stray quotes, slashes and '<' inside a tag are ignored
            Ok(TagToken::Quoted(_)) | Ok(TagToken::Slash) | Err(()) => {}
        }
    }

    (attributes, self_closing, lex.morph())
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

fn skip_raw_text<'src>(
    lex: &mut Lexer<'src, ContentToken<'src>>,
    name: &str,
) -> Option<(Token<'src>, Range<usize>)> {
    let rest = lex.remainder();
    let close = format!("</{}", name.to_ascii_lowercase());
    let len = rest
        .to_ascii_lowercase()
        .find(&close)
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }

    let start = lex.span().end;
    lex.bump(len);
    Some((Token::RawText(&rest[..len]), start..start + len))
}
