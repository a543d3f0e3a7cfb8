//! # Folio Markup
//!
//! Typed content tree for rich-text documents.
//!
//! Document content travels as serialized markup (what an editable region
//! reports), but every transform in the editor works on a [`Fragment`]:
//!
//! ```text
//! markup ──tokenize──▶ tokens ──parse──▶ Fragment ──transform──▶ Fragment ──serialize──▶ markup
//! ```
//!
//! Serialization is canonical, so `serialize(parse(serialize(f)))` equals
//! `serialize(f)` for every fragment.

pub mod ast;
pub mod entities;
pub mod id_generator;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod style;

pub use ast::{Attribute, Element, ElementKind, Fragment, Node, MEDIA_FRAME_CLASS};
pub use id_generator::{get_document_seed, IDGenerator};
pub use lexer::{tokenize, Token};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use style::StyleDeclarations;
