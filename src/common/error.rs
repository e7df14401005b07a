//! Error types for worksheet XML loading.
//!
//! Only transport-level failures are fatal: a byte stream that is not
//! well-formed XML cannot produce a cell tree. Every structural problem
//! inside well-formed XML (missing children, unknown tags, bad attribute
//! values) degrades locally to placeholder cells instead of erroring.

use thiserror::Error;

/// Errors raised while loading worksheet XML into a node tree.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The underlying XML reader rejected the byte stream.
    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be tokenized.
    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// An entity or character reference could not be resolved.
    #[error("malformed XML escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Element or text content was not valid UTF-8.
    #[error("invalid UTF-8 in XML input: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A general entity reference named no known entity.
    #[error("unknown entity reference &{0};")]
    Entity(String),

    /// The document contained no root element.
    #[error("document contains no root element")]
    MissingRoot,

    /// Element nesting exceeded the recursion guard.
    #[error("XML nesting deeper than {0} levels")]
    TooDeep(usize),
}
