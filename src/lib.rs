//! Pomelo - A Rust library for computer-algebra worksheet math
//!
//! This library parses the XML dialect used by worksheet front ends for
//! computer-algebra systems into a tree of typed cells, lays the tree out
//! for display, and serializes it to a range of target formats.
//!
//! # Features
//!
//! - **Math parser**: Turn a line of worksheet XML into a cell tree
//! - **Layout engine**: Compute width, height and baseline for every cell,
//!   with memoization keyed on the font size
//! - **Plain text / Matlab export**: Recover linear input forms
//! - **TeX / MathML / OMML export**: Feed typesetters and word processors
//! - **XML export**: Write the tree back out so it reparses identically
//!
//! # Example - Parsing a line of math
//!
//! ```
//! use pomelo::{Configuration, MathParser, SilentNotifier};
//!
//! let config = Configuration::new();
//! let notifier = SilentNotifier;
//! let mut parser = MathParser::new(&config, &notifier);
//!
//! let cell = parser
//!     .parse_line("<mth><f><r><n>1</n></r><r><v>x</v></r></f></mth>")
//!     .ok_or("malformed input")?;
//!
//! assert_eq!(cell.list_to_text(), "1/x");
//! assert_eq!(cell.list_to_tex(&config), "\\frac{1}{x}");
//! # Ok::<(), &'static str>(())
//! ```
//!
//! # Example - Laying a tree out
//!
//! ```
//! use pomelo::{Configuration, MathParser, SilentNotifier};
//!
//! let config = Configuration::new();
//! let notifier = SilentNotifier;
//! let mut parser = MathParser::new(&config, &notifier);
//!
//! let mut cell = parser
//!     .parse_line("<mth><e><r><v>x</v></r><r><n>2</n></r></e></mth>")
//!     .ok_or("malformed input")?;
//!
//! cell.recalculate_list(&config, config.settings.default_font_size);
//! assert!(cell.width() > 0 && cell.height() > 0);
//! # Ok::<(), &'static str>(())
//! ```

pub mod cell;
pub mod common;
pub mod export;
pub mod parser;
pub mod xml;

pub use cell::{
    Cell, CellBody, EditorKind, FracStyle, GroupData, GroupKind, MatrixData,
    MediaData, ScriptRole, SumStyle, TextStyle,
};
pub use common::{
    Configuration, FontMetrics, MaxLength, MonospaceMetrics, ParseError, Settings,
};
pub use parser::{MathParser, Notifier, SilentNotifier};
pub use xml::XmlNode;
