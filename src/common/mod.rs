//! Cross-cutting services shared by the parser, the layout pass and the
//! exporters: error types and host configuration.

pub mod config;
pub mod error;

pub use config::{Configuration, FontMetrics, MaxLength, MonospaceMetrics, Settings};
pub use error::ParseError;
