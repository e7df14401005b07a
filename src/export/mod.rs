//! Serialization of cell trees.
//!
//! One module per target format; each walks the closed [`CellBody`] enum
//! exhaustively, so a new construct fails to compile until every format
//! handles it. `list_*` variants cover the logical chain.
//!
//! [`CellBody`]: crate::cell::CellBody

pub mod mathml;
pub mod matlab;
pub mod omml;
pub mod tex;
pub mod text;
pub mod xml;
