//! A small lossless CSS tree.
//!
//! Parsing then printing an unchanged stylesheet reproduces it byte for byte. Only the
//! pieces the style stages edit (rule selectors) are interpreted; everything else is kept
//! as raw text.

pub mod ast;
pub mod css_syntax_error;
pub mod list;
pub mod parse;
pub mod stringifier;

pub use ast::*;
pub use css_syntax_error::CssSyntaxError;
pub use list::comma;
pub use parse::parse;
pub use stringifier::{stringify, stringify_with_map};
