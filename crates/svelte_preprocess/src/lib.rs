//! Preprocesses the blocks of a component document.
//!
//! The markup block is transformed first, then every script and every style block found in
//! the resulting document. Each block's language is resolved from its attributes, its
//! content is prepared and then run through the chain of transformers registered for that
//! language. Results are spliced back into the document along with an aggregate source map.

pub use preprocessor::*;
pub use svelte_preprocess_core::{config, diagnostic, language, plugin, result, types};
pub use svelte_preprocess_filesystem as file_system;

pub mod document;
pub mod plugins;
pub mod source_map;

mod preprocessor;
mod run_pipeline;
