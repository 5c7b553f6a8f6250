pub use css_transformer::*;
pub use css_transformer_config::*;

mod css_transformer;
mod css_transformer_config;
