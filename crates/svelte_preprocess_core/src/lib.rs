pub mod config;
pub mod diagnostic;
pub mod language;
pub mod plugin;
pub mod prepare_content;
pub mod result;
pub mod types;
