pub use transformer_plugin::*;

mod transformer_plugin;
