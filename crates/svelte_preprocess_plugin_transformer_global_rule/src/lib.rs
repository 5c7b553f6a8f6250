pub use global_rule_transformer::*;
pub use globalify_selector::globalify_selector;

mod global_rule_transformer;
mod globalify_selector;
