use std::fmt::Display;
use std::ops::Range;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The kind of region a block was extracted from
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
  Markup,
  Script,
  Style,
}

impl BlockKind {
  /// The language a block of this kind is written in when nothing else is declared
  pub fn base_language(&self) -> &'static str {
    match self {
      BlockKind::Markup => "html",
      BlockKind::Script => "javascript",
      BlockKind::Style => "css",
    }
  }

  pub fn tag_name(&self) -> &'static str {
    match self {
      BlockKind::Markup => "template",
      BlockKind::Script => "script",
      BlockKind::Style => "style",
    }
  }
}

impl Display for BlockKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.tag_name())
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
  /// An attribute written without a value, e.g. `<style global>`
  Bool(bool),
  String(String),
}

impl AttributeValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      AttributeValue::String(value) => Some(value.as_str()),
      AttributeValue::Bool(_) => None,
    }
  }
}

impl From<&str> for AttributeValue {
  fn from(value: &str) -> Self {
    AttributeValue::String(value.to_string())
  }
}

impl From<bool> for AttributeValue {
  fn from(value: bool) -> Self {
    AttributeValue::Bool(value)
  }
}

/// Attributes of a block's opening tag, in source order
pub type AttributeMap = IndexMap<String, AttributeValue>;

/// A zero-based line and column (in UTF-16 code units, as used by source maps)
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Location {
  pub line: u32,
  pub column: u32,
}

impl Location {
  pub fn new(line: u32, column: u32) -> Self {
    Location { line, column }
  }

  /// Moves the location past `text`
  pub fn advance(&mut self, text: &str) {
    for ch in text.chars() {
      if ch == '\n' {
        self.line += 1;
        self.column = 0;
      } else {
        self.column += ch.len_utf16() as u32;
      }
    }
  }

  /// Computes the location of a byte offset within `text`
  pub fn of_offset(text: &str, offset: usize) -> Self {
    let mut location = Location::default();
    location.advance(&text[..offset.min(text.len())]);
    location
  }
}

/// One embedded region of a component document
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
  pub kind: BlockKind,
  /// Raw content between the opening and closing tags
  pub content: String,
  pub attributes: AttributeMap,
  /// The component file the block was found in
  pub filename: PathBuf,
  /// Byte range in the scanned document that the processed block replaces
  pub range: Range<usize>,
  /// Where `content` starts in the scanned document
  pub content_start: Location,
}

impl Block {
  pub fn new(kind: BlockKind, content: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
    Block {
      kind,
      content: content.into(),
      attributes: AttributeMap::new(),
      filename: filename.into(),
      range: 0..0,
      content_start: Location::default(),
    }
  }

  pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
    self.attributes.insert(name.to_string(), value.into());
    self
  }

  /// Returns a string attribute, ignoring empty values
  pub fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .get(name)
      .and_then(|value| value.as_str())
      .filter(|value| !value.is_empty())
  }

  /// The external file this block's content comes from, if any
  pub fn src(&self) -> Option<&str> {
    self.attribute("src")
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn location_counts_lines_and_columns() {
    assert_eq!(
      Location::of_offset("<div>\n  <style>", 15),
      Location::new(1, 9)
    );
  }

  #[test]
  fn location_uses_utf16_columns() {
    let mut location = Location::default();
    location.advance("a😀b");

    assert_eq!(location, Location::new(0, 4));
  }

  #[test]
  fn empty_attributes_are_ignored() {
    let block = Block::new(BlockKind::Style, "", "App.svelte")
      .with_attribute("lang", "")
      .with_attribute("global", true);

    assert_eq!(block.attribute("lang"), None);
    assert_eq!(block.attribute("global"), None);
    assert!(block.attributes.contains_key("global"));
  }

  #[test]
  fn base_languages() {
    assert_eq!(BlockKind::Markup.base_language(), "html");
    assert_eq!(BlockKind::Script.base_language(), "javascript");
    assert_eq!(BlockKind::Style.base_language(), "css");
  }
}
