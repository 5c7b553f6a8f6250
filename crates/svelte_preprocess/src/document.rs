use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use svelte_preprocess_core::types::{AttributeMap, AttributeValue, Block, BlockKind, Location};

// Comments are matched first so that blocks inside them are skipped
static TEMPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| element_pattern("template"));
static SCRIPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| element_pattern("script"));
static STYLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| element_pattern("style"));

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
    .expect("attribute pattern is valid")
});

fn element_pattern(tag: &str) -> Regex {
  Regex::new(&format!(
    r"(?s)<!--.*?-->|<{tag}(\s[^>]*?)?(?:/>|>(.*?)</{tag}>)"
  ))
  .expect("element pattern is valid")
}

/// A block found in a document, with what surrounds its processed content in the output
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedBlock {
  pub block: Block,
  /// Written before the processed content
  pub prefix: String,
  /// Written after the processed content
  pub suffix: String,
}

/// Parses the attributes of an opening tag; bare attributes are `true`
pub fn parse_attributes(text: &str) -> AttributeMap {
  ATTRIBUTE_PATTERN
    .captures_iter(text)
    .map(|captures| {
      let value = (2..=4)
        .find_map(|group| captures.get(group))
        .map(|value| AttributeValue::from(value.as_str()))
        .unwrap_or(AttributeValue::Bool(true));

      (captures[1].to_string(), value)
    })
    .collect()
}

/// Finds the first `<template>` element.
///
/// The whole element is replaced by the processed content.
pub fn find_markup_block(document: &str, filename: &Path) -> Option<ScannedBlock> {
  TEMPLATE_PATTERN
    .captures_iter(document)
    .find_map(|captures| scan(document, BlockKind::Markup, filename, &captures))
}

/// Finds every script or style element outside comments, in document order.
///
/// Only the content between the tags is replaced. A self-closing element is expanded so that
/// its processed content has somewhere to go.
pub fn find_blocks(document: &str, kind: BlockKind, filename: &Path) -> Vec<ScannedBlock> {
  let pattern = match kind {
    BlockKind::Markup => return find_markup_block(document, filename).into_iter().collect(),
    BlockKind::Script => &SCRIPT_PATTERN,
    BlockKind::Style => &STYLE_PATTERN,
  };

  pattern
    .captures_iter(document)
    .filter_map(|captures| scan(document, kind, filename, &captures))
    .collect()
}

fn scan(
  document: &str,
  kind: BlockKind,
  filename: &Path,
  captures: &Captures,
) -> Option<ScannedBlock> {
  let element = captures.get(0)?;
  if element.as_str().starts_with("<!--") {
    return None;
  }

  let attributes = captures
    .get(1)
    .map(|attributes| parse_attributes(attributes.as_str()))
    .unwrap_or_default();

  let (content, range, prefix, suffix) = match captures.get(2) {
    Some(content) if kind == BlockKind::Markup => {
      (content.as_str(), element.range(), String::new(), String::new())
    }
    Some(content) => (content.as_str(), content.range(), String::new(), String::new()),
    None if kind == BlockKind::Markup => ("", element.range(), String::new(), String::new()),
    None => {
      // `/>` closes the element
      let end = element.end();
      (
        "",
        end - 2..end,
        String::from(">"),
        format!("</{}>", kind.tag_name()),
      )
    }
  };

  let content_start = match captures.get(2) {
    Some(content) => content.start(),
    None => element.end(),
  };

  let block = Block {
    kind,
    content: content.to_string(),
    attributes,
    filename: filename.to_path_buf(),
    range,
    content_start: Location::of_offset(document, content_start),
  };

  Some(ScannedBlock {
    block,
    prefix,
    suffix,
  })
}
