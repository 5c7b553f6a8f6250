use std::collections::HashMap;
use std::path::Path;

use crate::types::AttributeMap;

/// Aliases every configuration starts with
const BUILTIN_ALIASES: &[(&str, &str)] = &[
  ("pcss", "css"),
  ("postcss", "css"),
  ("sass", "scss"),
  ("styl", "stylus"),
  ("js", "javascript"),
  ("mjs", "javascript"),
  ("coffee", "coffeescript"),
  ("ts", "typescript"),
  ("htm", "html"),
  ("svelte", "html"),
];

/// Maps language tokens found on blocks to canonical language names
#[derive(Clone, Debug)]
pub struct LanguageAliases {
  aliases: HashMap<String, String>,
}

impl Default for LanguageAliases {
  fn default() -> Self {
    LanguageAliases {
      aliases: BUILTIN_ALIASES
        .iter()
        .map(|(token, language)| (token.to_string(), language.to_string()))
        .collect(),
    }
  }
}

impl LanguageAliases {
  /// Built-in aliases followed by `aliases`; a later declaration of the same token wins
  pub fn new<I, T, L>(aliases: I) -> Self
  where
    I: IntoIterator<Item = (T, L)>,
    T: Into<String>,
    L: Into<String>,
  {
    let mut table = LanguageAliases::default();
    for (token, language) in aliases {
      table.aliases.insert(token.into(), language.into());
    }
    table
  }

  /// Returns the canonical name of `token`; unknown tokens are their own canonical name
  pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
    self
      .aliases
      .get(token)
      .map(|language| language.as_str())
      .unwrap_or(token)
  }

  /// Resolves the canonical language of a block from its attributes.
  ///
  /// A MIME-style `type` takes priority, then `lang`, then the extension of `src`,
  /// then `default_language`.
  pub fn resolve(&self, attributes: &AttributeMap, default_language: &str) -> String {
    let token = declared_language(attributes).unwrap_or(default_language);
    let language = self.canonical(token).to_string();

    tracing::trace!(token, language = language.as_str(), "Resolved block language");

    language
  }
}

fn attribute<'a>(attributes: &'a AttributeMap, name: &str) -> Option<&'a str> {
  attributes
    .get(name)
    .and_then(|value| value.as_str())
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

fn declared_language(attributes: &AttributeMap) -> Option<&str> {
  let from_type = attribute(attributes, "type").and_then(|mime| {
    let (_, subtype) = mime.split_once('/')?;
    Some(subtype).filter(|subtype| !subtype.is_empty())
  });

  from_type
    .or_else(|| attribute(attributes, "lang"))
    .or_else(|| {
      attribute(attributes, "src").and_then(|src| {
        Path::new(src)
          .extension()
          .and_then(|extension| extension.to_str())
          .filter(|extension| !extension.is_empty())
      })
    })
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::types::AttributeValue;

  fn attributes(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
      .iter()
      .map(|(name, value)| (name.to_string(), AttributeValue::from(*value)))
      .collect()
  }

  #[test]
  fn postcss_tokens_resolve_to_css() {
    let aliases = LanguageAliases::default();

    assert_eq!(
      aliases.resolve(&attributes(&[("type", "text/postcss")]), "css"),
      "css"
    );
    assert_eq!(
      aliases.resolve(&attributes(&[("lang", "postcss")]), "css"),
      "css"
    );
  }

  #[test]
  fn type_takes_priority_over_lang_and_src() {
    let aliases = LanguageAliases::default();

    assert_eq!(
      aliases.resolve(
        &attributes(&[("lang", "scss"), ("type", "text/typescript"), ("src", "a.styl")]),
        "css"
      ),
      "typescript"
    );
    assert_eq!(
      aliases.resolve(&attributes(&[("lang", "sass"), ("src", "a.styl")]), "css"),
      "scss"
    );
    assert_eq!(
      aliases.resolve(&attributes(&[("src", "./fixtures/style.styl")]), "css"),
      "stylus"
    );
  }

  #[test]
  fn non_mime_types_are_ignored() {
    let aliases = LanguageAliases::default();

    assert_eq!(
      aliases.resolve(&attributes(&[("type", "module"), ("lang", "ts")]), "javascript"),
      "typescript"
    );
  }

  #[test]
  fn falls_back_to_the_default_language() {
    let aliases = LanguageAliases::default();

    assert_eq!(aliases.resolve(&AttributeMap::new(), "html"), "html");
    assert_eq!(
      aliases.resolve(&attributes(&[("lang", ""), ("src", "./Makefile")]), "css"),
      "css"
    );
  }

  #[test]
  fn unknown_tokens_are_canonical() {
    let aliases = LanguageAliases::default();

    assert_eq!(
      aliases.resolve(&attributes(&[("lang", "customLanguage")]), "css"),
      "customLanguage"
    );
  }

  #[test]
  fn user_aliases_are_appended_and_last_wins() {
    let aliases = LanguageAliases::new([
      ("customLanguage", "scss"),
      ("customLanguage", "css"),
      ("pcss", "less"),
    ]);

    assert_eq!(aliases.canonical("customLanguage"), "css");
    assert_eq!(aliases.canonical("pcss"), "less");
    assert_eq!(aliases.canonical("styl"), "stylus");
  }

  #[test]
  fn resolving_a_canonical_name_is_idempotent() {
    let aliases = LanguageAliases::default();

    for (token, _) in BUILTIN_ALIASES {
      let canonical = aliases.canonical(token);
      assert_eq!(aliases.canonical(canonical), canonical);
    }
  }
}
