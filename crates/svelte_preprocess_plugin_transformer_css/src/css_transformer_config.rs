use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BrowsersConfig {
  Query(String),
  List(Vec<String>),
}

impl BrowsersConfig {
  pub fn queries(&self) -> Vec<String> {
    match self {
      BrowsersConfig::Query(query) => vec![query.clone()],
      BrowsersConfig::List(queries) => queries.clone(),
    }
  }
}

/// Options of the `postcss` stage
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CssTransformerConfig {
  /// Browserslist queries used to add vendor prefixes and lower modern syntax
  pub browsers: Option<BrowsersConfig>,
  #[serde(default)]
  pub minify: bool,
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn accepts_a_query_or_a_list() {
    let config: CssTransformerConfig =
      serde_json::from_value(json!({ "browsers": "safari >= 5.1" })).unwrap();
    assert_eq!(config.browsers.unwrap().queries(), vec!["safari >= 5.1"]);

    let config: CssTransformerConfig =
      serde_json::from_value(json!({ "browsers": ["last 2 versions", "not dead"], "minify": true }))
        .unwrap();
    assert!(config.minify);
    assert_eq!(
      config.browsers.unwrap().queries(),
      vec!["last 2 versions", "not dead"]
    );
  }

  #[test]
  fn ignores_unrelated_options() {
    let config: CssTransformerConfig =
      serde_json::from_value(json!({ "stripIndent": true, "plugins": [] })).unwrap();

    assert_eq!(config, CssTransformerConfig::default());
  }
}
