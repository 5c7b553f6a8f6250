use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::plugin::TransformerPlugin;
use crate::types::{JSONObject, JSONValue};

/// Transformer key of the post-processor appended to every style block
pub const POSTCSS_TRANSFORMER: &str = "postcss";

/// Transformer key of the selector globalization stage appended to every style block
pub const GLOBAL_RULE_TRANSFORMER: &str = "globalRule";

/// How a language (or trailing stage) is configured
#[derive(Clone, Debug)]
pub enum TransformerSetting {
  /// Blocks resolving to this language must fail
  Disabled,
  /// Use the default transformer with default options
  Enabled,
  /// Use the default transformer with these options
  Options(JSONObject),
  /// Replace the default transformer
  Custom(Arc<dyn TransformerPlugin>),
}

impl TransformerSetting {
  pub fn custom<T: TransformerPlugin + 'static>(transformer: T) -> Self {
    TransformerSetting::Custom(Arc::new(transformer))
  }

  pub fn is_disabled(&self) -> bool {
    matches!(self, TransformerSetting::Disabled)
  }

  pub fn options(&self) -> Option<&JSONObject> {
    match self {
      TransformerSetting::Options(options) => Some(options),
      _ => None,
    }
  }

  fn from_value(value: &JSONValue) -> Option<Self> {
    match value {
      JSONValue::Bool(false) => Some(TransformerSetting::Disabled),
      JSONValue::Bool(true) => Some(TransformerSetting::Enabled),
      JSONValue::Object(options) => Some(TransformerSetting::Options(options.clone())),
      _ => None,
    }
  }
}

impl<'de> Deserialize<'de> for TransformerSetting {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSetting {
      Flag(bool),
      Options(JSONObject),
    }

    Ok(match RawSetting::deserialize(deserializer)? {
      RawSetting::Flag(false) => TransformerSetting::Disabled,
      RawSetting::Flag(true) => TransformerSetting::Enabled,
      RawSetting::Options(options) => TransformerSetting::Options(options),
    })
  }
}

/// Runs once on the whole document before any block is extracted
#[async_trait]
pub trait DocumentHook: Send + Sync {
  async fn on_before(&self, content: String, filename: &Path) -> anyhow::Result<String>;
}

#[async_trait]
impl<F> DocumentHook for F
where
  F: Fn(&str, &Path) -> String + Send + Sync,
{
  async fn on_before(&self, content: String, filename: &Path) -> anyhow::Result<String> {
    Ok(self(&content, filename))
  }
}

/// Options for one preprocessing run
///
/// Deserializes from the camelCase JSON shape callers pass in, e.g.
/// `{ "stripIndent": true, "aliases": [["customLanguage", "css"]], "transformers": { "scss": false } }`.
/// Hooks and custom transformers can only be set in code.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessOptions {
  /// Remove the indentation shared by every line before transforming
  pub strip_indent: bool,
  /// Content prepended (followed by a newline) to every block before transforming
  pub prepend_data: Option<String>,
  /// Extra `(token, canonical language)` pairs added to the built-in alias table
  pub aliases: Vec<(String, String)>,
  pub transformers: BTreeMap<String, TransformerSetting>,
  /// Produce an aggregate source map
  pub source_map: bool,
  #[serde(skip)]
  pub on_before: Option<Arc<dyn DocumentHook>>,
  /// Top-level language keys, e.g. `{ "scss": { ... } }`
  #[serde(flatten)]
  shorthand: BTreeMap<String, JSONValue>,
}

impl PreprocessOptions {
  pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(input)
  }

  pub fn with_strip_indent(mut self, strip_indent: bool) -> Self {
    self.strip_indent = strip_indent;
    self
  }

  pub fn with_prepend_data(mut self, data: impl Into<String>) -> Self {
    self.prepend_data = Some(data.into());
    self
  }

  pub fn with_source_map(mut self, source_map: bool) -> Self {
    self.source_map = source_map;
    self
  }

  pub fn with_transformer(mut self, language: &str, setting: TransformerSetting) -> Self {
    self.transformers.insert(language.to_string(), setting);
    self
  }

  pub fn with_alias(mut self, token: &str, language: &str) -> Self {
    self
      .aliases
      .push((token.to_string(), language.to_string()));
    self
  }

  pub fn with_on_before<H: DocumentHook + 'static>(mut self, hook: H) -> Self {
    self.on_before = Some(Arc::new(hook));
    self
  }

  /// All transformer settings, with explicit `transformers` entries winning over shorthand keys
  pub fn transformer_settings(&self) -> BTreeMap<String, TransformerSetting> {
    let mut settings: BTreeMap<String, TransformerSetting> = self
      .shorthand
      .iter()
      .filter_map(|(language, value)| {
        TransformerSetting::from_value(value).map(|setting| (language.clone(), setting))
      })
      .collect();

    for (language, setting) in &self.transformers {
      settings.insert(language.clone(), setting.clone());
    }

    settings
  }

  pub fn transformer_setting(&self, language: &str) -> Option<TransformerSetting> {
    self.transformers.get(language).cloned().or_else(|| {
      self
        .shorthand
        .get(language)
        .and_then(TransformerSetting::from_value)
    })
  }

  /// Options that drive content preparation for blocks of `language`.
  ///
  /// Global `stripIndent`/`prependData` values are overridden by the same keys in the
  /// language's options object.
  pub fn prepare_options(&self, language: &str) -> JSONValue {
    let mut options = JSONObject::new();
    options.insert("stripIndent".into(), self.strip_indent.into());
    if let Some(prepend_data) = &self.prepend_data {
      options.insert("prependData".into(), prepend_data.clone().into());
    }

    if let Some(TransformerSetting::Options(language_options)) = self.transformer_setting(language)
    {
      for key in ["stripIndent", "prependData"] {
        if let Some(value) = language_options.get(key) {
          options.insert(key.into(), value.clone());
        }
      }
    }

    JSONValue::Object(options)
  }
}

impl Debug for PreprocessOptions {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PreprocessOptions")
      .field("strip_indent", &self.strip_indent)
      .field("prepend_data", &self.prepend_data)
      .field("aliases", &self.aliases)
      .field("transformers", &self.transformer_settings())
      .field("source_map", &self.source_map)
      .field("on_before", &self.on_before.is_some())
      .finish()
  }
}
