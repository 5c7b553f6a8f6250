use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use svelte_preprocess_core::config::{
  PreprocessOptions, TransformerSetting, GLOBAL_RULE_TRANSFORMER, POSTCSS_TRANSFORMER,
};
use svelte_preprocess_core::plugin::{IdentityTransformerPlugin, TransformerPlugin};
use svelte_preprocess_core::result::{PreprocessError, PreprocessResult};
use svelte_preprocess_core::types::{BlockKind, JSONObject};
use svelte_preprocess_plugin_transformer_css::CssTransformerPlugin;
use svelte_preprocess_plugin_transformer_global_rule::GlobalRuleTransformerPlugin;

/// One transformer in a chain, with the options it runs with
#[derive(Clone, Debug)]
pub struct TransformerStage {
  pub name: String,
  pub plugin: Arc<dyn TransformerPlugin>,
  pub options: JSONObject,
}

impl TransformerStage {
  pub fn new(name: &str, plugin: Arc<dyn TransformerPlugin>, options: JSONObject) -> Self {
    TransformerStage {
      name: name.to_string(),
      plugin,
      options,
    }
  }
}

enum Lookup {
  Disabled,
  Missing,
  Stage(TransformerStage),
}

/// Transformers available to a preprocessing run, keyed by canonical language.
///
/// Every base language starts with an identity transformer, `postcss` with the lightningcss
/// post-processor and `globalRule` with the selector globalization transform. Configuration
/// may disable a language, replace its transformer or give it options.
#[derive(Clone)]
pub struct TransformerRegistry {
  defaults: HashMap<String, Arc<dyn TransformerPlugin>>,
  settings: BTreeMap<String, TransformerSetting>,
}

impl TransformerRegistry {
  pub fn new(options: &PreprocessOptions) -> Self {
    let mut defaults: HashMap<String, Arc<dyn TransformerPlugin>> = HashMap::new();

    for kind in [BlockKind::Markup, BlockKind::Script, BlockKind::Style] {
      defaults.insert(
        kind.base_language().to_string(),
        Arc::new(IdentityTransformerPlugin),
      );
    }
    defaults.insert(
      POSTCSS_TRANSFORMER.to_string(),
      Arc::new(CssTransformerPlugin),
    );
    defaults.insert(
      GLOBAL_RULE_TRANSFORMER.to_string(),
      Arc::new(GlobalRuleTransformerPlugin::new()),
    );

    TransformerRegistry {
      defaults,
      settings: options.transformer_settings(),
    }
  }

  /// Registers the transformer used for `language` unless configuration replaces it.
  ///
  /// Options configured for the language are passed to it.
  pub fn with_default<T>(mut self, language: &str, transformer: T) -> Self
  where
    T: TransformerPlugin + 'static,
  {
    self
      .defaults
      .insert(language.to_string(), Arc::new(transformer));
    self
  }

  fn lookup(&self, language: &str) -> Lookup {
    let default = || self.defaults.get(language).cloned();

    let (plugin, options) = match self.settings.get(language) {
      Some(TransformerSetting::Disabled) => return Lookup::Disabled,
      Some(TransformerSetting::Custom(plugin)) => (Some(plugin.clone()), JSONObject::new()),
      Some(TransformerSetting::Options(options)) => (default(), options.clone()),
      Some(TransformerSetting::Enabled) | None => (default(), JSONObject::new()),
    };

    match plugin {
      Some(plugin) => Lookup::Stage(TransformerStage::new(language, plugin, options)),
      None => Lookup::Missing,
    }
  }

  /// Builds the chain of transformers a block of `language` runs through.
  ///
  /// Style blocks get the `postcss` stage when it is configured and the `globalRule` stage
  /// unless it is disabled, whichever transformer handles the language itself.
  pub fn pipeline(
    &self,
    language: &str,
    kind: BlockKind,
    filename: &Path,
  ) -> PreprocessResult<TransformerPipeline> {
    let primary = match self.lookup(language) {
      Lookup::Stage(stage) => stage,
      Lookup::Disabled => {
        return Err(PreprocessError::LanguageDisabled {
          language: language.to_string(),
          filename: filename.to_path_buf(),
        })
      }
      Lookup::Missing => {
        return Err(PreprocessError::NoTransformer {
          language: language.to_string(),
          filename: filename.to_path_buf(),
        })
      }
    };

    let mut stages = vec![primary];

    if kind == BlockKind::Style {
      let postcss_enabled = self
        .settings
        .get(POSTCSS_TRANSFORMER)
        .is_some_and(|setting| !setting.is_disabled());

      for (name, enabled) in [
        (POSTCSS_TRANSFORMER, postcss_enabled),
        (GLOBAL_RULE_TRANSFORMER, true),
      ] {
        if let (true, Lookup::Stage(stage)) = (enabled, self.lookup(name)) {
          stages.push(stage);
        }
      }
    }

    let pipeline = TransformerPipeline {
      language: language.to_string(),
      stages,
    };

    tracing::debug!(
      language,
      stages = ?pipeline.names(),
      "Built transformer pipeline"
    );

    Ok(pipeline)
  }
}

impl Debug for TransformerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut languages = self.defaults.keys().collect::<Vec<_>>();
    languages.sort();

    f.debug_struct("TransformerRegistry")
      .field("defaults", &languages)
      .field("settings", &self.settings)
      .finish()
  }
}

/// Ordered transformers for one canonical language
#[derive(Clone, Debug)]
pub struct TransformerPipeline {
  pub language: String,
  stages: Vec<TransformerStage>,
}

impl TransformerPipeline {
  pub fn new(language: &str, stages: Vec<TransformerStage>) -> Self {
    TransformerPipeline {
      language: language.to_string(),
      stages,
    }
  }

  pub fn stages(&self) -> &[TransformerStage] {
    &self.stages
  }

  pub fn names(&self) -> Vec<&str> {
    self.stages.iter().map(|stage| stage.name.as_str()).collect()
  }
}
