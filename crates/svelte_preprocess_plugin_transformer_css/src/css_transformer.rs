use anyhow::{anyhow, Error};
use async_trait::async_trait;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap as ParcelSourceMap;
use svelte_preprocess_core::config::POSTCSS_TRANSFORMER;
use svelte_preprocess_core::plugin::{TransformContext, TransformResult, TransformerPlugin};
use svelte_preprocess_core::types::JSONValue;

use crate::css_transformer_config::CssTransformerConfig;

/// Post-processes style blocks with lightningcss.
///
/// Adds the vendor prefixes the configured browsers need and optionally minifies.
#[derive(Debug, Default)]
pub struct CssTransformerPlugin;

#[async_trait]
impl TransformerPlugin for CssTransformerPlugin {
  fn name(&self) -> &str {
    POSTCSS_TRANSFORMER
  }

  #[tracing::instrument(level = "trace", skip_all)]
  async fn transform(
    &self,
    context: TransformContext,
    content: String,
  ) -> Result<TransformResult, Error> {
    let config: CssTransformerConfig =
      serde_json::from_value(JSONValue::Object(context.options.clone()))
        .map_err(|error| anyhow!("Invalid {POSTCSS_TRANSFORMER} options: {error}"))?;

    let filename = context.filename.to_string_lossy().into_owned();
    let project_root = context.project_root.to_string_lossy().into_owned();

    let mut stylesheet = StyleSheet::parse(
      &content,
      ParserOptions {
        filename: filename.clone(),
        ..ParserOptions::default()
      },
    )
    .map_err(|error| anyhow!("Failed to parse CSS {filename}: {error}"))?;

    let browsers = match &config.browsers {
      Some(browsers) => Browsers::from_browserslist(browsers.queries())?,
      None => None,
    };
    tracing::trace!(?browsers, minify = config.minify, "Post-processing CSS");

    let targets = Targets {
      browsers,
      ..Targets::default()
    };

    stylesheet
      .minify(MinifyOptions {
        targets: targets.clone(),
        ..MinifyOptions::default()
      })
      .map_err(|error| anyhow!("Failed to process CSS {filename}: {error}"))?;

    let mut source_map = if context.source_map {
      let mut map = ParcelSourceMap::new(&project_root);
      map.add_source(&filename);
      map.set_source_content(0, &content)?;
      Some(map)
    } else {
      None
    };

    let css = stylesheet.to_css(PrinterOptions {
      minify: config.minify,
      source_map: source_map.as_mut(),
      project_root: Some(&project_root),
      targets,
      ..PrinterOptions::default()
    })?;

    Ok(TransformResult {
      code: css.code,
      map: source_map,
      dependencies: Vec::new(),
    })
  }
}
