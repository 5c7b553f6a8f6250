use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::{AttributeMap, JSONObject, SourceMap};

/// Everything a transformer knows about the block it is transforming
#[derive(Clone, Debug, Default)]
pub struct TransformContext {
  /// Canonical language of the block
  pub language: String,
  /// The file the content came from: the component, or the file referenced by `src`
  pub filename: PathBuf,
  /// Options configured for this stage
  pub options: JSONObject,
  /// Attributes of the block, including ones the pipeline does not interpret
  pub attributes: AttributeMap,
  /// Whether the caller asked for source maps
  pub source_map: bool,
  /// Root that source map paths are made relative to
  pub project_root: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct TransformResult {
  pub code: String,
  pub map: Option<SourceMap>,
  /// Files the output was built from, e.g. `@import`ed stylesheets.
  ///
  /// Callers use these to invalidate cached results when the files change.
  pub dependencies: Vec<PathBuf>,
}

impl TransformResult {
  pub fn new(code: impl Into<String>) -> Self {
    TransformResult {
      code: code.into(),
      ..TransformResult::default()
    }
  }
}

/// Compile a single block of content from one language to another
///
/// Transformers are usually wrappers around other tools such as template
/// engines, CSS preprocessors or compilers. Synchronous transformers simply
/// return without awaiting anything.
#[async_trait]
pub trait TransformerPlugin: Debug + Send + Sync {
  /// Name used in logs and errors
  fn name(&self) -> &str;

  async fn transform(
    &self,
    context: TransformContext,
    content: String,
  ) -> Result<TransformResult, anyhow::Error>;
}

pub type TransformFn =
  dyn Fn(String, &TransformContext) -> Result<TransformResult, anyhow::Error> + Send + Sync;

/// Adapts a plain function into a [`TransformerPlugin`]
pub struct TransformerFn {
  name: String,
  transform: Box<TransformFn>,
}

impl TransformerFn {
  pub fn new<F>(name: impl Into<String>, transform: F) -> Self
  where
    F: Fn(String, &TransformContext) -> Result<TransformResult, anyhow::Error>
      + Send
      + Sync
      + 'static,
  {
    TransformerFn {
      name: name.into(),
      transform: Box::new(transform),
    }
  }
}

impl Debug for TransformerFn {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TransformerFn")
      .field("name", &self.name)
      .finish()
  }
}

#[async_trait]
impl TransformerPlugin for TransformerFn {
  fn name(&self) -> &str {
    &self.name
  }

  async fn transform(
    &self,
    context: TransformContext,
    content: String,
  ) -> Result<TransformResult, anyhow::Error> {
    (self.transform)(content, &context)
  }
}

/// Passes content through unchanged
#[derive(Debug, Default)]
pub struct IdentityTransformerPlugin;

#[async_trait]
impl TransformerPlugin for IdentityTransformerPlugin {
  fn name(&self) -> &str {
    "identity"
  }

  async fn transform(
    &self,
    _context: TransformContext,
    content: String,
  ) -> Result<TransformResult, anyhow::Error> {
    Ok(TransformResult::new(content))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[tokio::test]
  async fn identity_returns_content_unchanged() {
    let result = IdentityTransformerPlugin
      .transform(TransformContext::default(), String::from("<div>Hey</div>"))
      .await
      .unwrap();

    assert_eq!(result.code, "<div>Hey</div>");
    assert!(result.map.is_none());
    assert!(result.dependencies.is_empty());
  }

  #[tokio::test]
  async fn function_transformers_receive_context() {
    let transformer = TransformerFn::new("upper", |content, context| {
      Ok(TransformResult {
        code: content.to_uppercase(),
        dependencies: vec![context.filename.clone()],
        ..TransformResult::default()
      })
    });

    let result = transformer
      .transform(
        TransformContext {
          filename: PathBuf::from("styles.scss"),
          ..TransformContext::default()
        },
        String::from("div {}"),
      )
      .await
      .unwrap();

    assert_eq!(transformer.name(), "upper");
    assert_eq!(result.code, "DIV {}");
    assert_eq!(result.dependencies, vec![PathBuf::from("styles.scss")]);
  }
}
