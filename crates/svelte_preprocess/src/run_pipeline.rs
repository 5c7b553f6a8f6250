use std::path::PathBuf;

use indexmap::IndexSet;
use svelte_preprocess_core::plugin::TransformContext;
use svelte_preprocess_core::result::{PreprocessError, PreprocessResult};
use svelte_preprocess_core::types::{AttributeMap, SourceMap};

use crate::plugins::TransformerPipeline;

pub struct RunPipelineInput<'a> {
  pub pipeline: &'a TransformerPipeline,
  pub content: String,
  /// The file `content` came from
  pub filename: PathBuf,
  pub attributes: AttributeMap,
  pub source_map: bool,
  pub project_root: PathBuf,
}

#[derive(Debug)]
pub struct RunPipelineOutput {
  pub code: String,
  /// Maps `code` back to the pipeline input, when any stage produced a map
  pub map: Option<SourceMap>,
  pub dependencies: Vec<PathBuf>,
}

/// Runs content through every stage of a pipeline, feeding each stage the previous output
#[tracing::instrument(level = "trace", skip_all, fields(language = %input.pipeline.language))]
pub async fn run_pipeline(input: RunPipelineInput<'_>) -> PreprocessResult<RunPipelineOutput> {
  let RunPipelineInput {
    pipeline,
    content,
    filename,
    attributes,
    source_map,
    project_root,
  } = input;

  let mut code = content;
  let mut map: Option<SourceMap> = None;
  let mut dependencies = IndexSet::new();

  for (stage_index, stage) in pipeline.stages().iter().enumerate() {
    tracing::trace!(
      stage = stage_index,
      transformer = stage.name.as_str(),
      "Running transformer"
    );

    let context = TransformContext {
      language: pipeline.language.clone(),
      filename: filename.clone(),
      options: stage.options.clone(),
      attributes: attributes.clone(),
      source_map,
      project_root: project_root.clone(),
    };

    let input_len = code.len();
    let result = stage
      .plugin
      .transform(context, code)
      .await
      .map_err(|error| match error.downcast::<PreprocessError>() {
        Ok(error) => error,
        Err(error) => PreprocessError::TransformerFailure {
          language: pipeline.language.clone(),
          filename: filename.clone(),
          stage: stage_index,
          transformer: stage.plugin.name().to_string(),
          error,
        },
      })?;

    map = match (result.map, map) {
      (Some(mut next), Some(mut previous)) => {
        next.extends(&mut previous)?;
        Some(next)
      }
      (Some(next), None) => Some(next),
      (None, previous) => {
        if source_map && result.code.len() != input_len {
          tracing::warn!(
            transformer = stage.plugin.name(),
            "Transformer changed the content without returning a source map"
          );
        }
        previous
      }
    };

    code = result.code;
    dependencies.extend(result.dependencies);
  }

  Ok(RunPipelineOutput {
    code,
    map,
    dependencies: dependencies.into_iter().collect(),
  })
}
