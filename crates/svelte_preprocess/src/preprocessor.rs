use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use svelte_preprocess_core::config::PreprocessOptions;
use svelte_preprocess_core::language::LanguageAliases;
use svelte_preprocess_core::prepare_content::PreparedContent;
use svelte_preprocess_core::result::{PreprocessError, PreprocessResult};
use svelte_preprocess_core::types::{Block, BlockKind, Location, SourceMap, SourceMapError};
use svelte_preprocess_filesystem::{normalize_path, FileSystemRef};
use tokio::task::JoinSet;

use crate::document::{find_blocks, find_markup_block, ScannedBlock};
use crate::plugins::TransformerRegistry;
use crate::run_pipeline::{run_pipeline, RunPipelineInput};
use crate::source_map::{compose, splice, Replacement};

/// The result of preprocessing one document
#[derive(Debug)]
pub struct PreprocessOutput {
  pub code: String,
  /// Files the output was built from, in block order
  pub dependencies: Vec<PathBuf>,
  /// Present when source maps were requested
  pub map: Option<SourceMap>,
}

impl PreprocessOutput {
  pub fn map_json(&mut self) -> PreprocessResult<Option<String>> {
    match self.map.as_mut() {
      Some(map) => Ok(Some(map.to_json(None)?)),
      None => Ok(None),
    }
  }
}

#[derive(Debug)]
struct BlockOutput {
  code: String,
  map: Option<SourceMap>,
  dependencies: Vec<PathBuf>,
  inline: Option<Location>,
}

impl BlockOutput {
  fn into_replacement(self, scanned: ScannedBlock) -> Replacement {
    Replacement {
      range: scanned.block.range,
      prefix: scanned.prefix,
      code: self.code,
      suffix: scanned.suffix,
      map: self.map,
      inline: self.inline,
    }
  }
}

#[derive(Debug)]
struct PreprocessorState {
  options: PreprocessOptions,
  aliases: LanguageAliases,
  registry: TransformerRegistry,
  file_system: FileSystemRef,
}

/// Preprocesses component documents with a fixed configuration.
///
/// Cloning is cheap; clones share the configuration. Blocks of the same kind are processed
/// concurrently on the current tokio runtime.
#[derive(Clone, Debug)]
pub struct Preprocessor {
  state: Arc<PreprocessorState>,
}

impl Preprocessor {
  pub fn new(options: PreprocessOptions, file_system: FileSystemRef) -> Self {
    let registry = TransformerRegistry::new(&options);
    Self::with_registry(options, registry, file_system)
  }

  /// Creates a preprocessor with extra default transformers, e.g. a sass compiler for `scss`
  pub fn with_registry(
    options: PreprocessOptions,
    registry: TransformerRegistry,
    file_system: FileSystemRef,
  ) -> Self {
    let aliases = LanguageAliases::new(options.aliases.iter().cloned());

    Preprocessor {
      state: Arc::new(PreprocessorState {
        options,
        aliases,
        registry,
        file_system,
      }),
    }
  }

  /// Preprocesses the markup block, then every script block, then every style block
  #[tracing::instrument(level = "debug", skip_all, fields(filename = %filename.display()))]
  pub async fn preprocess(
    &self,
    content: &str,
    filename: &Path,
  ) -> PreprocessResult<PreprocessOutput> {
    let document = match &self.state.options.on_before {
      Some(hook) => hook
        .on_before(content.to_string(), filename)
        .await
        .map_err(PreprocessError::Hook)?,
      None => content.to_string(),
    };

    let with_map = self.state.options.source_map;
    let project_root = project_root(filename);
    let mut dependencies = IndexSet::new();

    let mut markup_map = None;
    let mut current = document.clone();

    if let Some(scanned) = find_markup_block(&document, filename) {
      let output = self.process_block(scanned.block.clone()).await?;
      dependencies.extend(output.dependencies.iter().cloned());

      let (code, map) = splice(
        &document,
        filename,
        &project_root,
        vec![output.into_replacement(scanned)],
        with_map,
      )?;

      current = code;
      markup_map = map;
    }

    let mut replacements = Vec::new();
    for kind in [BlockKind::Script, BlockKind::Style] {
      let scanned = find_blocks(&current, kind, filename);
      tracing::debug!(%kind, count = scanned.len(), "Found blocks");

      let outputs = self
        .process_blocks(scanned.iter().map(|scanned| scanned.block.clone()).collect())
        .await?;

      for (scanned, output) in scanned.into_iter().zip(outputs) {
        dependencies.extend(output.dependencies.iter().cloned());
        replacements.push(output.into_replacement(scanned));
      }
    }

    let (code, map) = splice(&current, filename, &project_root, replacements, with_map)?;

    let map = match (map, markup_map) {
      (Some(map), Some(mut markup_map)) => {
        Some(compose(&map, &mut markup_map, filename, &project_root)?)
      }
      (map, _) => map,
    };

    Ok(PreprocessOutput {
      code,
      dependencies: dependencies.into_iter().collect(),
      map,
    })
  }

  /// Processes blocks concurrently, returning their outputs in the order of `blocks`
  async fn process_blocks(&self, blocks: Vec<Block>) -> PreprocessResult<Vec<BlockOutput>> {
    let mut outputs = Vec::with_capacity(blocks.len());
    outputs.resize_with(blocks.len(), || None);

    let mut tasks = JoinSet::new();
    for (index, block) in blocks.into_iter().enumerate() {
      let preprocessor = self.clone();
      tasks.spawn(async move { (index, preprocessor.process_block(block).await) });
    }

    // Returning early drops the set, which aborts the remaining tasks
    while let Some(joined) = tasks.join_next().await {
      let (index, output) = joined
        .map_err(|error| PreprocessError::Message(format!("Block task failed: {error}")))?;
      outputs[index] = Some(output?);
    }

    Ok(outputs.into_iter().flatten().collect())
  }

  #[tracing::instrument(level = "trace", skip_all, fields(kind = %block.kind))]
  async fn process_block(&self, block: Block) -> PreprocessResult<BlockOutput> {
    let state = &self.state;

    let language = state
      .aliases
      .resolve(&block.attributes, block.kind.base_language());
    let pipeline = state
      .registry
      .pipeline(&language, block.kind, &block.filename)?;

    let project_root = project_root(&block.filename);
    let mut dependencies = Vec::new();

    let (content, source, inline) = match block.src() {
      Some(src) => {
        let directory = if project_root.is_absolute() {
          project_root.clone()
        } else {
          state
            .file_system
            .cwd()
            .map(|cwd| cwd.join(&project_root))
            .unwrap_or_else(|_| project_root.clone())
        };

        let path = normalize_path(&directory.join(src));
        let content = state.file_system.read_to_string(&path).map_err(|source| {
          PreprocessError::UnresolvableReference {
            reference: src.to_string(),
            filename: block.filename.clone(),
            source,
          }
        })?;

        tracing::trace!(path = %path.display(), "Loaded external block content");
        dependencies.push(path.clone());
        (content, path, None)
      }
      None => {
        if block.content.trim().is_empty() {
          return Ok(BlockOutput {
            code: block.content,
            map: None,
            dependencies,
            inline: None,
          });
        }

        (
          block.content.clone(),
          block.filename.clone(),
          Some(block.content_start),
        )
      }
    };

    let prepared = PreparedContent::new(&content, &state.options.prepare_options(&language));

    let output = run_pipeline(RunPipelineInput {
      pipeline: &pipeline,
      content: prepared.code.clone(),
      filename: source.clone(),
      attributes: block.attributes.clone(),
      source_map: state.options.source_map,
      project_root: project_root.clone(),
    })
    .await?;

    dependencies.extend(output.dependencies);

    let map = if state.options.source_map {
      Some(block_map(
        output.map,
        &prepared,
        &content,
        &source,
        &project_root,
      )?)
    } else {
      None
    };

    Ok(BlockOutput {
      code: output.code,
      map,
      dependencies,
      inline,
    })
  }
}

/// Source map paths are relative to the component's directory
fn project_root(filename: &Path) -> PathBuf {
  filename
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_default()
}

/// Maps a block's output back to its content before preparation
fn block_map(
  map: Option<SourceMap>,
  prepared: &PreparedContent,
  original: &str,
  source: &Path,
  project_root: &Path,
) -> Result<SourceMap, SourceMapError> {
  let source = source.to_string_lossy();
  let project_root = project_root.to_string_lossy();

  match (map, prepared.is_shifted()) {
    (Some(mut map), true) => {
      let mut prepared_map = prepared.source_map(&source, original, &project_root)?;
      map.extends(&mut prepared_map)?;
      Ok(map)
    }
    (Some(map), false) => Ok(map),
    (None, true) => prepared.source_map(&source, original, &project_root),
    (None, false) => {
      let mut map = SourceMap::new(&project_root);
      map.add_empty_map(&source, original, 0)?;
      Ok(map)
    }
  }
}
