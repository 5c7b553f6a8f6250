use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

pub type PreprocessResult<T> = std::result::Result<T, PreprocessError>;

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error(
    "svelte-preprocess: language \"{language}\" is disabled but is used in {}",
    .filename.display()
  )]
  LanguageDisabled { language: String, filename: PathBuf },

  #[error(
    "svelte-preprocess: no transformer is registered for language \"{language}\" used in {}",
    .filename.display()
  )]
  NoTransformer { language: String, filename: PathBuf },

  #[error(
    "svelte-preprocess: transformer \"{transformer}\" (stage {stage}) failed to process \"{language}\" in {}: {error}",
    .filename.display()
  )]
  TransformerFailure {
    language: String,
    filename: PathBuf,
    stage: usize,
    transformer: String,
    error: anyhow::Error,
  },

  #[error(
    "svelte-preprocess: could not load \"{reference}\" referenced from {}: {source}",
    .filename.display()
  )]
  UnresolvableReference {
    reference: String,
    filename: PathBuf,
    source: std::io::Error,
  },

  #[error(
    "svelte-preprocess: cannot rewrite selector \"{selector}\" in {}: {reason}",
    .filename.display()
  )]
  MalformedSelectorSyntax {
    selector: String,
    filename: PathBuf,
    reason: String,
  },

  #[error("svelte-preprocess: onBefore hook failed: {}", .0)]
  Hook(anyhow::Error),

  #[error("svelte-preprocess: source map error: {}", .0)]
  SourceMap(String),

  #[error("svelte-preprocess: {}", .0)]
  Message(String),
}

impl PreprocessError {
  /// The canonical language this error relates to, if any
  pub fn language(&self) -> Option<&str> {
    match self {
      PreprocessError::LanguageDisabled { language, .. }
      | PreprocessError::NoTransformer { language, .. }
      | PreprocessError::TransformerFailure { language, .. } => Some(language),
      _ => None,
    }
  }

  pub fn filename(&self) -> Option<&PathBuf> {
    match self {
      PreprocessError::LanguageDisabled { filename, .. }
      | PreprocessError::NoTransformer { filename, .. }
      | PreprocessError::TransformerFailure { filename, .. }
      | PreprocessError::UnresolvableReference { filename, .. }
      | PreprocessError::MalformedSelectorSyntax { filename, .. } => Some(filename),
      _ => None,
    }
  }

  fn name(&self) -> &'static str {
    match self {
      PreprocessError::LanguageDisabled { .. } => "LanguageDisabled",
      PreprocessError::NoTransformer { .. } => "NoTransformer",
      PreprocessError::TransformerFailure { .. } => "TransformerFailure",
      PreprocessError::UnresolvableReference { .. } => "UnresolvableReference",
      PreprocessError::MalformedSelectorSyntax { .. } => "MalformedSelectorSyntax",
      PreprocessError::Hook(_) => "HookFailure",
      PreprocessError::SourceMap(_) => "SourceMapError",
      PreprocessError::Message(_) => "Error",
    }
  }

  pub fn diagnostic(&self) -> Diagnostic {
    let hints = match self {
      PreprocessError::LanguageDisabled { language, .. } => Some(vec![format!(
        "Remove `{language}: false` from the transformers option to process this block"
      )]),
      PreprocessError::NoTransformer { language, .. } => Some(vec![format!(
        "Register a transformer for \"{language}\" or declare an alias to a supported language"
      )]),
      _ => None,
    };

    let origin = match self {
      PreprocessError::TransformerFailure { transformer, .. } => Some(transformer.clone()),
      _ => Some(String::from("svelte-preprocess")),
    };

    Diagnostic {
      message: self.to_string(),
      origin,
      name: Some(self.name().to_string()),
      language: self.language().map(String::from),
      file_path: self.filename().cloned(),
      hints,
    }
  }
}

impl From<parcel_sourcemap::SourceMapError> for PreprocessError {
  fn from(error: parcel_sourcemap::SourceMapError) -> Self {
    PreprocessError::SourceMap(error.to_string())
  }
}
