use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use anyhow::Error;
use async_trait::async_trait;
use svelte_preprocess_core::config::GLOBAL_RULE_TRANSFORMER;
use svelte_preprocess_core::plugin::{TransformContext, TransformResult, TransformerPlugin};
use svelte_preprocess_core::result::PreprocessError;
use svelte_preprocess_css::{parse, stringify, stringify_with_map, Rule};

use crate::globalify_selector::globalify_selector;

const MARKER: &str = ":global";

/// Rewrites a segment that follows the global marker
pub type Neutralizer = dyn Fn(&str) -> String + Send + Sync;

/// Removes bare `:global` markers from style blocks.
///
/// `:global .a .b` becomes the neutralized form of `.a .b`, a selector that is exactly
/// `:global` is dropped, and a rule left without selectors is removed.
#[derive(Clone)]
pub struct GlobalRuleTransformerPlugin {
  neutralize: Arc<Neutralizer>,
}

impl GlobalRuleTransformerPlugin {
  pub fn new() -> Self {
    Self::with_neutralizer(globalify_selector)
  }

  pub fn with_neutralizer<F>(neutralize: F) -> Self
  where
    F: Fn(&str) -> String + Send + Sync + 'static,
  {
    GlobalRuleTransformerPlugin {
      neutralize: Arc::new(neutralize),
    }
  }

  /// Returns whether the rule should be kept
  fn globalify_rule(&self, rule: &mut Rule, filename: &Path) -> Result<bool, PreprocessError> {
    let mut changed = false;
    let mut selectors = Vec::new();

    for selector in rule.selectors() {
      let segments =
        split_on_marker(&selector).map_err(|reason| PreprocessError::MalformedSelectorSyntax {
          selector: selector.clone(),
          filename: filename.to_path_buf(),
          reason,
        })?;

      let Some(segments) = segments else {
        selectors.push(selector.clone());
        continue;
      };

      changed = true;
      let Some((beginning, rest)) = segments.split_first() else {
        continue;
      };
      if selector == MARKER {
        continue;
      }

      let globalized = std::iter::once(beginning.trim().to_string())
        .chain(
          rest
            .iter()
            .map(|segment| (self.neutralize)(segment).trim().to_string()),
        )
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

      if !globalized.is_empty() {
        selectors.push(globalized);
      }
    }

    if !changed {
      return Ok(true);
    }

    if selectors.is_empty() {
      tracing::trace!(selector = rule.selector.as_str(), "Removing global rule");
      return Ok(false);
    }

    rule.set_selectors(&selectors);
    Ok(true)
  }
}

impl Default for GlobalRuleTransformerPlugin {
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for GlobalRuleTransformerPlugin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GlobalRuleTransformerPlugin").finish()
  }
}

#[async_trait]
impl TransformerPlugin for GlobalRuleTransformerPlugin {
  fn name(&self) -> &str {
    GLOBAL_RULE_TRANSFORMER
  }

  #[tracing::instrument(level = "trace", skip_all)]
  async fn transform(
    &self,
    context: TransformContext,
    content: String,
  ) -> Result<TransformResult, Error> {
    if !content.contains(MARKER) {
      return Ok(TransformResult::new(content));
    }

    let mut root = parse(&content)?;
    root.try_retain_rules(|rule| self.globalify_rule(rule, &context.filename))?;

    if !context.source_map {
      return Ok(TransformResult::new(stringify(&root)));
    }

    let (code, map) = stringify_with_map(
      &root,
      &context.filename.to_string_lossy(),
      &content,
      &context.project_root.to_string_lossy(),
    )?;

    Ok(TransformResult {
      code,
      map: Some(map),
      dependencies: Vec::new(),
    })
  }
}

/// Splits a selector on every bare `:global` marker.
///
/// Returns `None` when the selector has no marker. Functional `:global(...)` and longer
/// identifiers such as `:globally` are not markers.
fn split_on_marker(selector: &str) -> Result<Option<Vec<&str>>, String> {
  let bytes = selector.as_bytes();
  let mut segments = Vec::new();
  let mut segment_start = 0;
  let mut depth = 0u32;
  let mut quote = None;
  let mut index = 0;

  while index < bytes.len() {
    let byte = bytes[index];

    if let Some(open) = quote {
      match byte {
        b'\\' => index += 1,
        byte if byte == open => quote = None,
        _ => {}
      }
      index += 1;
      continue;
    }

    match byte {
      b'\\' => index += 1,
      b'"' | b'\'' => quote = Some(byte),
      b'(' | b'[' => depth += 1,
      b')' | b']' => depth = depth.saturating_sub(1),
      b':' if is_marker_at(selector, index) => {
        if depth > 0 {
          return Err(format!(
            "`{MARKER}` cannot be used inside parentheses or brackets, use `{MARKER}(...)` instead"
          ));
        }

        segments.push(&selector[segment_start..index]);
        index += MARKER.len();
        segment_start = index;
        continue;
      }
      _ => {}
    }

    index += 1;
  }

  if segments.is_empty() {
    return Ok(None);
  }

  segments.push(&selector[segment_start..]);
  Ok(Some(segments))
}

fn is_marker_at(selector: &str, index: usize) -> bool {
  let Some(rest) = selector[index..].strip_prefix(MARKER) else {
    return false;
  };

  if index > 0 && selector.as_bytes()[index - 1] == b':' {
    return false;
  }

  !rest.starts_with(|c: char| c == '(' || c == '-' || c == '_' || c == '\\' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use std::path::PathBuf;
  use svelte_preprocess_core::types::SourceMap;

  use super::*;

  fn context() -> TransformContext {
    TransformContext {
      language: String::from("css"),
      filename: PathBuf::from("/app/App.svelte"),
      project_root: PathBuf::from("/app"),
      ..TransformContext::default()
    }
  }

  async fn transform(plugin: &GlobalRuleTransformerPlugin, css: &str) -> Result<String, Error> {
    plugin
      .transform(context(), css.to_string())
      .await
      .map(|result| result.code)
  }

  fn identity() -> GlobalRuleTransformerPlugin {
    GlobalRuleTransformerPlugin::with_neutralizer(|segment| segment.to_string())
  }

  #[tokio::test]
  async fn unscopes_selectors_after_the_marker() {
    assert_eq!(
      transform(&identity(), ":global h1 { color: red }")
        .await
        .unwrap(),
      "h1 { color: red }"
    );

    assert_eq!(
      transform(&GlobalRuleTransformerPlugin::new(), ":global h1 { color: red }")
        .await
        .unwrap(),
      ":global(h1) { color: red }"
    );
  }

  #[tokio::test]
  async fn keeps_the_scoped_beginning() {
    assert_eq!(
      transform(&GlobalRuleTransformerPlugin::new(), "div :global .a > .b { margin: 0 }")
        .await
        .unwrap(),
      "div :global(.a) > :global(.b) { margin: 0 }"
    );
  }

  #[tokio::test]
  async fn is_stable_when_run_twice() {
    let plugin = GlobalRuleTransformerPlugin::new();

    let once = transform(&plugin, "div :global :local(.a) .b { margin: 0 }")
      .await
      .unwrap();
    let twice = transform(&plugin, &once).await.unwrap();

    assert_eq!(once, "div .a :global(.b) { margin: 0 }");
    assert_eq!(twice, once);
  }

  #[tokio::test]
  async fn removes_rules_that_are_only_the_marker() {
    let css = indoc! {"
      :global { color: red }
      div { color: blue }
    "};

    assert_eq!(
      transform(&identity(), css).await.unwrap(),
      "\ndiv { color: blue }\n"
    );
  }

  #[tokio::test]
  async fn drops_bare_markers_from_selector_lists() {
    assert_eq!(
      transform(&identity(), ":global, .a { color: red }")
        .await
        .unwrap(),
      ".a { color: red }"
    );
  }

  #[tokio::test]
  async fn rewrites_only_the_marked_selector_in_a_list() {
    let plugin = GlobalRuleTransformerPlugin::new();

    assert_eq!(
      transform(&plugin, ":global .a, .b { color: red }")
        .await
        .unwrap(),
      ":global(.a), .b { color: red }"
    );
    assert_eq!(
      transform(&plugin, ":global .a,\n.b { color: red }")
        .await
        .unwrap(),
      ":global(.a),\n.b { color: red }"
    );
  }

  #[tokio::test]
  async fn leaves_other_rules_untouched() {
    let css = indoc! {"
      a ,b { color: red }
      :global(.c) { color: red }
      .globally :globally { color: red }
      @media print {
        :global .d { color: red }
      }
    "};

    assert_eq!(
      transform(&identity(), css).await.unwrap(),
      indoc! {"
        a ,b { color: red }
        :global(.c) { color: red }
        .globally :globally { color: red }
        @media print {
          .d { color: red }
        }
      "}
    );
  }

  #[tokio::test]
  async fn is_idempotent() {
    let plugin = GlobalRuleTransformerPlugin::new();
    let once = transform(&plugin, ".a :global .b .c {}").await.unwrap();

    assert_eq!(once, ".a :global(.b) :global(.c) {}");
    assert_eq!(transform(&plugin, &once).await.unwrap(), once);
  }

  #[tokio::test]
  async fn rejects_markers_inside_parentheses() {
    let error = transform(&identity(), ".a:not(:global .b) { color: red }")
      .await
      .unwrap_err();

    let error = error.downcast::<PreprocessError>().unwrap();
    assert!(matches!(
      &error,
      PreprocessError::MalformedSelectorSyntax { selector, filename, .. }
        if selector == ".a:not(:global .b)" && filename == Path::new("/app/App.svelte")
    ));
  }

  #[tokio::test]
  async fn ignores_markers_inside_strings() {
    let css = r#"a[title=":global x"] { color: red }"#;

    assert_eq!(transform(&identity(), css).await.unwrap(), css);
  }

  #[tokio::test]
  async fn fails_on_invalid_css() {
    let error = transform(&identity(), ":global a { color: red")
      .await
      .unwrap_err();

    assert!(error.to_string().contains("Unclosed block"));
  }

  #[tokio::test]
  async fn produces_a_source_map_when_requested() {
    let result = identity()
      .transform(
        TransformContext {
          source_map: true,
          ..context()
        },
        String::from(":global .long-selector {}\n:global a {\n  color: red;\n}"),
      )
      .await
      .unwrap();

    assert_eq!(result.code, ".long-selector {}\na {\n  color: red;\n}");

    let mut map: SourceMap = result.map.unwrap();
    let declaration = map.find_closest_mapping(2, 2).unwrap().original.unwrap();
    assert_eq!(
      (declaration.original_line, declaration.original_column),
      (2, 2)
    );
    assert_eq!(map.get_source(0).unwrap(), "App.svelte");
  }

  #[tokio::test]
  async fn passes_through_content_without_markers() {
    let result = GlobalRuleTransformerPlugin::new()
      .transform(
        TransformContext {
          source_map: true,
          ..context()
        },
        String::from("div{color:red}"),
      )
      .await
      .unwrap();

    assert_eq!(result.code, "div{color:red}");
    assert!(result.map.is_none());
  }
}
