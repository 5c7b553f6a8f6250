use crate::types::{JSONValue, OriginalLocation, SourceMap, SourceMapError};

/// Block content after indentation stripping and data prepending
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedContent {
  pub code: String,
  /// Number of lines inserted before the original content
  pub prepended_lines: u32,
  /// Number of leading whitespace characters removed from every indented line
  pub indent: usize,
}

impl PreparedContent {
  /// Prepares `content` according to `options`.
  ///
  /// Only an options object is honoured; any other value leaves the content untouched.
  /// Indentation is stripped before data is prepended, so prepended data is never stripped.
  pub fn new(content: &str, options: &JSONValue) -> Self {
    let JSONValue::Object(options) = options else {
      return PreparedContent {
        code: content.to_string(),
        ..PreparedContent::default()
      };
    };

    let (mut code, indent) = if options.get("stripIndent").is_some_and(is_truthy) {
      strip_indent(content)
    } else {
      (content.to_string(), 0)
    };

    let mut prepended_lines = 0;
    if let Some(prepend_data) = options
      .get("prependData")
      .and_then(|value| value.as_str())
      .filter(|value| !value.is_empty())
    {
      prepended_lines = prepend_data.matches('\n').count() as u32 + 1;
      code = format!("{prepend_data}\n{code}");
    }

    PreparedContent {
      code,
      prepended_lines,
      indent,
    }
  }

  /// Whether positions in `code` differ from positions in the original content
  pub fn is_shifted(&self) -> bool {
    self.prepended_lines > 0 || self.indent > 0
  }

  /// Maps the start of every prepared line back to the original content
  pub fn source_map(
    &self,
    source: &str,
    original: &str,
    project_root: &str,
  ) -> Result<SourceMap, SourceMapError> {
    let mut map = SourceMap::new(project_root);
    let source_index = map.add_source(source);
    map.set_source_content(source_index as usize, original)?;

    for (line, text) in original.split('\n').enumerate() {
      let column = if has_indent(text, self.indent) {
        self.indent
      } else {
        0
      };

      map.add_mapping(
        line as u32 + self.prepended_lines,
        0,
        Some(OriginalLocation::new(
          line as u32,
          column as u32,
          source_index,
          None,
        )),
      );
    }

    Ok(map)
  }
}

/// Prepares block content before any transformer sees it. Never fails.
pub fn prepare_content(content: &str, options: &JSONValue) -> String {
  PreparedContent::new(content, options).code
}

/// Removes the longest run of leading whitespace shared by every non-blank line.
///
/// Returns the stripped content and the number of characters removed per line.
pub fn strip_indent(content: &str) -> (String, usize) {
  let indent = content
    .split('\n')
    .filter(|line| !line.trim().is_empty())
    .map(|line| {
      line
        .bytes()
        .take_while(|byte| matches!(byte, b' ' | b'\t'))
        .count()
    })
    .min()
    .unwrap_or(0);

  if indent == 0 {
    return (content.to_string(), 0);
  }

  let stripped = content
    .split('\n')
    .map(|line| {
      if has_indent(line, indent) {
        &line[indent..]
      } else {
        line
      }
    })
    .collect::<Vec<_>>()
    .join("\n");

  (stripped, indent)
}

fn has_indent(line: &str, indent: usize) -> bool {
  indent > 0
    && line
      .as_bytes()
      .get(..indent)
      .is_some_and(|prefix| prefix.iter().all(|byte| matches!(byte, b' ' | b'\t')))
}

fn is_truthy(value: &JSONValue) -> bool {
  match value {
    JSONValue::Null => false,
    JSONValue::Bool(value) => *value,
    JSONValue::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
    JSONValue::String(value) => !value.is_empty(),
    JSONValue::Array(_) | JSONValue::Object(_) => true,
  }
}
