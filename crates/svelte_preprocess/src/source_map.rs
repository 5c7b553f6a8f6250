//! Assembly of the aggregate source map.
//!
//! Block maps are positioned relative to the block content they were produced from. Splicing
//! shifts them to where the block lands in the output document and, for inline blocks, to
//! where the block's content was in the input document.

use std::ops::Range;
use std::path::Path;

use svelte_preprocess_core::result::PreprocessResult;
use svelte_preprocess_core::types::{Location, OriginalLocation, SourceMap, SourceMapError};

/// Processed content that replaces a range of a document
#[derive(Debug)]
pub struct Replacement {
  pub range: Range<usize>,
  pub prefix: String,
  pub code: String,
  pub suffix: String,
  /// Maps `code` back to the block content or the file it was loaded from
  pub map: Option<SourceMap>,
  /// Where the block content started in the document, for blocks written inline
  pub inline: Option<Location>,
}

struct Splicer<'a> {
  output: String,
  generated: Location,
  map: Option<(SourceMap, u32, &'a str)>,
}

impl Splicer<'_> {
  fn push(&mut self, text: &str) {
    self.generated.advance(text);
    self.output.push_str(text);
  }

  /// Copies unchanged document text, mapping the start of it and of each of its lines
  fn copy(&mut self, text: &str, mut original: Location) {
    if let Some((map, document_index, _)) = &mut self.map {
      let mut generated = self.generated;

      for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
          generated = Location::new(generated.line + 1, 0);
          original = Location::new(original.line + 1, 0);
        }

        if !line.is_empty() {
          map.add_mapping(
            generated.line,
            generated.column,
            Some(OriginalLocation::new(
              original.line,
              original.column,
              *document_index,
              None,
            )),
          );
        }
      }
    }

    self.push(text);
  }

  fn insert(
    &mut self,
    code: &str,
    block_map: Option<&SourceMap>,
    inline: Option<Location>,
  ) -> Result<(), SourceMapError> {
    if let (Some((map, document_index, document)), Some(block_map)) = (&mut self.map, block_map) {
      let start = self.generated;
      let mut sources = Vec::new();
      for index in 0..block_map.get_sources().len() as u32 {
        sources.push(copy_source(block_map, index, map, document)?);
      }

      for mapping in block_map.get_mappings() {
        let (line, column) = offset(start, mapping.generated_line, mapping.generated_column);

        let original = match mapping.original {
          Some(original) => {
            let Some(source) = sources.get(original.source as usize).copied() else {
              continue;
            };

            let (original_line, original_column) = match inline {
              Some(content_start) if source == *document_index => {
                offset(content_start, original.original_line, original.original_column)
              }
              _ => (original.original_line, original.original_column),
            };

            let name = match original.name {
              Some(name) => Some(map.add_name(block_map.get_name(name)?)),
              None => None,
            };

            Some(OriginalLocation::new(
              original_line,
              original_column,
              source,
              name,
            ))
          }
          None => None,
        };

        map.add_mapping(line, column, original);
      }
    }

    self.push(code);
    Ok(())
  }
}

fn offset(start: Location, line: u32, column: u32) -> (u32, u32) {
  if line == 0 {
    (start.line, start.column + column)
  } else {
    (start.line + line, column)
  }
}

/// Adds a source of `from` to `to` along with its content.
///
/// The document's own content is left to the caller.
fn copy_source(
  from: &SourceMap,
  index: u32,
  to: &mut SourceMap,
  document: &str,
) -> Result<u32, SourceMapError> {
  let name = from.get_source(index)?;
  let copied = to.add_source(name);

  if name != document {
    if let Ok(content) = from.get_source_content(index) {
      if !content.is_empty() {
        to.set_source_content(copied as usize, content)?;
      }
    }
  }

  Ok(copied)
}

/// Replaces ranges of `document` with processed content.
///
/// Replacements are applied in document order; one that overlaps an earlier replacement is
/// skipped. With `with_map`, the returned map traces the output back to `document` and to
/// every file blocks were loaded from.
pub fn splice(
  document: &str,
  filename: &Path,
  project_root: &Path,
  mut replacements: Vec<Replacement>,
  with_map: bool,
) -> PreprocessResult<(String, Option<SourceMap>)> {
  replacements.sort_by_key(|replacement| replacement.range.start);

  let source = filename.to_string_lossy();
  let map = if with_map {
    let mut map = SourceMap::new(&project_root.to_string_lossy());
    let document_index = map.add_source(&source);
    map.set_source_content(document_index as usize, document)?;
    Some((map, document_index))
  } else {
    None
  };

  let document_source = match &map {
    Some((map, document_index)) => map.get_source(*document_index)?.to_string(),
    None => String::new(),
  };

  let mut splicer = Splicer {
    output: String::with_capacity(document.len()),
    generated: Location::default(),
    map: map.map(|(map, document_index)| (map, document_index, document_source.as_str())),
  };

  let mut cursor = 0;
  let mut original = Location::default();

  for replacement in &replacements {
    if replacement.range.start < cursor || replacement.range.end > document.len() {
      tracing::warn!(range = ?replacement.range, "Skipping overlapping replacement");
      continue;
    }

    let unchanged = &document[cursor..replacement.range.start];
    splicer.copy(unchanged, original);
    original.advance(unchanged);

    splicer.push(&replacement.prefix);
    splicer.insert(
      &replacement.code,
      replacement.map.as_ref(),
      replacement.inline,
    )?;
    splicer.push(&replacement.suffix);

    original.advance(&document[replacement.range.clone()]);
    cursor = replacement.range.end;
  }

  splicer.copy(&document[cursor..], original);

  Ok((splicer.output, splicer.map.map(|(map, _, _)| map)))
}

/// Composes two document maps.
///
/// `later` maps the output of a second splice back to the output of the first, which `earlier`
/// maps back to the input document `source`. Mappings into other files are kept as they are.
pub fn compose(
  later: &SourceMap,
  earlier: &mut SourceMap,
  source: &Path,
  project_root: &Path,
) -> PreprocessResult<SourceMap> {
  let mut composed = SourceMap::new(&project_root.to_string_lossy());
  let document_index = later.get_source_index(&source.to_string_lossy())?;

  for mapping in later.get_mappings() {
    let Some(original) = mapping.original else {
      continue;
    };

    let name = match original.name {
      Some(name) => Some(composed.add_name(later.get_name(name)?)),
      None => None,
    };

    let location = if Some(original.source) == document_index {
      let Some(found) = earlier.find_closest_mapping(original.original_line, original.original_column)
      else {
        continue;
      };
      let Some(earlier_original) = found.original else {
        continue;
      };

      let column = if found.generated_line == original.original_line
        && found.generated_column <= original.original_column
      {
        earlier_original.original_column + (original.original_column - found.generated_column)
      } else {
        earlier_original.original_column
      };

      OriginalLocation::new(
        earlier_original.original_line,
        column,
        copy_source(earlier, earlier_original.source, &mut composed, "")?,
        name,
      )
    } else {
      OriginalLocation::new(
        original.original_line,
        original.original_column,
        copy_source(later, original.source, &mut composed, "")?,
        name,
      )
    };

    composed.add_mapping(mapping.generated_line, mapping.generated_column, Some(location));
  }

  Ok(composed)
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use pretty_assertions::assert_eq;

  use super::*;

  fn filename() -> PathBuf {
    PathBuf::from("/app/App.svelte")
  }

  fn root() -> PathBuf {
    PathBuf::from("/app")
  }

  fn original_at(map: &mut SourceMap, line: u32, column: u32) -> Option<(String, u32, u32)> {
    let original = map.find_closest_mapping(line, column)?.original?;
    Some((
      map.get_source(original.source).ok()?.to_string(),
      original.original_line,
      original.original_column,
    ))
  }

  fn line_map(source: &str, content: &str) -> SourceMap {
    let mut map = SourceMap::new("/app");
    map.add_empty_map(source, content, 0).unwrap();
    map
  }

  #[test]
  fn splices_replacements_in_document_order() {
    let document = "<style>a</style><script>b</script>";

    let (code, map) = splice(
      document,
      &filename(),
      &root(),
      vec![
        Replacement {
          range: 24..25,
          prefix: String::new(),
          code: String::from("B"),
          suffix: String::new(),
          map: None,
          inline: None,
        },
        Replacement {
          range: 7..8,
          prefix: String::new(),
          code: String::from("A"),
          suffix: String::new(),
          map: None,
          inline: None,
        },
      ],
      false,
    )
    .unwrap();

    assert_eq!(code, "<style>A</style><script>B</script>");
    assert!(map.is_none());
  }

  #[test]
  fn skips_overlapping_replacements() {
    let replacement = |range: Range<usize>, code: &str| Replacement {
      range,
      prefix: String::new(),
      code: code.to_string(),
      suffix: String::new(),
      map: None,
      inline: None,
    };

    let (code, _) = splice(
      "abcdef",
      &filename(),
      &root(),
      vec![replacement(1..4, "X"), replacement(2..3, "Y")],
      false,
    )
    .unwrap();

    assert_eq!(code, "aXef");
  }

  #[test]
  fn maps_unchanged_text_and_inline_blocks_to_the_document() {
    let document = "<div>\n</div>\n<style>\na {}\nb {}\n</style>\n<p></p>";
    let start = document.find("<style>").unwrap() + "<style>".len();
    let end = document.find("</style>").unwrap();

    let (code, map) = splice(
      document,
      &filename(),
      &root(),
      vec![Replacement {
        range: start..end,
        prefix: String::new(),
        code: String::from("\n\na {}\nb {}\n"),
        suffix: String::new(),
        map: Some({
          let mut map = SourceMap::new("/app");
          let source = map.add_source("/app/App.svelte");
          map.add_mapping(2, 0, Some(OriginalLocation::new(1, 0, source, None)));
          map.add_mapping(3, 0, Some(OriginalLocation::new(2, 0, source, None)));
          map
        }),
        inline: Some(Location::of_offset(document, start)),
      }],
      true,
    )
    .unwrap();

    assert_eq!(code, "<div>\n</div>\n<style>\n\na {}\nb {}\n</style>\n<p></p>");

    let mut map = map.unwrap();
    assert_eq!(
      original_at(&mut map, 1, 0),
      Some((String::from("App.svelte"), 1, 0))
    );
    assert_eq!(
      original_at(&mut map, 4, 0),
      Some((String::from("App.svelte"), 3, 0))
    );
    assert_eq!(
      original_at(&mut map, 5, 0),
      Some((String::from("App.svelte"), 4, 0))
    );
    assert_eq!(
      original_at(&mut map, 7, 0),
      Some((String::from("App.svelte"), 6, 0))
    );
    assert_eq!(map.get_sources_content()[0], document);
  }

  #[test]
  fn keeps_mappings_into_loaded_files() {
    let document = "<style src=\"./a.css\"></style>";
    let start = document.find('>').unwrap() + 1;

    let (_, map) = splice(
      document,
      &filename(),
      &root(),
      vec![Replacement {
        range: start..start,
        prefix: String::new(),
        code: String::from("a {}"),
        suffix: String::new(),
        map: Some(line_map("/app/a.css", "a {}")),
        inline: None,
      }],
      true,
    )
    .unwrap();

    let mut map = map.unwrap();
    assert_eq!(
      original_at(&mut map, 0, start as u32),
      Some((String::from("a.css"), 0, 0))
    );
    assert_eq!(map.get_source_content(1).unwrap(), "a {}");
  }

  #[test]
  fn composes_through_the_markup_map() {
    // Input: "<template>\n<div/>\n</template>\n<style>a {}</style>"
    // After the markup splice the style moved up two lines
    let mut earlier = SourceMap::new("/app");
    let document = earlier.add_source("/app/App.svelte");
    earlier.add_mapping(0, 0, Some(OriginalLocation::new(1, 0, document, None)));
    earlier.add_mapping(1, 0, Some(OriginalLocation::new(2, 11, document, None)));
    earlier.add_mapping(2, 0, Some(OriginalLocation::new(3, 0, document, None)));

    let mut later = SourceMap::new("/app");
    let document = later.add_source("/app/App.svelte");
    later.add_mapping(2, 7, Some(OriginalLocation::new(2, 7, document, None)));
    let loaded = later.add_source("/app/b.css");
    later.add_mapping(3, 0, Some(OriginalLocation::new(5, 1, loaded, None)));

    let mut composed = compose(&later, &mut earlier, &filename(), &root()).unwrap();

    assert_eq!(
      original_at(&mut composed, 2, 7),
      Some((String::from("App.svelte"), 3, 7))
    );
    assert_eq!(
      original_at(&mut composed, 3, 0),
      Some((String::from("b.css"), 5, 1))
    );
  }
}
