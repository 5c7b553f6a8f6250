use parcel_sourcemap::{OriginalLocation, SourceMap, SourceMapError};

use crate::ast::{Node, Position, Root};

/// Prints the tree back to CSS
pub fn stringify(root: &Root) -> String {
  let mut printer = Printer::default();
  printer.root(root);
  printer.output
}

/// Prints the tree and maps the start of every node to where it was parsed from.
///
/// `source` names the parsed input and `content` is embedded as its source content.
pub fn stringify_with_map(
  root: &Root,
  source: &str,
  content: &str,
  project_root: &str,
) -> Result<(String, SourceMap), SourceMapError> {
  let mut map = SourceMap::new(project_root);
  let source_index = map.add_source(source);
  map.set_source_content(source_index as usize, content)?;

  let mut printer = Printer {
    map: Some((map, source_index)),
    ..Printer::default()
  };
  printer.root(root);

  let output = printer.output;
  let map = printer
    .map
    .map(|(map, _)| map)
    .unwrap_or_else(|| SourceMap::new(project_root));
  Ok((output, map))
}

#[derive(Default)]
struct Printer {
  output: String,
  line: u32,
  column: u32,
  map: Option<(SourceMap, u32)>,
}

impl Printer {
  fn root(&mut self, root: &Root) {
    self.nodes(&root.nodes);
    self.push(&root.after);
  }

  fn nodes(&mut self, nodes: &[Node]) {
    for node in nodes {
      self.push(node.before());
      self.mark(node.start());

      match node {
        Node::Rule(rule) => {
          self.push(&rule.selector);
          self.push(&rule.between);
          self.push("{");
          self.nodes(&rule.nodes);
          self.push(&rule.after);
          self.push("}");
        }
        Node::AtRule(at_rule) => {
          self.push(&at_rule.prelude);
          self.push(&at_rule.between);
          if let Some(children) = &at_rule.nodes {
            self.push("{");
            self.nodes(children);
            self.push(&at_rule.after);
            self.push("}");
          }
        }
        Node::Declaration(declaration) => {
          self.push_mapped(&declaration.text, declaration.start);
          self.push(&declaration.between);
        }
        Node::Comment(comment) => self.push_mapped(&comment.text, comment.start),
      }
    }
  }

  fn mark(&mut self, original: Position) {
    if let Some((map, source_index)) = &mut self.map {
      map.add_mapping(
        self.line,
        self.column,
        Some(OriginalLocation::new(
          original.line,
          original.column,
          *source_index,
          None,
        )),
      );
    }
  }

  /// Pushes raw text that was copied verbatim from the input, mapping each of its lines
  fn push_mapped(&mut self, text: &str, start: Position) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
      self.push(first);
    }

    for (index, line) in lines.enumerate() {
      self.push("\n");
      self.mark(Position::new(start.line + index as u32 + 1, 0, 0));
      self.push(line);
    }
  }

  fn push(&mut self, text: &str) {
    for (index, line) in text.split('\n').enumerate() {
      if index > 0 {
        self.line += 1;
        self.column = 0;
      }
      self.column += line.encode_utf16().count() as u32;
    }
    self.output.push_str(text);
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::ast::Rule;
  use crate::parse::parse;

  #[test]
  fn prints_edited_selectors() {
    let mut root = parse("a, b { color: red }\n.c{}").unwrap();

    root
      .try_retain_rules::<(), _>(|rule: &mut Rule| {
        let selectors = rule
          .selectors()
          .into_iter()
          .map(|selector| format!("{selector}.x"))
          .collect::<Vec<_>>();
        rule.set_selectors(&selectors);
        Ok(true)
      })
      .unwrap();

    assert_eq!(stringify(&root), "a.x, b.x { color: red }\n.c.x{}");
  }

  #[test]
  fn prints_without_removed_rules() {
    let mut root = parse("a {}\nb {}\nc {}").unwrap();

    root
      .try_retain_rules::<(), _>(|rule| Ok(rule.selector != "b"))
      .unwrap();

    assert_eq!(stringify(&root), "a {}\nc {}");
  }

  #[test]
  fn maps_nodes_to_their_original_position() {
    let mut root = parse("a, b {}\n.long-selector {\n  color: red;\n}").unwrap();

    root
      .try_retain_rules::<(), _>(|rule| {
        if rule.selector == "a, b" {
          return Ok(false);
        }
        rule.selector = String::from(".s");
        Ok(true)
      })
      .unwrap();

    let (css, mut map) = stringify_with_map(&root, "/src/App.svelte", "", "/src").unwrap();

    assert_eq!(css, "\n.s {\n  color: red;\n}");

    let rule = map.find_closest_mapping(1, 0).unwrap().original.unwrap();
    assert_eq!((rule.original_line, rule.original_column), (1, 0));

    let declaration = map.find_closest_mapping(2, 2).unwrap().original.unwrap();
    assert_eq!(
      (declaration.original_line, declaration.original_column),
      (2, 2)
    );
    assert_eq!(map.get_source(0).unwrap(), "App.svelte");
  }
}
