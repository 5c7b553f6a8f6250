use crate::ast::{AtRule, Comment, Declaration, Node, Position, Root, Rule};
use crate::css_syntax_error::CssSyntaxError;

/// Parses a stylesheet into a lossless tree
pub fn parse(css: &str) -> Result<Root, CssSyntaxError> {
  let mut parser = Parser::new(css);
  let (nodes, after) = parser.nodes(None)?;
  Ok(Root { nodes, after })
}

enum Terminator {
  OpenCurly,
  Semicolon,
  CloseCurly,
  Eof,
}

struct Parser<'a> {
  css: &'a str,
  bytes: &'a [u8],
  pos: usize,
  line_starts: Vec<usize>,
}

impl<'a> Parser<'a> {
  fn new(css: &'a str) -> Self {
    let line_starts = std::iter::once(0)
      .chain(css.match_indices('\n').map(|(index, _)| index + 1))
      .collect();

    Parser {
      css,
      bytes: css.as_bytes(),
      pos: 0,
      line_starts,
    }
  }

  fn position(&self, offset: usize) -> Position {
    let line = self
      .line_starts
      .partition_point(|start| *start <= offset)
      .saturating_sub(1);
    let line_start = self.line_starts[line];
    let column = self.css[line_start..offset].encode_utf16().count();
    Position::new(line as u32, column as u32, offset)
  }

  fn error(&self, reason: &str, offset: usize) -> CssSyntaxError {
    CssSyntaxError::new(reason, self.position(offset))
  }

  /// Parses the contents of a block opened at `opened_at`, or of the root when `None`
  fn nodes(&mut self, opened_at: Option<usize>) -> Result<(Vec<Node>, String), CssSyntaxError> {
    let mut nodes = Vec::new();

    loop {
      let before_start = self.pos;
      while self.pos < self.bytes.len()
        && (self.bytes[self.pos].is_ascii_whitespace() || self.bytes[self.pos] == b';')
      {
        self.pos += 1;
      }
      let before = self.css[before_start..self.pos].to_string();

      let Some(byte) = self.bytes.get(self.pos) else {
        return match opened_at {
          Some(offset) => Err(self.error("Unclosed block", offset)),
          None => Ok((nodes, before)),
        };
      };

      match byte {
        b'}' => {
          return match opened_at {
            Some(_) => {
              self.pos += 1;
              Ok((nodes, before))
            }
            None => Err(self.error("Unexpected }", self.pos)),
          };
        }
        b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
          let start = self.pos;
          self.pos = self.comment_end(start)?;
          nodes.push(Node::Comment(Comment {
            before,
            text: self.css[start..self.pos].to_string(),
            start: self.position(start),
          }));
        }
        _ => {
          let node = self.statement(before)?;
          nodes.push(node);
        }
      }
    }
  }

  fn statement(&mut self, before: String) -> Result<Node, CssSyntaxError> {
    let start = self.pos;
    let (end, terminator) = self.scan_statement(start)?;
    let raw = &self.css[start..end];
    let text = raw.trim_end();
    let trailing = &raw[text.len()..];
    let is_at_rule = text.starts_with('@');
    let position = self.position(start);

    let node = match terminator {
      Terminator::OpenCurly => {
        self.pos = end + 1;
        let (nodes, after) = self.nodes(Some(start))?;

        if is_at_rule {
          Node::AtRule(AtRule {
            before,
            prelude: text.to_string(),
            between: trailing.to_string(),
            nodes: Some(nodes),
            after,
            start: position,
          })
        } else {
          Node::Rule(Rule {
            before,
            selector: text.to_string(),
            between: trailing.to_string(),
            nodes,
            after,
            start: position,
          })
        }
      }
      Terminator::Semicolon => {
        self.pos = end + 1;
        let between = format!("{trailing};");
        statement_node(is_at_rule, before, text, between, position)
      }
      Terminator::CloseCurly | Terminator::Eof => {
        // Trailing whitespace belongs to the enclosing block
        self.pos = start + text.len();
        statement_node(is_at_rule, before, text, String::new(), position)
      }
    };

    Ok(node)
  }

  /// Finds where the statement starting at `start` ends
  fn scan_statement(&self, start: usize) -> Result<(usize, Terminator), CssSyntaxError> {
    let mut pos = start;
    let mut depth = 0u32;

    while let Some(byte) = self.bytes.get(pos) {
      match byte {
        b'\\' => pos += 1,
        b'"' | b'\'' => pos = self.string_end(pos)? - 1,
        b'/' if self.bytes.get(pos + 1) == Some(&b'*') => pos = self.comment_end(pos)? - 1,
        b'(' | b'[' => depth += 1,
        b')' | b']' => depth = depth.saturating_sub(1),
        b'{' if depth == 0 => return Ok((pos, Terminator::OpenCurly)),
        b';' if depth == 0 => return Ok((pos, Terminator::Semicolon)),
        b'}' => return Ok((pos, Terminator::CloseCurly)),
        _ => {}
      }
      pos += 1;
    }

    Ok((self.bytes.len(), Terminator::Eof))
  }

  /// Offset just after the comment starting at `start`
  fn comment_end(&self, start: usize) -> Result<usize, CssSyntaxError> {
    self.css[start + 2..]
      .find("*/")
      .map(|index| start + 2 + index + 2)
      .ok_or_else(|| self.error("Unclosed comment", start))
  }

  /// Offset just after the quoted string starting at `start`
  fn string_end(&self, start: usize) -> Result<usize, CssSyntaxError> {
    let quote = self.bytes[start];
    let mut pos = start + 1;

    while let Some(byte) = self.bytes.get(pos) {
      match byte {
        b'\\' => pos += 1,
        byte if *byte == quote => return Ok(pos + 1),
        _ => {}
      }
      pos += 1;
    }

    Err(self.error("Unclosed string", start))
  }
}

fn statement_node(
  is_at_rule: bool,
  before: String,
  text: &str,
  between: String,
  start: Position,
) -> Node {
  if is_at_rule {
    Node::AtRule(AtRule {
      before,
      prelude: text.to_string(),
      between,
      nodes: None,
      after: String::new(),
      start,
    })
  } else {
    Node::Declaration(Declaration {
      before,
      text: text.to_string(),
      between,
      start,
    })
  }
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::stringifier::stringify;

  #[test]
  fn parses_rules_and_declarations() {
    let root = parse("div { color: red; background: blue }").unwrap();

    let Node::Rule(rule) = &root.nodes[0] else {
      panic!("expected a rule, got {:?}", root.nodes[0]);
    };

    assert_eq!(rule.selector, "div");
    assert_eq!(rule.between, " ");
    assert_eq!(rule.after, " ");
    assert_eq!(rule.nodes.len(), 2);

    let Node::Declaration(declaration) = &rule.nodes[1] else {
      panic!("expected a declaration, got {:?}", rule.nodes[1]);
    };
    assert_eq!(declaration.text, "background: blue");
    assert_eq!(declaration.between, "");
  }

  #[test]
  fn parses_at_rules() {
    let root = parse("@import 'a.css';\n@media print { a { color: red } }").unwrap();

    let Node::AtRule(import) = &root.nodes[0] else {
      panic!("expected an at-rule");
    };
    assert_eq!(import.prelude, "@import 'a.css'");
    assert!(import.nodes.is_none());

    let Node::AtRule(media) = &root.nodes[1] else {
      panic!("expected an at-rule");
    };
    assert_eq!(media.prelude, "@media print");
    assert_eq!(media.before, "\n");
    assert_eq!(media.nodes.as_ref().map(Vec::len), Some(1));
  }

  #[test]
  fn records_node_positions() {
    let root = parse("a {}\n  /* c */\n  b {\n    color: red;\n  }").unwrap();

    assert_eq!(root.nodes[0].start(), Position::new(0, 0, 0));
    assert_eq!(root.nodes[1].start(), Position::new(1, 2, 7));
    assert_eq!(root.nodes[2].start(), Position::new(2, 2, 17));

    let Node::Rule(rule) = &root.nodes[2] else {
      panic!("expected a rule");
    };
    assert_eq!(rule.nodes[0].start(), Position::new(3, 4, 25));
  }

  #[test]
  fn keeps_braces_and_semicolons_inside_strings_and_parens() {
    let css = r#"a[title="{;}"] { background: url(data:image/png;base64,AA); content: "}" }"#;
    let root = parse(css).unwrap();

    let Node::Rule(rule) = &root.nodes[0] else {
      panic!("expected a rule");
    };
    assert_eq!(rule.selector, r#"a[title="{;}"]"#);
    assert_eq!(rule.nodes.len(), 2);
  }

  #[test]
  fn prints_unchanged_input_identically() {
    let css = indoc! {r#"
      @charset "utf-8";
      /* header */
      :global(body) ,  .a{
        margin : 0 ;;
        /* inner */
        padding:0
      }

      @media (min-width: 10px) {
        .b > .c { color: red }
      }
      @font-face{font-family:x}
    "#};

    assert_eq!(stringify(&parse(css).unwrap()), css);
  }

  #[test]
  fn reports_unclosed_blocks() {
    let error = parse("a {\n  color: red;").unwrap_err();

    assert_eq!(error.reason, "Unclosed block");
    assert_eq!(error.position, Position::new(0, 0, 0));
    assert_eq!(error.to_string(), "CssSyntaxError: Unclosed block (1:1)");
  }

  #[test]
  fn reports_unexpected_closing_braces() {
    let error = parse("a {}\n}").unwrap_err();

    assert_eq!(error.reason, "Unexpected }");
    assert_eq!(error.position, Position::new(1, 0, 5));
  }

  #[test]
  fn reports_unclosed_comments_and_strings() {
    assert_eq!(parse("/* a").unwrap_err().reason, "Unclosed comment");
    assert_eq!(
      parse("a { content: \"x }").unwrap_err().reason,
      "Unclosed string"
    );
  }
}
