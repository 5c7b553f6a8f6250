use crate::list;

/// Zero-based location in the parsed input. Columns count UTF-16 code units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
  pub line: u32,
  pub column: u32,
  /// Byte offset
  pub offset: usize,
}

impl Position {
  pub fn new(line: u32, column: u32, offset: usize) -> Self {
    Position {
      line,
      column,
      offset,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Root {
  pub nodes: Vec<Node>,
  /// Whitespace and stray semicolons after the last node
  pub after: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
  Rule(Rule),
  AtRule(AtRule),
  Declaration(Declaration),
  Comment(Comment),
}

impl Node {
  pub fn start(&self) -> Position {
    match self {
      Node::Rule(rule) => rule.start,
      Node::AtRule(at_rule) => at_rule.start,
      Node::Declaration(declaration) => declaration.start,
      Node::Comment(comment) => comment.start,
    }
  }

  pub fn before(&self) -> &str {
    match self {
      Node::Rule(rule) => &rule.before,
      Node::AtRule(at_rule) => &at_rule.before,
      Node::Declaration(declaration) => &declaration.before,
      Node::Comment(comment) => &comment.before,
    }
  }
}

/// `selector { ... }`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rule {
  pub before: String,
  pub selector: String,
  /// Whitespace between the selector and `{`
  pub between: String,
  pub nodes: Vec<Node>,
  /// Whitespace before the closing `}`
  pub after: String,
  pub start: Position,
}

impl Rule {
  pub fn new(selector: impl Into<String>) -> Self {
    Rule {
      selector: selector.into(),
      between: String::from(" "),
      ..Rule::default()
    }
  }

  /// The comma separated selectors of this rule, trimmed
  pub fn selectors(&self) -> Vec<String> {
    list::comma(&self.selector)
  }

  /// Replaces the selector list, joining with the separator the original selector used
  pub fn set_selectors(&mut self, selectors: &[String]) {
    let separator = list::comma_separator(&self.selector).unwrap_or(", ");
    self.selector = selectors.join(separator);
  }
}

/// `@name prelude { ... }` or `@name prelude;`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtRule {
  pub before: String,
  /// Everything from `@` up to the block or terminator, e.g. `@media (min-width: 10px)`
  pub prelude: String,
  /// Whitespace after the prelude, including `;` for statements without a block
  pub between: String,
  pub nodes: Option<Vec<Node>>,
  pub after: String,
  pub start: Position,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Declaration {
  pub before: String,
  /// Raw `prop: value` text
  pub text: String,
  /// Whitespace and `;` after the value
  pub between: String,
  pub start: Position,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comment {
  pub before: String,
  /// The comment including its `/*` and `*/` delimiters
  pub text: String,
  pub start: Position,
}

impl Root {
  /// Visits every rule, depth first, keeping the ones `retain` returns `true` for.
  ///
  /// Children of a removed rule are not visited. The first error stops the walk.
  pub fn try_retain_rules<E, F>(&mut self, mut retain: F) -> Result<(), E>
  where
    F: FnMut(&mut Rule) -> Result<bool, E>,
  {
    retain_rules(&mut self.nodes, &mut retain)
  }
}

fn retain_rules<E, F>(nodes: &mut Vec<Node>, retain: &mut F) -> Result<(), E>
where
  F: FnMut(&mut Rule) -> Result<bool, E>,
{
  let mut index = 0;
  while index < nodes.len() {
    let keep = match &mut nodes[index] {
      Node::Rule(rule) => {
        if retain(rule)? {
          retain_rules(&mut rule.nodes, retain)?;
          true
        } else {
          false
        }
      }
      Node::AtRule(AtRule {
        nodes: Some(children),
        ..
      }) => {
        retain_rules(children, retain)?;
        true
      }
      _ => true,
    };

    if keep {
      index += 1;
    } else {
      nodes.remove(index);
    }
  }

  Ok(())
}
