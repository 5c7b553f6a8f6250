//! Splitting of comma and space separated lists that keeps quoted strings, escaped
//! characters and parenthesised groups intact.

/// Splits on commas, keeping a trailing empty item
pub fn comma(string: &str) -> Vec<String> {
  split(string, &[','], true)
}

/// Splits `string` on any of `separators` outside quotes and parentheses.
///
/// Items are trimmed. When `last` is true the final item is added even if it is empty.
fn split(string: &str, separators: &[char], last: bool) -> Vec<String> {
  let mut items = Vec::new();
  let mut current = String::new();
  let mut scanner = Scanner::default();

  for ch in string.chars() {
    if scanner.is_separator(ch, separators) {
      if !current.is_empty() {
        items.push(current.trim().to_string());
      }
      current.clear();
    } else {
      current.push(ch);
    }
  }

  if last || !current.is_empty() {
    items.push(current.trim().to_string());
  }

  items
}

/// The first top-level comma of `string` together with the whitespace after it
pub fn comma_separator(string: &str) -> Option<&str> {
  let mut scanner = Scanner::default();
  let (start, _) = string
    .char_indices()
    .find(|(_, ch)| scanner.is_separator(*ch, &[',']))?;

  let rest = &string[start + 1..];
  let whitespace = rest.len() - rest.trim_start().len();
  Some(&string[start..start + 1 + whitespace])
}

#[derive(Default)]
struct Scanner {
  depth: u32,
  quote: Option<char>,
  escape: bool,
}

impl Scanner {
  fn is_separator(&mut self, ch: char, separators: &[char]) -> bool {
    if self.escape {
      self.escape = false;
    } else if ch == '\\' {
      self.escape = true;
    } else if let Some(quote) = self.quote {
      if ch == quote {
        self.quote = None;
      }
    } else if ch == '"' || ch == '\'' {
      self.quote = Some(ch);
    } else if ch == '(' {
      self.depth = self.depth.saturating_add(1);
    } else if ch == ')' {
      self.depth = self.depth.saturating_sub(1);
    } else if self.depth == 0 && separators.contains(&ch) {
      return true;
    }

    false
  }
}
