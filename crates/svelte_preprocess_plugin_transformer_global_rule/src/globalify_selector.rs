use std::sync::LazyLock;

use regex::Regex;

static LOCAL_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r":local\((.+?)\)").expect("local selector regex should compile"));

/// Wraps every compound selector in `:global(...)` so the scoping compiler leaves it alone.
///
/// Combinators are kept as written and compounds already wrapped in `:global(...)` are left
/// untouched. Applying it twice gives the same result, except for `:local(x)` compounds:
/// they are unwrapped to a scoped `x`, which a second pass would then globalize.
pub fn globalify_selector(selector: &str) -> String {
  let selector = selector.trim();
  let mut output = String::with_capacity(selector.len() + 16);
  let mut compound_start = 0;
  let mut depth = 0u32;
  let mut escaped = false;
  let mut chars = selector.char_indices().peekable();

  while let Some((index, ch)) = chars.next() {
    if escaped {
      escaped = false;
      continue;
    }

    match ch {
      '\\' => escaped = true,
      '(' | '[' => depth += 1,
      ')' | ']' => depth = depth.saturating_sub(1),
      ' ' | '>' | '+' | '~' | ',' if depth == 0 => {
        output.push_str(&globalify_compound(&selector[compound_start..index]));

        let mut end = index + ch.len_utf8();
        while let Some((next_index, next)) = chars.peek() {
          if !(next.is_whitespace() || matches!(next, '>' | '+' | '~' | ',')) {
            break;
          }
          end = next_index + next.len_utf8();
          chars.next();
        }

        output.push_str(&selector[index..end]);
        compound_start = end;
      }
      _ => {}
    }
  }

  output.push_str(&globalify_compound(&selector[compound_start..]));
  output
}

fn globalify_compound(compound: &str) -> String {
  if compound.is_empty() || compound.starts_with(":global") {
    compound.to_string()
  } else if compound.starts_with(":local") {
    LOCAL_PATTERN.replace_all(compound, "$1").into_owned()
  } else {
    format!(":global({compound})")
  }
}
