//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Values are inserted once, so `{...}` inside a value is left alone.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  'outer: while let Some(open) = rest.find('{') {
    for (k, v) in pairs {
      let needle = format!("{{{}}}", k);
      if rest[open..].starts_with(&needle) {
        out.push_str(&rest[..open]);
        out.push_str(v);
        rest = &rest[open + needle.len()..];
        continue 'outer;
      }
    }
    out.push_str(&rest[..=open]);
    rest = &rest[open + 1..];
  }
  out.push_str(rest);
  out
}

/// Cut the outermost `{ ... }` out of a model reply.
/// Models sometimes wrap JSON in prose or a Markdown fence even when asked not to.
pub fn extract_json_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_keys_once() {
    let out = fill_template("code:\n{code}\nend {other}", &[("code", "d = {code}")]);
    assert_eq!(out, "code:\nd = {code}\nend {other}");
  }

  #[test]
  fn extract_json_object_strips_fences_and_prose() {
    let reply = "Sure!\n```json\n{\"score\": 1}\n```";
    assert_eq!(extract_json_object(reply), Some("{\"score\": 1}"));
    assert_eq!(extract_json_object("no json here"), None);
    assert_eq!(extract_json_object("} {"), None);
  }
}
