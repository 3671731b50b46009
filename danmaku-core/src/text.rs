//! Markup escaping for comment bodies

/// Entities recognized when turning wire content back into literal text
const ENTITIES: [(&str, char); 5] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

/// Escapes text the way an element's inner markup serializes it (`&`, `<`, `>`)
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replaces the five standard entities with their characters in a single pass.
///
/// Unknown entities and bare ampersands are kept as written.
pub fn unescape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Converts wire content into script text.
///
/// Braces would open override blocks in the script, so they become their
/// fullwidth forms; markup entities become literal characters.
pub fn to_script_text(content: &str) -> String {
    unescape_markup(&content.replace('{', "｛").replace('}', "｝"))
}
