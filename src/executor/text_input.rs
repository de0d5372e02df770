// Literal text escaping for keystroke-script injection.
// Control tokens are wrapped in braces (`+` -> `{+}`) so they are typed, not interpreted.

/// Characters that carry meaning in keystroke syntax, with their literal form.
pub const ESCAPE_TABLE: [(char, &str); 10] = [
    ('+', "{+}"),
    ('^', "{^}"),
    ('%', "{%}"),
    ('~', "{~}"),
    ('(', "{(}"),
    (')', "{)}"),
    ('[', "{[}"),
    (']', "{]}"),
    ('{', "{{}"),
    ('}', "{}}"),
];

fn escaped_form(c: char) -> Option<&'static str> {
    ESCAPE_TABLE.iter().find(|(ch, _)| *ch == c).map(|(_, form)| *form)
}

/// Wraps every control character in its literal-escape form.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escaped_form(c) {
            Some(form) => out.push_str(form),
            None => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_literal`]. A `{c}` group becomes `c`; anything else
/// passes through unchanged.
pub fn unescape_literal(escaped: &str) -> String {
    let chars: Vec<char> = escaped.chars().collect();
    let mut out = String::with_capacity(escaped.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' && i + 2 < chars.len() && chars[i + 2] == '}' {
            out.push(chars[i + 1]);
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Text ready for injection, held in escaped form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystrokeText {
    escaped: String,
}

impl KeystrokeText {
    pub fn new(text: &str) -> Self {
        Self {
            escaped: escape_literal(text),
        }
    }

    /// Exact characters to type, for backends that inject literal text.
    pub fn to_literal(&self) -> String {
        unescape_literal(&self.escaped)
    }
}
