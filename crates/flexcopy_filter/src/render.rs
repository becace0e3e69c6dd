//! Intermediate expression fragments and their rendering to regex source.

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Bracket glyph that opened a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumBracket {
    Round,
    Curly,
    Square,
}

impl EnumBracket {
    pub(crate) fn from_open(c: char) -> Option<Self> {
        match c {
            '(' => Some(Self::Round),
            '{' => Some(Self::Curly),
            '[' => Some(Self::Square),
            _ => None,
        }
    }

    pub(crate) fn from_close(c: char) -> Option<Self> {
        match c {
            ')' => Some(Self::Round),
            '}' => Some(Self::Curly),
            ']' => Some(Self::Square),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Round => 0,
            Self::Curly => 1,
            Self::Square => 2,
        }
    }
}

/// Character in front of a bracket that turns it into a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumGroupPrefix {
    /// `!`
    Negative,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
    /// `@`
    ExactlyOne,
    /// `$`
    ExactlyOneAlt,
    /// `*`
    ZeroOrMore,
}

impl EnumGroupPrefix {
    pub(crate) fn from_char(c: char) -> Option<Self> {
        match c {
            '!' => Some(Self::Negative),
            '+' => Some(Self::OneOrMore),
            '?' => Some(Self::ZeroOrOne),
            '@' => Some(Self::ExactlyOne),
            '$' => Some(Self::ExactlyOneAlt),
            '*' => Some(Self::ZeroOrMore),
            _ => None,
        }
    }

    fn quantifier(self) -> &'static str {
        match self {
            Self::OneOrMore => "+",
            Self::ZeroOrOne => "?",
            Self::ZeroOrMore => "*",
            Self::Negative | Self::ExactlyOne | Self::ExactlyOneAlt => "",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Fragments

/// One piece of a segment's expression, rendered only at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    /// A character matched literally; escaped on render.
    Literal(char),
    /// Regex text copied through untouched.
    Raw(String),
    /// Any run of characters inside one path component.
    AnyComponent,
    /// Any run of characters across components.
    AnyDepth,
    /// The path separator.
    Separator,
    /// A bracketed group with verbatim content.
    Group {
        bracket: EnumBracket,
        prefix: Option<EnumGroupPrefix>,
        if_doubled: bool,
        content: String,
    },
}

impl Fragment {
    /// `true` when a regex quantifier directly after this fragment would be rejected.
    pub(crate) fn ends_quantified(&self) -> bool {
        match self {
            Self::AnyComponent | Self::AnyDepth => true,
            Self::Raw(c_raw) => c_raw.ends_with(['+', '?', '*']) && !c_raw.ends_with("\\+"),
            Self::Group { prefix, .. } => prefix.is_some_and(|p| !p.quantifier().is_empty()),
            Self::Literal(_) | Self::Separator => false,
        }
    }
}

const CHARS_REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Separator as it appears in expression source: always backslash-escaped.
pub(crate) fn render_separator(separator: char) -> String {
    format!("\\{separator}")
}

fn push_literal(c_out: &mut String, c: char, separator: char) {
    if c == separator || CHARS_REGEX_META.contains(&c) {
        c_out.push('\\');
    }
    c_out.push(c);
}

/// Escape a plain string (separators included) so it matches itself.
pub fn escape_literal_str(value: &str, separator: char) -> String {
    let mut c_out = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        push_literal(&mut c_out, c, separator);
    }
    c_out
}

pub(crate) fn render_fragments(l_fragments: &[Fragment], separator: char) -> String {
    let c_sep = render_separator(separator);
    let mut c_out = String::new();
    for fragment in l_fragments {
        match fragment {
            Fragment::Literal(c) => push_literal(&mut c_out, *c, separator),
            Fragment::Raw(c_raw) => c_out.push_str(c_raw),
            Fragment::AnyComponent => {
                c_out.push_str("[^");
                c_out.push_str(&c_sep);
                c_out.push_str("]*");
            }
            Fragment::AnyDepth => c_out.push_str(".*"),
            Fragment::Separator => c_out.push_str(&c_sep),
            Fragment::Group {
                bracket,
                prefix,
                if_doubled,
                content,
            } => {
                let b_negative = !*if_doubled && *prefix == Some(EnumGroupPrefix::Negative);
                let (c_open, c_close) = match (bracket, b_negative) {
                    (EnumBracket::Square, false) => ("[", "]"),
                    (EnumBracket::Square, true) => ("[^", "]"),
                    (_, false) => ("(", ")"),
                    (_, true) => ("(?!", ")"),
                };
                c_out.push_str(c_open);
                c_out.push_str(content);
                c_out.push_str(c_close);
                if let Some(prefix) = prefix {
                    c_out.push_str(prefix.quantifier());
                }
            }
        }
    }
    c_out
}

/// Turn a rendered extension fragment back into one concrete string it matches.
///
/// Only understands what the scanner emits for extensions: escaped
/// characters, `[^sep]*` classes and `\**` runs.
pub(crate) fn representative_of(expression: &str) -> String {
    let l_chars: Vec<char> = expression.chars().collect();
    let mut c_out = String::new();
    let mut i = 0;
    while i < l_chars.len() {
        match l_chars[i] {
            '\\' if i + 1 < l_chars.len() => {
                c_out.push(l_chars[i + 1]);
                i += 2;
                if i < l_chars.len() && l_chars[i] == '*' {
                    i += 1;
                }
            }
            '[' => {
                while i < l_chars.len() && l_chars[i] != ']' {
                    i += 1;
                }
                i += 1;
                if i < l_chars.len() && l_chars[i] == '*' {
                    i += 1;
                }
                c_out.push('a');
            }
            c => {
                c_out.push(c);
                i += 1;
            }
        }
    }
    c_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
