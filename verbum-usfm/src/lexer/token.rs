//! Lexer token types

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Key-value payload after the `|` of a word or milestone.
///
/// Keys are kept as written; lookups ignore the `x-` prefix so that
/// `x-strong` and `strong` resolve the same.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Attributes<'a> {
    /// Parse `key="value" key2="value2"`. A payload with no `=` is the
    /// default attribute, which for `\w` is `lemma`.
    pub fn parse(payload: &'a str) -> Self {
        let payload = payload.trim();
        let payload = payload.strip_prefix('|').unwrap_or(payload).trim();
        if payload.is_empty() {
            return Self::default();
        }
        if !payload.contains('=') {
            return Self {
                pairs: vec![("lemma", payload)],
            };
        }

        let bytes = payload.as_bytes();
        let mut pairs = Vec::new();
        let mut i = 0;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let key_start = i;
            while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let key = &payload[key_start..i];
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if key.is_empty() || i >= bytes.len() || bytes[i] != b'=' {
                break;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let value = if i < bytes.len() && bytes[i] == b'"' {
                let value_start = i + 1;
                match payload[value_start..].find('"') {
                    Some(len) => {
                        i = value_start + len + 1;
                        &payload[value_start..value_start + len]
                    }
                    None => {
                        i = bytes.len();
                        &payload[value_start..]
                    }
                }
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &payload[value_start..i]
            };
            pairs.push((key, value));
        }

        Self { pairs }
    }

    /// Value for `name`, matching `name` or `x-name`.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|&&(key, _)| key.strip_prefix("x-").unwrap_or(key) == name)
            .map(|&(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.pairs.iter().copied()
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// Structural role of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// `\c N`
    Chapter,
    /// `\v N` or `\v N-M`
    Verse,
    /// `\zaln-s |...\*`
    AlignStart,
    /// `\zaln-e\*`
    AlignEnd,
    /// `\w`
    WordStart,
    /// `\w*`
    WordEnd,
    /// `\f`, `\fe`, `\x`
    NoteStart,
    /// `\f*`, `\fe*`, `\x*`
    NoteEnd,
    /// Identification, title and section lines; the rest of the line is
    /// the argument and never scripture text.
    Heading,
    /// Any other `-s`/`-e` milestone such as `\k-s` or `\ts\*`.
    Milestone,
    /// Paragraph, poetry and character markers.
    Other,
}

/// A recognised backslash marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    pub kind: MarkerKind,
    /// Name without the backslash, `+` or trailing `*`.
    pub name: &'a str,
    pub closing: bool,
    /// Chapter or verse number text, or the heading line.
    pub argument: &'a str,
    pub attributes: Attributes<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Marker(Marker<'a>),
    /// Rendered text inside `\w ... \w*`.
    Word {
        text: &'a str,
        attributes: Attributes<'a>,
    },
    PlainText,
}

/// Byte span into the decoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

/// A token stamped with the chapter and verse in effect where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub raw: &'a str,
    pub chapter: u32,
    pub verse: u32,
    /// Last verse of a bridge such as `\v 16-18`.
    pub verse_end: Option<u32>,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Text this token contributes to rendered output.
    pub fn text(&self) -> &'a str {
        match &self.kind {
            TokenKind::Word { text, .. } => *text,
            TokenKind::PlainText => self.raw,
            TokenKind::Marker(_) => "",
        }
    }

    pub fn marker_kind(&self) -> Option<MarkerKind> {
        match &self.kind {
            TokenKind::Marker(marker) => Some(marker.kind),
            _ => None,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Word { .. })
    }
}
