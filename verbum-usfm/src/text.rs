//! Scripture text assembly

use crate::lexer::{MarkerKind, Token, TokenKind};

/// Rebuilds readable verse text from a token stream.
///
/// Markers never reach the output. Footnote and cross-reference bodies are
/// dropped, as is anything before the first verse of a chapter. Whitespace
/// runs collapse to a single space.
#[derive(Debug, Clone)]
pub struct TextAssembler {
    include_verse_numbers: bool,
    note_depth: usize,
    pending_space: bool,
    out: String,
}

impl TextAssembler {
    pub fn new(include_verse_numbers: bool) -> Self {
        Self {
            include_verse_numbers,
            note_depth: 0,
            pending_space: false,
            out: String::new(),
        }
    }

    pub fn push(&mut self, token: &Token<'_>) {
        match &token.kind {
            TokenKind::Marker(marker) => match marker.kind {
                MarkerKind::NoteStart => self.note_depth += 1,
                MarkerKind::NoteEnd => self.note_depth = self.note_depth.saturating_sub(1),
                MarkerKind::Verse if self.include_verse_numbers && token.verse > 0 => {
                    let label = match token.verse_end {
                        Some(end) => format!("{}-{}", token.verse, end),
                        None => token.verse.to_string(),
                    };
                    self.write(&label);
                    self.pending_space = true;
                }
                _ => {}
            },
            TokenKind::Word { .. } | TokenKind::PlainText => {
                if self.note_depth == 0 && token.verse > 0 {
                    self.write(token.text());
                }
            }
        }
    }

    fn write(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.out.is_empty() {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push(c);
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Assemble display text for a token sequence.
pub fn assemble_text<'t, 'a: 't>(
    tokens: impl IntoIterator<Item = &'t Token<'a>>,
    include_verse_numbers: bool,
) -> String {
    let mut assembler = TextAssembler::new(include_verse_numbers);
    for token in tokens {
        assembler.push(token);
    }
    assembler.finish()
}
