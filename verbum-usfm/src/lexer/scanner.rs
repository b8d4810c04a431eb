//! Tokenizer implementation

use super::token::*;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use verbum_core::{MarkupWarning, MarkupWarningKind};

const BOM: char = '\u{feff}';

// ============================================================================
// TOKENIZER
// ============================================================================

/// Single-pass, tolerant USFM tokenizer.
///
/// Yields tokens lazily in document order. Malformed markup is recovered
/// from and recorded in [`Tokenizer::warnings`]; scanning never aborts.
/// Cloning or calling [`Tokenizer::restart`] gives an independent scan of
/// the same source.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    chapter: u32,
    verse: u32,
    verse_end: Option<u32>,
    pending: VecDeque<Token<'a>>,
    warnings: Vec<MarkupWarning>,
}

/// Tokenize a decoded USFM document.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        let pos = if source.starts_with(BOM) {
            BOM.len_utf8()
        } else {
            0
        };
        Self {
            source,
            pos,
            line: 1,
            chapter: 0,
            verse: 0,
            verse_end: None,
            pending: VecDeque::new(),
            warnings: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// A fresh tokenizer over the same source.
    pub fn restart(&self) -> Self {
        Self::new(self.source)
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[MarkupWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<MarkupWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn scan(&mut self) {
        if self.rest().starts_with('\\') {
            self.scan_marker();
        } else {
            self.scan_text();
        }
    }

    /// Text up to the next backslash.
    fn scan_text(&mut self) {
        let start = self.pos;
        let line = self.line;
        let end = self.next_backslash();
        self.advance_to(end);
        let token = self.make_token(TokenKind::PlainText, start, end, line);
        self.pending.push_back(token);
    }

    fn scan_marker(&mut self) {
        let start = self.pos;
        let line = self.line;

        self.advance();
        self.eat('+');
        let name_start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '-' {
                self.advance();
            } else {
                break;
            }
        }
        let name = self.slice(name_start, self.pos);
        let closing = self.eat('*');

        if name.is_empty() {
            if closing {
                // Stray milestone terminator.
                self.emit_marker(MarkerKind::Other, name, true, "", Attributes::default(), start, line);
            } else {
                self.warn(MarkupWarningKind::MalformedMarker, start);
                let token = self.make_token(TokenKind::PlainText, start, self.pos, line);
                self.pending.push_back(token);
            }
            return;
        }

        if closing {
            let kind = match name {
                "w" => MarkerKind::WordEnd,
                n if is_note(n) => MarkerKind::NoteEnd,
                _ => MarkerKind::Other,
            };
            self.emit_marker(kind, name, true, "", Attributes::default(), start, line);
            return;
        }

        match name {
            "c" => self.scan_chapter(start, line),
            "v" => self.scan_verse(start, line),
            "w" => self.scan_word(start, line),
            "zaln-s" => self.scan_milestone(MarkerKind::AlignStart, name, start, line),
            "zaln-e" => self.scan_milestone(MarkerKind::AlignEnd, name, start, line),
            n if is_note(n) => {
                self.eat(' ');
                self.emit_marker(MarkerKind::NoteStart, name, false, "", Attributes::default(), start, line);
            }
            n if is_heading(n) => self.scan_heading(name, start, line),
            n if n.ends_with("-s") || n.ends_with("-e") || self.rest().starts_with("\\*") => {
                self.scan_milestone(MarkerKind::Milestone, name, start, line)
            }
            _ => {
                self.eat(' ');
                self.emit_marker(MarkerKind::Other, name, false, "", Attributes::default(), start, line);
            }
        }
    }

    fn scan_chapter(&mut self, start: usize, line: usize) {
        let (argument, number, _) = self.scan_number();
        match number {
            Some(chapter) => {
                self.chapter = chapter;
                self.verse = 0;
                self.verse_end = None;
            }
            None => self.warn(MarkupWarningKind::InvalidNumber, start),
        }
        self.emit_marker(MarkerKind::Chapter, "c", false, argument, Attributes::default(), start, line);
    }

    fn scan_verse(&mut self, start: usize, line: usize) {
        let (argument, number, end) = self.scan_number();
        match number {
            Some(verse) => {
                self.verse = verse;
                self.verse_end = end.filter(|end| *end > verse);
            }
            None => self.warn(MarkupWarningKind::InvalidNumber, start),
        }
        self.eat(' ');
        self.emit_marker(MarkerKind::Verse, "v", false, argument, Attributes::default(), start, line);
    }

    /// Reads `N`, `Na` or `N-M` and returns the argument text with its
    /// first and last numbers.
    fn scan_number(&mut self) -> (&'a str, Option<u32>, Option<u32>) {
        self.skip_inline_space();
        let arg_start = self.pos;
        let rest = self.rest();
        let mut len = number_len(rest);
        if len > 0 && rest[len..].starts_with('-') {
            let upper = number_len(&rest[len + 1..]);
            if upper > 0 {
                len += 1 + upper;
            }
        }
        self.advance_to(arg_start + len);
        let argument = self.slice(arg_start, self.pos);
        let (first, last) = match argument.split_once('-') {
            Some((first, last)) => (first, Some(last)),
            None => (argument, None),
        };
        (argument, leading_number(first), last.and_then(leading_number))
    }

    /// `\w text|attrs\w*` becomes WordStart, Word and WordEnd. Without a
    /// closing `\w*` before the next marker the text is kept as plain text.
    fn scan_word(&mut self, start: usize, line: usize) {
        self.eat(' ');
        let content_start = self.pos;
        let content_end = self.next_backslash();
        let after = self.slice(content_end, self.source.len());
        let closer_len = ["\\w*", "\\+w*"]
            .iter()
            .find(|closer| after.starts_with(**closer))
            .map(|closer| closer.len());

        let content = self.slice(content_start, content_end);
        let (text_part, payload) = match content.find('|') {
            Some(bar) => (&content[..bar], &content[bar..]),
            None => (content, ""),
        };
        let text = text_part.trim();
        let text_start = content_start + (text_part.len() - text_part.trim_start().len());
        let text_end = text_start + text.len();

        match closer_len {
            Some(len) => {
                if text.is_empty() {
                    self.warn(MarkupWarningKind::EmptyWord, start);
                    self.advance_to(content_end + len);
                    return;
                }
                let open = self.make_token(self.marker(MarkerKind::WordStart, "w", false), start, content_start, line);
                let word = self.make_token(
                    TokenKind::Word {
                        text,
                        attributes: Attributes::parse(payload),
                    },
                    text_start,
                    text_end,
                    line,
                );
                self.advance_to(content_end + len);
                let close = self.make_token(self.marker(MarkerKind::WordEnd, "w", true), text_end, self.pos, line);
                self.pending.extend([open, word, close]);
            }
            None => {
                self.warn(MarkupWarningKind::UnterminatedWord, start);
                self.advance_to(content_end);
                if !text.is_empty() {
                    let token = self.make_token(TokenKind::PlainText, text_start, text_end, line);
                    self.pending.push_back(token);
                }
            }
        }
    }

    /// Attribute region up to the `\*` terminator.
    fn scan_milestone(&mut self, kind: MarkerKind, name: &'a str, start: usize, line: usize) {
        let region_start = self.pos;
        let region_end = self.next_backslash();
        let attributes = Attributes::parse(self.slice(region_start, region_end));
        if self.slice(region_end, self.source.len()).starts_with("\\*") {
            self.advance_to(region_end + 2);
        } else {
            self.warn(MarkupWarningKind::MalformedMarker, start);
            self.advance_to(region_end);
        }
        self.emit_marker(kind, name, false, "", attributes, start, line);
    }

    /// Heading lines swallow the rest of the line, nested markers included.
    fn scan_heading(&mut self, name: &'a str, start: usize, line: usize) {
        self.skip_inline_space();
        let arg_start = self.pos;
        let line_end = self
            .rest()
            .find('\n')
            .map_or(self.source.len(), |offset| self.pos + offset);
        let argument = self.slice(arg_start, line_end).trim_end();
        self.advance_to(line_end);
        self.emit_marker(MarkerKind::Heading, name, false, argument, Attributes::default(), start, line);
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn marker(&self, kind: MarkerKind, name: &'a str, closing: bool) -> TokenKind<'a> {
        TokenKind::Marker(Marker {
            kind,
            name,
            closing,
            argument: "",
            attributes: Attributes::default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_marker(
        &mut self,
        kind: MarkerKind,
        name: &'a str,
        closing: bool,
        argument: &'a str,
        attributes: Attributes<'a>,
        start: usize,
        line: usize,
    ) {
        let marker = TokenKind::Marker(Marker {
            kind,
            name,
            closing,
            argument,
            attributes,
        });
        let token = self.make_token(marker, start, self.pos, line);
        self.pending.push_back(token);
    }

    fn make_token(&self, kind: TokenKind<'a>, start: usize, end: usize, line: usize) -> Token<'a> {
        Token {
            kind,
            raw: self.slice(start, end),
            chapter: self.chapter,
            verse: self.verse,
            verse_end: self.verse_end,
            span: Span { start, end, line },
        }
    }

    fn warn(&mut self, kind: MarkupWarningKind, offset: usize) {
        self.warnings
            .push(MarkupWarning::new(kind, offset, self.chapter, self.verse));
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let source: &'a str = self.source;
        &source[start..end]
    }

    fn rest(&self) -> &'a str {
        self.slice(self.pos, self.source.len())
    }

    fn next_backslash(&self) -> usize {
        self.rest()
            .find('\\')
            .map_or(self.source.len(), |offset| self.pos + offset)
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn advance_to(&mut self, target: usize) {
        let target = target.clamp(self.pos, self.source.len());
        self.line += self.source[self.pos..target].matches('\n').count();
        self.pos = target;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.peek_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.pos >= self.source.len() {
                return None;
            }
            self.scan();
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}

fn is_note(name: &str) -> bool {
    matches!(name, "f" | "fe" | "ef" | "x" | "ex")
}

fn is_heading(name: &str) -> bool {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    matches!(
        base,
        "id" | "ide"
            | "h"
            | "toc"
            | "toca"
            | "mt"
            | "mte"
            | "ms"
            | "mr"
            | "s"
            | "sr"
            | "r"
            | "cl"
            | "cp"
            | "rem"
            | "usfm"
            | "sts"
            | "imt"
            | "imte"
            | "is"
            | "ip"
            | "ipi"
            | "im"
            | "imi"
            | "iot"
            | "io"
            | "iex"
            | "ie"
    )
}

/// Byte length of a leading `N` or `Na`. A letter only counts as a suffix
/// when no further letter or digit follows it, so `1In` stops after `1`.
fn number_len(text: &str) -> usize {
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if digits == 0 {
        return 0;
    }
    let mut after = text[digits..].chars();
    match (after.next(), after.next()) {
        (Some(letter), next)
            if letter.is_ascii_alphabetic() && !next.is_some_and(char::is_alphanumeric) =>
        {
            digits + 1
        }
        _ => digits,
    }
}

fn leading_number(text: &str) -> Option<u32> {
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text, |end| &text[..end]);
    digits.parse().ok()
}

// ============================================================================
// TESTS
// ============================================================================
