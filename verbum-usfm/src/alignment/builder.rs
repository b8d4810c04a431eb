//! Alignment group extraction

use crate::lexer::{Attributes, MarkerKind, Token, TokenKind};
use verbum_core::{
    AlignmentAttributes, AlignmentEntry, AlignmentType, MarkupWarning, MarkupWarningKind,
    ParseWarnings, Position,
};

/// An open `\zaln-s` group.
#[derive(Debug, Clone)]
struct GroupFrame<'a> {
    attributes: Attributes<'a>,
    offset: usize,
    chapter: u32,
    verse: u32,
    /// Indices into the entry list of the words this group claimed.
    claimed: Vec<usize>,
}

/// Entries in document order, plus the recoveries made while pairing groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedAlignments {
    pub entries: Vec<AlignmentEntry>,
    pub warnings: ParseWarnings,
}

/// Pairs alignment-start and alignment-end markers over a token stream.
///
/// Open groups form a stack. A word belongs to the innermost open group
/// only; words outside every group produce no entry. Entry types are
/// settled when their group closes.
#[derive(Debug, Clone, Default)]
pub struct AlignmentBuilder<'a> {
    stack: Vec<GroupFrame<'a>>,
    entries: Vec<AlignmentEntry>,
    warnings: ParseWarnings,
}

impl<'a> AlignmentBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open groups.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, token: &Token<'a>) {
        match &token.kind {
            TokenKind::Marker(marker) => match marker.kind {
                MarkerKind::AlignStart => self.stack.push(GroupFrame {
                    attributes: marker.attributes.clone(),
                    offset: token.span.start,
                    chapter: token.chapter,
                    verse: token.verse,
                    claimed: Vec::new(),
                }),
                MarkerKind::AlignEnd => match self.stack.pop() {
                    Some(frame) => self.close(frame),
                    None => self.warnings.push(MarkupWarning::new(
                        MarkupWarningKind::UnmatchedAlignmentEnd,
                        token.span.start,
                        token.chapter,
                        token.verse,
                    )),
                },
                _ => {}
            },
            TokenKind::Word { text, attributes } => self.claim(token, text, attributes),
            TokenKind::PlainText => {}
        }
    }

    fn claim(&mut self, token: &Token<'a>, text: &str, word: &Attributes<'a>) {
        let Some(group) = self.stack.last() else {
            return;
        };

        let source_word = present(group.attributes.get("content"))
            .or_else(|| present(word.get("content")))
            .unwrap_or_default()
            .to_string();
        let mut attributes = merge_attributes(&group.attributes, word);

        if let (Some(occurrence), Some(occurrences)) = (attributes.occurrence, attributes.occurrences) {
            if occurrence > occurrences {
                attributes.occurrence = None;
                attributes.occurrences = None;
                self.warnings.push(MarkupWarning::new(
                    MarkupWarningKind::OccurrenceOutOfRange,
                    token.span.start,
                    token.chapter,
                    token.verse,
                ));
            }
        }

        let index = self.entries.len();
        self.entries.push(AlignmentEntry {
            target_word: text.to_string(),
            source_word,
            attributes,
            position: Position {
                start: token.span.start,
                end: token.span.end,
                chapter: token.chapter,
                verse: token.verse,
            },
            alignment_type: AlignmentType::WordLevel,
            confidence: None,
        });
        if let Some(group) = self.stack.last_mut() {
            group.claimed.push(index);
        }
    }

    fn close(&mut self, frame: GroupFrame<'a>) {
        let alignment_type = AlignmentType::from_word_count(frame.claimed.len());
        for index in frame.claimed {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.alignment_type = alignment_type;
            }
        }
    }

    /// Close anything still open and return the entries.
    pub fn finish(mut self) -> ExtractedAlignments {
        while let Some(frame) = self.stack.pop() {
            self.warnings.push(MarkupWarning::new(
                MarkupWarningKind::UnclosedAlignment,
                frame.offset,
                frame.chapter,
                frame.verse,
            ));
            self.close(frame);
        }
        ExtractedAlignments {
            entries: self.entries,
            warnings: self.warnings,
        }
    }
}

/// Extract alignment entries from a token sequence.
pub fn extract_alignments<'t, 'a: 't>(
    tokens: impl IntoIterator<Item = &'t Token<'a>>,
) -> ExtractedAlignments {
    let mut builder = AlignmentBuilder::new();
    for token in tokens {
        builder.push(token);
    }
    builder.finish()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Group attributes overlaid with the word's own.
fn merge_attributes(group: &Attributes<'_>, word: &Attributes<'_>) -> AlignmentAttributes {
    let pick = |key: &str| present(word.get(key)).or_else(|| present(group.get(key)));
    let text = |key: &str| pick(key).map(str::to_string);
    let number = |key: &str| pick(key).and_then(|v| v.trim().parse::<u32>().ok());

    AlignmentAttributes {
        strong: text("strong"),
        lemma: text("lemma"),
        morph: text("morph"),
        occurrence: number("occurrence"),
        occurrences: number("occurrences"),
        content: text("content"),
        tw: text("tw"),
        note: text("note"),
    }
}
