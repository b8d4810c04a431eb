//! Whole-document parsing

use crate::alignment::{assign_confidence, extract_alignments, summarize};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::text::assemble_text;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Instant;
use verbum_core::{
    AlignmentResult, Citation, ConfidenceWeights, MarkupWarning, MarkupWarningKind,
    ParseWarnings, Position,
};

/// Options for [`parse_document`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    pub include_verse_numbers: bool,
    pub weights: ConfidenceWeights,
    /// Restrict output to these verses. `None` keeps the whole document.
    pub range: Option<Citation>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_verse_numbers: true,
            weights: ConfidenceWeights::default(),
            range: None,
        }
    }
}

impl ParseOptions {
    pub fn with_range(mut self, range: Citation) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_verse_numbers(mut self, include: bool) -> Self {
        self.include_verse_numbers = include;
        self
    }

    pub fn with_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.weights = weights;
        self
    }

    fn in_range(&self, token: &Token<'_>) -> bool {
        match &self.range {
            Some(range) => range.overlaps(token.chapter, token.verse, token.verse_end),
            None => true,
        }
    }
}

/// Everything derived from one parse of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub text: String,
    /// Raw markup covering the selected range.
    pub usfm: String,
    pub alignment: AlignmentResult,
    pub warnings: ParseWarnings,
    pub token_count: usize,
}

/// Tokenize once, then run the alignment builder and the text assembler
/// over the same materialized tokens.
///
/// Never fails: malformed markup and invalid UTF-8 degrade into warnings.
pub fn parse_document(raw: &[u8], options: &ParseOptions) -> ParsedDocument {
    let started = Instant::now();

    let decoded = String::from_utf8_lossy(raw);
    let mut warnings = Vec::new();
    if let Cow::Owned(_) = decoded {
        warnings.push(MarkupWarning::new(MarkupWarningKind::InvalidUtf8, 0, 0, 0));
    }

    let mut tokenizer = tokenize(&decoded);
    let tokens: Vec<Token<'_>> = tokenizer.by_ref().collect();
    warnings.extend(tokenizer.take_warnings());

    // Grouping needs the whole stream; range selection happens afterwards.
    let extracted = extract_alignments(&tokens);
    warnings.extend(extracted.warnings.iter().cloned());

    let selected: Vec<&Token<'_>> = tokens.iter().filter(|t| options.in_range(t)).collect();
    let rendered: Vec<Position> = selected
        .iter()
        .filter(|t| t.is_word())
        .map(|t| Position {
            start: t.span.start,
            end: t.span.end,
            chapter: t.chapter,
            verse: t.verse,
        })
        .collect();
    let rendered_starts: HashSet<usize> = rendered.iter().map(|p| p.start).collect();

    let mut words = extracted.entries;
    words.retain(|e| rendered_starts.contains(&e.position.start));
    assign_confidence(&mut words, &options.weights);

    let text = assemble_text(selected.iter().copied(), options.include_verse_numbers);
    let usfm = match (selected.first(), selected.last()) {
        (Some(first), Some(last)) => decoded[first.span.start..last.span.end].trim().to_string(),
        _ => String::new(),
    };

    if let Some(range) = &options.range {
        warnings.retain(|w| {
            w.kind == MarkupWarningKind::InvalidUtf8 || range.overlaps(w.chapter, w.verse, None)
        });
    }
    warnings.sort_by_key(|w| w.offset);
    let warnings: ParseWarnings = warnings.into_iter().collect();

    let mut metadata = summarize(&words, &rendered, started);
    // Prose outside `\w` wrappers has words that no entry can cover.
    let has_prose = selected.iter().any(|t| {
        matches!(t.kind, TokenKind::PlainText)
            && t.verse > 0
            && t.text().chars().any(char::is_alphanumeric)
    });
    if words.is_empty() && has_prose {
        metadata.has_complete_alignment = false;
    }
    tracing::debug!(
        tokens = tokens.len(),
        alignments = metadata.total_alignments,
        warnings = warnings.count(),
        parse_time_ms = metadata.parse_time_ms,
        "Parsed USFM document"
    );

    ParsedDocument {
        text,
        usfm,
        alignment: AlignmentResult { words, metadata },
        warnings,
        token_count: tokens.len(),
    }
}
