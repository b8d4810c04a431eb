//! Soft parse warnings.
//!
//! Malformed markup never fails a parse. Each recovery is recorded here and
//! travels with the result.

use serde::{Deserialize, Serialize};

/// What kind of recovery the parser performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkupWarningKind {
    /// `\w` with no closing `\w*`; emitted as plain text.
    UnterminatedWord,
    /// `\w ...\w*` wrapping no text; skipped.
    EmptyWord,
    /// `\zaln-e` with no open group; ignored.
    UnmatchedAlignmentEnd,
    /// `\zaln-s` never closed before end of input; closed implicitly.
    UnclosedAlignment,
    /// Bare backslash, or a milestone missing its closing `\*`.
    MalformedMarker,
    /// `\c` or `\v` with a missing or non-numeric argument.
    InvalidNumber,
    /// `occurrence` greater than `occurrences`; both dropped.
    OccurrenceOutOfRange,
    /// Input bytes were not valid UTF-8 and were decoded lossily.
    InvalidUtf8,
}

/// One recorded recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupWarning {
    pub kind: MarkupWarningKind,
    /// Byte offset into the decoded document.
    pub offset: usize,
    pub chapter: u32,
    pub verse: u32,
}

impl MarkupWarning {
    pub fn new(kind: MarkupWarningKind, offset: usize, chapter: u32, verse: u32) -> Self {
        Self {
            kind,
            offset,
            chapter,
            verse,
        }
    }
}

/// Ordered collection of warnings for one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParseWarnings(Vec<MarkupWarning>);

impl ParseWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: MarkupWarning) {
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: ParseWarnings) {
        self.0.extend(other.0);
    }

    /// Number of malformed spans recovered from.
    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn count_of(&self, kind: MarkupWarningKind) -> usize {
        self.0.iter().filter(|w| w.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkupWarning> {
        self.0.iter()
    }

    /// Keep only warnings inside the given chapter/verse predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&MarkupWarning) -> bool) {
        self.0.retain(|w| keep(w));
    }
}

impl FromIterator<MarkupWarning> for ParseWarnings {
    fn from_iter<I: IntoIterator<Item = MarkupWarning>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
