//! Word alignment data model

use serde::{Deserialize, Serialize};

/// Structural classification of an alignment group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentType {
    /// The group wraps exactly one word.
    WordLevel,
    /// The group wraps more than one word.
    PhraseLevel,
}

impl AlignmentType {
    pub fn from_word_count(count: usize) -> Self {
        if count > 1 {
            AlignmentType::PhraseLevel
        } else {
            AlignmentType::WordLevel
        }
    }
}

/// Linguistic attributes merged from a word and its enclosing group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AlignmentAttributes {
    pub fn has_occurrence(&self) -> bool {
        self.occurrence.is_some() && self.occurrences.is_some()
    }
}

/// Byte span of a rendered word, with the verse it was stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
    pub chapter: u32,
    pub verse: u32,
}

/// One translated word paired with its original-language source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentEntry {
    pub target_word: String,
    pub source_word: String,
    pub attributes: AlignmentAttributes,
    pub position: Position,
    #[serde(rename = "type")]
    pub alignment_type: AlignmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Corpus-level summary over a set of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentMetadata {
    pub total_alignments: usize,
    pub average_confidence: f64,
    pub has_complete_alignment: bool,
    pub parse_time_ms: u64,
}

impl Default for AlignmentMetadata {
    fn default() -> Self {
        Self {
            total_alignments: 0,
            average_confidence: 0.0,
            has_complete_alignment: false,
            parse_time_ms: 0,
        }
    }
}

/// Alignment entries for a parsed range, with their summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub words: Vec<AlignmentEntry>,
    pub metadata: AlignmentMetadata,
}

impl AlignmentResult {
    pub fn entries_for_verse(&self, chapter: u32, verse: u32) -> impl Iterator<Item = &AlignmentEntry> {
        self.words
            .iter()
            .filter(move |e| e.position.chapter == chapter && e.position.verse == verse)
    }

    /// Entries whose Strong's number matches, ignoring case.
    pub fn entries_for_strong<'a>(&'a self, strong: &'a str) -> impl Iterator<Item = &'a AlignmentEntry> {
        self.words.iter().filter(move |e| {
            e.attributes
                .strong
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(strong))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
