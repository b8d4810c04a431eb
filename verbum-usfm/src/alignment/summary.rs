//! Confidence scoring and summary metadata

use std::collections::BTreeSet;
use std::time::Instant;
use verbum_core::{AlignmentEntry, AlignmentMetadata, ConfidenceWeights, Position};

/// Heuristic completeness score in `[0, 1]`.
///
/// Starts at `1.0` and subtracts one weight per missing linguistic
/// attribute. Deterministic and monotone in missing attributes.
pub fn score_confidence(entry: &AlignmentEntry, weights: &ConfidenceWeights) -> f64 {
    let mut score = 1.0;
    if entry.attributes.strong.is_none() {
        score -= weights.missing_strong;
    }
    if entry.attributes.lemma.is_none() {
        score -= weights.missing_lemma;
    }
    if entry.source_word.trim().is_empty() {
        score -= weights.missing_source;
    }
    if !entry.attributes.has_occurrence() {
        score -= weights.missing_occurrence;
    }
    score.clamp(0.0, 1.0)
}

/// Stamp every entry with its confidence.
pub fn assign_confidence(entries: &mut [AlignmentEntry], weights: &ConfidenceWeights) {
    for entry in entries.iter_mut() {
        entry.confidence = Some(score_confidence(entry, weights));
    }
}

/// Whether every rendered word is covered by exactly one entry.
///
/// An empty range with no entries counts as complete.
pub fn is_complete(rendered: &[Position], entries: &[AlignmentEntry]) -> bool {
    let mut covered: Vec<(usize, usize)> = entries
        .iter()
        .map(|e| (e.position.start, e.position.end))
        .collect();
    covered.sort_unstable();
    let overlapping = covered.windows(2).any(|pair| pair[1].0 < pair[0].1);
    if overlapping {
        return false;
    }

    let words: BTreeSet<(usize, usize)> = rendered.iter().map(|p| (p.start, p.end)).collect();
    words.len() == covered.len() && covered.iter().all(|span| words.contains(span))
}

/// Summarize entries for a parsed range.
///
/// Entries without an assigned confidence are scored with the default
/// weights. `started` is when tokenization began.
pub fn summarize(entries: &[AlignmentEntry], rendered: &[Position], started: Instant) -> AlignmentMetadata {
    let defaults = ConfidenceWeights::default();
    let average_confidence = if entries.is_empty() {
        0.0
    } else {
        let total: f64 = entries
            .iter()
            .map(|e| e.confidence.unwrap_or_else(|| score_confidence(e, &defaults)))
            .sum();
        total / entries.len() as f64
    };

    AlignmentMetadata {
        total_alignments: entries.len(),
        average_confidence,
        has_complete_alignment: is_complete(rendered, entries),
        parse_time_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbum_core::{AlignmentAttributes, AlignmentType};

    const EPSILON: f64 = 1e-9;

    fn entry(start: usize, end: usize, attributes: AlignmentAttributes, source: &str) -> AlignmentEntry {
        AlignmentEntry {
            target_word: "w".to_string(),
            source_word: source.to_string(),
            attributes,
            position: Position {
                start,
                end,
                chapter: 1,
                verse: 1,
            },
            alignment_type: AlignmentType::WordLevel,
            confidence: None,
        }
    }

    fn full() -> AlignmentAttributes {
        AlignmentAttributes {
            strong: Some("G3056".to_string()),
            lemma: Some("λόγος".to_string()),
            occurrence: Some(1),
            occurrences: Some(1),
            ..Default::default()
        }
    }

    fn pos(start: usize, end: usize) -> Position {
        Position {
            start,
            end,
            chapter: 1,
            verse: 1,
        }
    }

    #[test]
    fn test_fully_attributed_entry_scores_one() {
        let weights = ConfidenceWeights::default();
        let score = score_confidence(&entry(0, 4, full(), "λόγος"), &weights);
        assert!((score - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_each_missing_attribute_is_penalized() {
        let weights = ConfidenceWeights::default();

        let no_strong = AlignmentAttributes {
            strong: None,
            ..full()
        };
        let score = score_confidence(&entry(0, 4, no_strong, "λόγος"), &weights);
        assert!((score - 0.7).abs() < EPSILON);

        let no_lemma = AlignmentAttributes { lemma: None, ..full() };
        let score = score_confidence(&entry(0, 4, no_lemma, "λόγος"), &weights);
        assert!((score - 0.8).abs() < EPSILON);

        let score = score_confidence(&entry(0, 4, full(), ""), &weights);
        assert!((score - 0.8).abs() < EPSILON);

        let no_occurrence = AlignmentAttributes {
            occurrences: None,
            ..full()
        };
        let score = score_confidence(&entry(0, 4, no_occurrence, "λόγος"), &weights);
        assert!((score - 0.9).abs() < EPSILON);

        let bare = score_confidence(&entry(0, 4, AlignmentAttributes::default(), ""), &weights);
        assert!((bare - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let weights = ConfidenceWeights {
            missing_strong: 0.9,
            missing_lemma: 0.9,
            ..Default::default()
        };
        let score = score_confidence(&entry(0, 4, AlignmentAttributes::default(), ""), &weights);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_empty_summary_is_zero_not_nan() {
        let metadata = summarize(&[], &[pos(0, 4)], Instant::now());
        assert_eq!(metadata.total_alignments, 0);
        assert_eq!(metadata.average_confidence, 0.0);
        assert!(!metadata.has_complete_alignment);
    }

    #[test]
    fn test_empty_range_is_complete() {
        let metadata = summarize(&[], &[], Instant::now());
        assert!(metadata.has_complete_alignment);
    }

    #[test]
    fn test_average_uses_assigned_confidence() {
        let mut entries = vec![
            entry(0, 2, full(), "a"),
            entry(3, 5, AlignmentAttributes { strong: None, ..full() }, "b"),
        ];
        assign_confidence(&mut entries, &ConfidenceWeights::default());
        assert!(entries.iter().all(|e| e.confidence.is_some()));

        let metadata = summarize(&entries, &[pos(0, 2), pos(3, 5)], Instant::now());
        assert_eq!(metadata.total_alignments, 2);
        assert!((metadata.average_confidence - 0.85).abs() < EPSILON);
        assert!(metadata.has_complete_alignment);
    }

    #[test]
    fn test_gap_breaks_completeness() {
        let entries = vec![entry(0, 2, full(), "a")];
        assert!(!is_complete(&[pos(0, 2), pos(3, 5)], &entries));
    }

    #[test]
    fn test_duplicate_coverage_breaks_completeness() {
        let entries = vec![entry(0, 2, full(), "a"), entry(0, 2, full(), "b")];
        assert!(!is_complete(&[pos(0, 2)], &entries));
    }

    #[test]
    fn test_entry_outside_rendered_words_breaks_completeness() {
        let entries = vec![entry(0, 2, full(), "a"), entry(9, 12, full(), "b")];
        assert!(!is_complete(&[pos(0, 2), pos(3, 5)], &entries));
    }
}
