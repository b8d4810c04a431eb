//! Alignment extraction and summary

pub mod builder;
pub mod summary;

pub use builder::{extract_alignments, AlignmentBuilder, ExtractedAlignments};
pub use summary::{assign_confidence, is_complete, score_confidence, summarize};
