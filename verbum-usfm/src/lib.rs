//! VERBUM USFM - Tokenizer and Alignment Extraction
//!
//! Pure CPU parsing of USFM documents. No I/O, no async.
//!
//! Pipeline:
//! ```text
//! raw bytes
//!     ↓
//! Tokenizer (Marker | Word | PlainText, stamped with chapter/verse)
//!     ↓ materialized once
//!     ├── Alignment Group Builder → AlignmentEntry[]
//!     │       ↓
//!     │   Confidence & Summary → AlignmentMetadata
//!     └── Text Assembler → display text
//! ```

pub mod alignment;
pub mod document;
pub mod lexer;
pub mod text;

pub use alignment::{
    assign_confidence, extract_alignments, is_complete, score_confidence, summarize,
    AlignmentBuilder, ExtractedAlignments,
};
pub use document::{parse_document, ParseOptions, ParsedDocument};
pub use lexer::{tokenize, Attributes, Marker, MarkerKind, Span, Token, TokenKind, Tokenizer};
pub use text::{assemble_text, TextAssembler};
