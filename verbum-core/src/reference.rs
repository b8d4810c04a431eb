//! Scripture references and the book table.

use crate::ReferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical book with its USFM code and Door43 file number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Book {
    pub code: &'static str,
    pub name: &'static str,
    pub number: u8,
    aliases: &'static [&'static str],
}

macro_rules! book {
    ($code:literal, $name:literal, $number:literal) => {
        Book { code: $code, name: $name, number: $number, aliases: &[] }
    };
    ($code:literal, $name:literal, $number:literal, [$($alias:literal),*]) => {
        Book { code: $code, name: $name, number: $number, aliases: &[$($alias),*] }
    };
}

/// The 66-book canon. Door43 numbers the New Testament from 41.
pub const BOOKS: &[Book] = &[
    book!("GEN", "Genesis", 1, ["gn"]),
    book!("EXO", "Exodus", 2, ["ex"]),
    book!("LEV", "Leviticus", 3, ["lv"]),
    book!("NUM", "Numbers", 4, ["nm"]),
    book!("DEU", "Deuteronomy", 5, ["dt"]),
    book!("JOS", "Joshua", 6, ["jsh"]),
    book!("JDG", "Judges", 7),
    book!("RUT", "Ruth", 8, ["rth"]),
    book!("1SA", "1 Samuel", 9, ["1sm"]),
    book!("2SA", "2 Samuel", 10, ["2sm"]),
    book!("1KI", "1 Kings", 11, ["1kgs"]),
    book!("2KI", "2 Kings", 12, ["2kgs"]),
    book!("1CH", "1 Chronicles", 13, ["1chr"]),
    book!("2CH", "2 Chronicles", 14, ["2chr"]),
    book!("EZR", "Ezra", 15),
    book!("NEH", "Nehemiah", 16),
    book!("EST", "Esther", 17),
    book!("JOB", "Job", 18),
    book!("PSA", "Psalms", 19, ["ps", "psalm", "pss"]),
    book!("PRO", "Proverbs", 20, ["prv"]),
    book!("ECC", "Ecclesiastes", 21, ["eccl", "qoh"]),
    book!("SNG", "Song of Songs", 22, ["song", "songofsolomon", "sos"]),
    book!("ISA", "Isaiah", 23),
    book!("JER", "Jeremiah", 24),
    book!("LAM", "Lamentations", 25),
    book!("EZK", "Ezekiel", 26, ["ezek"]),
    book!("DAN", "Daniel", 27),
    book!("HOS", "Hosea", 28),
    book!("JOL", "Joel", 29),
    book!("AMO", "Amos", 30),
    book!("OBA", "Obadiah", 31, ["obad"]),
    book!("JON", "Jonah", 32),
    book!("MIC", "Micah", 33),
    book!("NAM", "Nahum", 34),
    book!("HAB", "Habakkuk", 35),
    book!("ZEP", "Zephaniah", 36),
    book!("HAG", "Haggai", 37),
    book!("ZEC", "Zechariah", 38),
    book!("MAL", "Malachi", 39),
    book!("MAT", "Matthew", 41, ["mt"]),
    book!("MRK", "Mark", 42, ["mk", "mar"]),
    book!("LUK", "Luke", 43, ["lk"]),
    book!("JHN", "John", 44, ["jn", "joh"]),
    book!("ACT", "Acts", 45),
    book!("ROM", "Romans", 46),
    book!("1CO", "1 Corinthians", 47, ["1cor"]),
    book!("2CO", "2 Corinthians", 48, ["2cor"]),
    book!("GAL", "Galatians", 49),
    book!("EPH", "Ephesians", 50),
    book!("PHP", "Philippians", 51, ["phil"]),
    book!("COL", "Colossians", 52),
    book!("1TH", "1 Thessalonians", 53, ["1thess"]),
    book!("2TH", "2 Thessalonians", 54, ["2thess"]),
    book!("1TI", "1 Timothy", 55, ["1tim"]),
    book!("2TI", "2 Timothy", 56, ["2tim"]),
    book!("TIT", "Titus", 57),
    book!("PHM", "Philemon", 58, ["phlm"]),
    book!("HEB", "Hebrews", 59),
    book!("JAS", "James", 60),
    book!("1PE", "1 Peter", 61, ["1pet"]),
    book!("2PE", "2 Peter", 62, ["2pet"]),
    book!("1JN", "1 John", 63),
    book!("2JN", "2 John", 64),
    book!("3JN", "3 John", 65),
    book!("JUD", "Jude", 66),
    book!("REV", "Revelation", 67, ["rv"]),
];

fn normalize_book_name(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Book {
    /// Resolve a book by code, full name, abbreviation or unique prefix.
    pub fn lookup(input: &str) -> Option<&'static Book> {
        let needle = normalize_book_name(input);
        if needle.is_empty() {
            return None;
        }

        let exact = BOOKS.iter().find(|book| {
            book.code.eq_ignore_ascii_case(&needle)
                || normalize_book_name(book.name) == needle
                || book.aliases.contains(&needle.as_str())
        });
        if exact.is_some() {
            return exact;
        }

        if needle.chars().count() < 3 {
            return None;
        }
        let mut prefixed = BOOKS
            .iter()
            .filter(|book| normalize_book_name(book.name).starts_with(&needle));
        match (prefixed.next(), prefixed.next()) {
            (Some(book), None) => Some(book),
            _ => None,
        }
    }

    /// Door43 member file stem, e.g. `44-JHN`.
    pub fn file_stem(&self) -> String {
        format!("{:02}-{}", self.number, self.code)
    }

    pub fn is_new_testament(&self) -> bool {
        self.number > 40
    }
}

/// A parsed scripture citation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// USFM book code, e.g. `JHN`.
    pub book: String,
    pub book_name: String,
    pub chapter: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_chapter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_verse: Option<u32>,
    /// Canonical display form, e.g. `John 3:16-18`.
    pub reference: String,
}

impl Citation {
    /// Parse references like `John 3:16`, `Jn 3:16-18`, `1 Cor 13`,
    /// `John 3:16-4:2` or `JHN 3`.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (book_part, numbers) = match trimmed.rfind(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], trimmed[idx..].trim()),
            None => {
                return Err(ReferenceError::InvalidChapter {
                    reference: trimmed.to_string(),
                })
            }
        };

        let book = Book::lookup(book_part).ok_or_else(|| ReferenceError::UnknownBook {
            book: book_part.trim().to_string(),
        })?;

        let numbers = numbers.replace('.', ":");
        let (start, end) = match numbers.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (numbers.as_str(), None),
        };

        let (chapter, verse) = parse_chapter_verse(start, trimmed)?;

        let (end_chapter, end_verse) = match end {
            None => (None, None),
            Some(end) if end.contains(':') => {
                let (c, v) = parse_chapter_verse(end, trimmed)?;
                if verse.is_none() {
                    return Err(ReferenceError::InvalidRange {
                        reference: trimmed.to_string(),
                        reason: "chapter range cannot end in a verse".to_string(),
                    });
                }
                (Some(c), v)
            }
            Some(end) => {
                let n = parse_number(end).ok_or_else(|| ReferenceError::InvalidVerse {
                    reference: trimmed.to_string(),
                })?;
                if verse.is_some() {
                    (None, Some(n))
                } else {
                    (Some(n), None)
                }
            }
        };

        let citation = Citation {
            book: book.code.to_string(),
            book_name: book.name.to_string(),
            chapter,
            verse,
            end_chapter,
            end_verse,
            reference: String::new(),
        };
        citation.check_order(trimmed)?;

        let reference = citation.display_reference();
        Ok(Citation {
            reference,
            ..citation
        })
    }

    /// The book table entry for this citation.
    pub fn book(&self) -> Option<&'static Book> {
        Book::lookup(&self.book)
    }

    /// Whether the citation covers whole chapters.
    pub fn is_whole_chapter(&self) -> bool {
        self.verse.is_none()
    }

    fn bounds(&self) -> ((u32, u32), (u32, u32)) {
        let start = (self.chapter, self.verse.unwrap_or(1));
        let end_chapter = self.end_chapter.unwrap_or(self.chapter);
        let end_verse = match (self.end_verse, self.end_chapter, self.verse) {
            (Some(v), _, _) => v,
            (None, None, Some(v)) => v,
            _ => u32::MAX,
        };
        (start, (end_chapter, end_verse))
    }

    /// Whether `chapter:verse` falls inside the citation. Verse 0 (chapter
    /// preamble) is never inside.
    pub fn contains(&self, chapter: u32, verse: u32) -> bool {
        if verse == 0 {
            return false;
        }
        let (start, end) = self.bounds();
        (chapter, verse) >= start && (chapter, verse) <= end
    }

    /// Whether any verse of a bridge `verse..=verse_end` is inside.
    pub fn overlaps(&self, chapter: u32, verse: u32, verse_end: Option<u32>) -> bool {
        let last = verse_end.unwrap_or(verse).max(verse);
        if verse == 0 && last == 0 {
            return false;
        }
        let (start, end) = self.bounds();
        (chapter, last) >= start && (chapter, verse.max(1)) <= end
    }

    /// Stable key fragment for cache derivatives, e.g. `3:16-3:18`.
    pub fn range_key(&self) -> String {
        let (start, end) = self.bounds();
        if end.1 == u32::MAX {
            format!("{}-{}", start.0, end.0)
        } else {
            format!("{}:{}-{}:{}", start.0, start.1, end.0, end.1)
        }
    }

    fn check_order(&self, reference: &str) -> Result<(), ReferenceError> {
        let (start, end) = self.bounds();
        if end < start {
            return Err(ReferenceError::InvalidRange {
                reference: reference.to_string(),
                reason: "range ends before it starts".to_string(),
            });
        }
        Ok(())
    }

    fn display_reference(&self) -> String {
        let mut out = format!("{} {}", self.book_name, self.chapter);
        if let Some(verse) = self.verse {
            out.push_str(&format!(":{}", verse));
        }
        match (self.end_chapter, self.end_verse) {
            (Some(c), Some(v)) => out.push_str(&format!("-{}:{}", c, v)),
            (Some(c), None) => out.push_str(&format!("-{}", c)),
            (None, Some(v)) => out.push_str(&format!("-{}", v)),
            (None, None) => {}
        }
        out
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|n| *n > 0)
}

fn parse_chapter_verse(text: &str, reference: &str) -> Result<(u32, Option<u32>), ReferenceError> {
    match text.split_once(':') {
        Some((chapter, verse)) => {
            let chapter = parse_number(chapter).ok_or_else(|| ReferenceError::InvalidChapter {
                reference: reference.to_string(),
            })?;
            let verse = parse_number(verse).ok_or_else(|| ReferenceError::InvalidVerse {
                reference: reference.to_string(),
            })?;
            Ok((chapter, Some(verse)))
        }
        None => {
            let chapter = parse_number(text).ok_or_else(|| ReferenceError::InvalidChapter {
                reference: reference.to_string(),
            })?;
            Ok((chapter, None))
        }
    }
}
