//! Resource identity

use crate::reference::Book;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version string meaning "the default branch head".
pub const DEFAULT_VERSION: &str = "master";

/// Immutable identity of a fetchable, parseable unit.
///
/// One key addresses one USFM document (a single book of one resource).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub organization: String,
    pub language: String,
    pub resource_id: String,
    /// USFM book code for scripture, or a term id for term resources.
    pub book_or_term: String,
    pub version: String,
}

impl ResourceKey {
    pub fn new(
        organization: impl Into<String>,
        language: impl Into<String>,
        resource_id: impl Into<String>,
        book_or_term: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            language: language.into(),
            resource_id: resource_id.into(),
            book_or_term: book_or_term.into(),
            version: version.into(),
        }
    }

    /// Key for a book of a scripture resource at the default version.
    pub fn for_book(
        organization: impl Into<String>,
        language: impl Into<String>,
        resource_id: impl Into<String>,
        book: &Book,
    ) -> Self {
        Self::new(organization, language, resource_id, book.code, DEFAULT_VERSION)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Repository name on the content host, e.g. `en_ult`.
    pub fn repository(&self) -> String {
        format!("{}_{}", self.language, self.resource_id)
    }

    /// Member file name inside the repository, e.g. `44-JHN.usfm`.
    pub fn file_name(&self) -> String {
        match Book::lookup(&self.book_or_term) {
            Some(book) => format!("{}.usfm", book.file_stem()),
            None => format!("{}.usfm", self.book_or_term),
        }
    }

    /// Whether this key tracks the moving default branch.
    pub fn is_default_version(&self) -> bool {
        self.version.is_empty() || self.version == DEFAULT_VERSION
    }

    /// Human label for the translation, e.g. `unfoldingWord ULT`.
    pub fn translation(&self) -> String {
        format!("{} {}", self.organization, self.resource_id.to_uppercase())
    }

    /// Stable string form used as a storage key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.organization,
            self.repository(),
            self.version,
            self.book_or_term
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}/{}",
            self.organization,
            self.repository(),
            self.version,
            self.file_name()
        )
    }
}
