//! Scripture request and result types

use crate::alignment::AlignmentResult;
use crate::reference::Citation;
use crate::resource::DEFAULT_VERSION;
use crate::warning::ParseWarnings;
use serde::{Deserialize, Serialize};

/// Output format requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptureFormat {
    #[default]
    Text,
    Usfm,
}

/// One scripture lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptureRequest {
    pub reference: String,
    pub language: String,
    pub organization: String,
    pub resource: String,
    pub version: String,
    pub format: ScriptureFormat,
    pub include_verse_numbers: bool,
    pub include_alignment: bool,
}

impl Default for ScriptureRequest {
    fn default() -> Self {
        Self {
            reference: String::new(),
            language: "en".to_string(),
            organization: "unfoldingWord".to_string(),
            resource: "ult".to_string(),
            version: DEFAULT_VERSION.to_string(),
            format: ScriptureFormat::Text,
            include_verse_numbers: true,
            include_alignment: true,
        }
    }
}

impl ScriptureRequest {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_format(mut self, format: ScriptureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_verse_numbers(mut self, include: bool) -> Self {
        self.include_verse_numbers = include;
        self
    }

    pub fn with_alignment(mut self, include: bool) -> Self {
        self.include_alignment = include;
        self
    }
}

/// Assembled text for a citation, with optional raw markup and alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptureResult {
    pub text: String,
    pub translation: String,
    pub citation: Citation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usfm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentResult>,
    #[serde(default, skip_serializing_if = "ParseWarnings::is_empty")]
    pub warnings: ParseWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = ScriptureRequest::new("John 3:16");
        assert_eq!(request.language, "en");
        assert_eq!(request.organization, "unfoldingWord");
        assert_eq!(request.resource, "ult");
        assert_eq!(request.version, "master");
        assert_eq!(request.format, ScriptureFormat::Text);
        assert!(request.include_verse_numbers);
        assert!(request.include_alignment);
    }

    #[test]
    fn test_request_deserializes_partial_json() {
        let request: ScriptureRequest =
            serde_json::from_str(r#"{"reference":"Jn 3:16","format":"usfm","includeVerseNumbers":false}"#)
                .unwrap();
        assert_eq!(request.reference, "Jn 3:16");
        assert_eq!(request.format, ScriptureFormat::Usfm);
        assert!(!request.include_verse_numbers);
        assert_eq!(request.resource, "ult");
    }

    #[test]
    fn test_result_omits_absent_optionals() {
        let result = ScriptureResult {
            text: "16 For God so loved the world".to_string(),
            translation: "unfoldingWord ULT".to_string(),
            citation: Citation::parse("John 3:16").unwrap(),
            usfm: None,
            alignment: None,
            warnings: ParseWarnings::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["citation"]["book"], "JHN");
        assert!(json.get("usfm").is_none());
        assert!(json.get("alignment").is_none());
        assert!(json.get("warnings").is_none());
    }
}
