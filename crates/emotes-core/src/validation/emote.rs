//! Emote field validation
//!
//! Rules:
//! - Name: 2 to 100 characters of letters, digits and `_ - : ( ) ! ? . &`
//! - Mime: one of the supported raster formats
//! - Tags: at most 6, each 1 to 30 lowercase letters, digits or underscores

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::SUPPORTED_MIME_TYPES;

/// Minimum emote name length in characters
pub const MIN_NAME_LENGTH: usize = 2;

/// Maximum emote name length in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum number of tags on one emote
pub const MAX_TAGS: usize = 6;

/// Maximum length of a single tag
pub const MAX_TAG_LENGTH: usize = 30;

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-:()!?.&]+$").ok());

static TAG_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("name '{0}' contains characters that are not allowed")]
    NameInvalidCharacters(String),

    #[error("unsupported image type '{0}'")]
    UnsupportedMime(String),

    #[error("at most {max} tags are allowed")]
    TooManyTags { max: usize },

    #[error("tag '{0}' must be 1-30 lowercase letters, digits or underscores")]
    InvalidTag(String),
}

/// Field checked by emote validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmoteField {
    Name,
    Mime,
    Tags,
    Owner,
    Global,
    Private,
}

impl fmt::Display for EmoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmoteField::Name => "name",
            EmoteField::Mime => "mime",
            EmoteField::Tags => "tags",
            EmoteField::Owner => "owner",
            EmoteField::Global => "global",
            EmoteField::Private => "private",
        };
        f.write_str(name)
    }
}

/// Pass/fail result for one checked field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidation {
    pub field: EmoteField,
    pub error: Option<ValidationError>,
}

impl FieldValidation {
    pub fn from_result(field: EmoteField, result: Result<(), ValidationError>) -> Self {
        Self {
            field,
            error: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(ValidationError::NameTooShort {
            min: MIN_NAME_LENGTH,
        });
    }
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            max: MAX_NAME_LENGTH,
        });
    }

    let matches = NAME_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name));
    if !matches {
        return Err(ValidationError::NameInvalidCharacters(name.to_string()));
    }

    Ok(())
}

pub fn validate_mime(mime: &str) -> Result<(), ValidationError> {
    if SUPPORTED_MIME_TYPES.contains(&mime) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMime(mime.to_string()))
    }
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags { max: MAX_TAGS });
    }

    for tag in tags {
        let well_formed = tag.len() <= MAX_TAG_LENGTH
            && TAG_PATTERN
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(tag));
        if !well_formed {
            return Err(ValidationError::InvalidTag(tag.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("xd").is_ok());
        assert!(validate_name("PepeHands").is_ok());
        assert!(validate_name("monka(S)").is_ok());
        assert!(validate_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        assert_eq!(
            validate_name("a"),
            Err(ValidationError::NameTooShort { min: 2 })
        );
        assert_eq!(
            validate_name(&"a".repeat(101)),
            Err(ValidationError::NameTooLong { max: 100 })
        );
    }

    #[test]
    fn test_name_invalid_characters() {
        assert!(matches!(
            validate_name("has space"),
            Err(ValidationError::NameInvalidCharacters(_))
        ));
        assert!(matches!(
            validate_name("slash/name"),
            Err(ValidationError::NameInvalidCharacters(_))
        ));
    }

    #[test]
    fn test_validate_mime() {
        assert!(validate_mime("image/png").is_ok());
        assert!(validate_mime("image/gif").is_ok());
        assert!(validate_mime("video/mp4").is_err());
    }

    #[test]
    fn test_validate_tags() {
        assert!(validate_tags(&[]).is_ok());
        assert!(validate_tags(&["cute".into(), "pepe_2".into()]).is_ok());
        assert_eq!(
            validate_tags(&["Bad Tag".into()]),
            Err(ValidationError::InvalidTag("Bad Tag".into()))
        );
        let too_many: Vec<String> = (0..7).map(|i| format!("t{}", i)).collect();
        assert_eq!(
            validate_tags(&too_many),
            Err(ValidationError::TooManyTags { max: 6 })
        );
    }

    #[test]
    fn test_field_validation_from_result() {
        let passed = FieldValidation::from_result(EmoteField::Name, Ok(()));
        assert!(passed.passed());
        let failed = FieldValidation::from_result(EmoteField::Mime, validate_mime("text/plain"));
        assert!(!failed.passed());
        assert_eq!(failed.field.to_string(), "mime");
    }
}
