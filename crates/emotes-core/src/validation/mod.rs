//! Validation modules

pub mod emote;

pub use emote::{
    validate_mime, validate_name, validate_tags, EmoteField, FieldValidation, ValidationError,
    MAX_NAME_LENGTH, MAX_TAGS, MAX_TAG_LENGTH, MIN_NAME_LENGTH,
};
